mod decoder;
mod dict;
mod encoder;
mod pretty;
mod value;

pub use decoder::{decode, parse};
pub use dict::Dict;
pub use encoder::{encode, serialize};
pub use pretty::pretty_print;
pub use value::BencodeValue;
