use super::BencodeValue;
use std::io::{self, Write};

/// Encode a BencodeValue into its byte representation
pub fn encode(value: &BencodeValue) -> Vec<u8> {
    let mut result = Vec::new();
    encode_into(value, &mut result);
    result
}

/// Write the canonical encoding of `value` to `sink`, returning the number of bytes written
pub fn serialize<W: Write>(value: &BencodeValue, sink: W) -> io::Result<usize> {
    let mut out = CountingWriter::new(sink);
    write_value(value, &mut out)?;
    out.flush()?;
    Ok(out.count())
}

fn encode_into(value: &BencodeValue, output: &mut Vec<u8>) {
    // Writing into a Vec cannot fail
    let _ = write_value(value, output);
}

fn write_string<W: Write>(bytes: &[u8], output: &mut W) -> io::Result<()> {
    write!(output, "{}:", bytes.len())?;
    output.write_all(bytes)
}

fn write_value<W: Write>(value: &BencodeValue, output: &mut W) -> io::Result<()> {
    match value {
        BencodeValue::Integer(i) => write!(output, "i{}e", i),
        BencodeValue::String(s) => write_string(s, output),
        BencodeValue::List(list) => {
            output.write_all(b"l")?;
            for item in list {
                write_value(item, output)?;
            }
            output.write_all(b"e")
        }
        BencodeValue::Dict(dict) => {
            output.write_all(b"d")?;
            // Stored order is emitted as is
            for (key, value) in dict.iter() {
                write_string(key, output)?;
                write_value(value, output)?;
            }
            output.write_all(b"e")
        }
    }
}

/// Writer adaptor that counts the bytes passed through it.
pub(super) struct CountingWriter<W> {
    inner: W,
    count: usize,
}

impl<W: Write> CountingWriter<W> {
    pub(super) fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub(super) fn count(&self) -> usize {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
