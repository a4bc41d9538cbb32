use super::encoder::CountingWriter;
use super::BencodeValue;
use std::io::{self, Write};

const INDENT: usize = 2;

/// Render `value` in an indented, human readable form followed by a newline.
///
/// The output is meant for diagnostics and cannot be parsed back.
pub fn pretty_print<W: Write>(value: &BencodeValue, sink: W) -> io::Result<usize> {
    let mut out = CountingWriter::new(sink);
    write_pretty(value, 0, &mut out)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(out.count())
}

fn newline<W: Write>(indent: usize, out: &mut W) -> io::Result<()> {
    write!(out, "\n{:indent$}", "", indent = indent)
}

fn write_pretty<W: Write>(value: &BencodeValue, indent: usize, out: &mut W) -> io::Result<()> {
    match value {
        BencodeValue::Integer(i) => write!(out, "{}", i),
        BencodeValue::String(s) => {
            out.write_all(b"\"")?;
            out.write_all(s)?;
            out.write_all(b"\"")
        }
        BencodeValue::List(list) => {
            if list.is_empty() {
                return out.write_all(b"[]");
            }

            out.write_all(b"[")?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                newline(indent + INDENT, out)?;
                write_pretty(item, indent + INDENT, out)?;
            }
            newline(indent, out)?;
            out.write_all(b"]")
        }
        BencodeValue::Dict(dict) => {
            if dict.is_empty() {
                return out.write_all(b"{}");
            }

            out.write_all(b"{")?;
            for (i, (key, item)) in dict.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                newline(indent + INDENT, out)?;
                out.write_all(key)?;
                out.write_all(b" : ")?;
                write_pretty(item, indent + INDENT, out)?;
            }
            newline(indent, out)?;
            out.write_all(b"}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::Dict;

    fn render(value: &BencodeValue) -> (String, usize) {
        let mut out = Vec::new();
        let n = pretty_print(value, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), n)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(render(&BencodeValue::Integer(-12)).0, "-12\n");
        assert_eq!(render(&BencodeValue::string("spam")).0, "\"spam\"\n");
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(render(&BencodeValue::list()).0, "[]\n");
        assert_eq!(render(&BencodeValue::dict()).0, "{}\n");
    }

    #[test]
    fn test_nested() {
        let mut path = BencodeValue::list();
        path.push("dir".into()).unwrap();
        path.push("a".into()).unwrap();

        let mut file = Dict::new();
        file.append("length", BencodeValue::Integer(5)).unwrap();
        file.append("path", path).unwrap();

        let (text, n) = render(&BencodeValue::Dict(file));
        let expected = "{\n  length : 5,\n  path : [\n    \"dir\",\n    \"a\"\n  ]\n}\n";
        assert_eq!(text, expected);
        assert_eq!(n, expected.len());
    }
}
