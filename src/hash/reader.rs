use super::queue::PieceQueue;
use crate::error::{MktorrentError, Result};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Feed the concatenated contents of `paths` to the workers, one piece at a time.
///
/// Every full piece is tagged with the next slot from `slots` before it is
/// queued. Returns the number of bytes read, which must equal `expected`.
pub fn read_pieces<'a, I, S>(
    paths: I,
    queue: &PieceQueue<'a>,
    slots: &mut S,
    piece_length: usize,
    expected: u64,
) -> Result<u64>
where
    I: IntoIterator<Item = Result<PathBuf>>,
    S: Iterator<Item = &'a mut [u8]>,
{
    let mut counter: u64 = 0;
    let mut buffer = queue.get_free();

    for path in paths {
        let path = path?;
        let mut file = File::open(&path).map_err(|e| MktorrentError::file(&path, e))?;
        let mut file_bytes: u64 = 0;

        loop {
            let n = match file.read(&mut buffer.data[buffer.len..piece_length]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(MktorrentError::file(&path, e)),
            };

            buffer.len += n;
            file_bytes += n as u64;

            if buffer.len == piece_length {
                counter += piece_length as u64;
                buffer.dest = Some(slots.next().ok_or(MktorrentError::ConsistencyError {
                    expected,
                    hashed: counter,
                })?);
                queue.put_full(buffer);
                buffer = queue.get_free();
            }
        }

        trace!("Read {} bytes from {}", file_bytes, path.display());
    }

    counter += buffer.len as u64;

    // the last piece may be short
    if buffer.len > 0 {
        buffer.dest = Some(slots.next().ok_or(MktorrentError::ConsistencyError {
            expected,
            hashed: counter,
        })?);
        queue.put_full(buffer);
    } else {
        queue.put_free(buffer, 0);
    }

    if counter != expected {
        return Err(MktorrentError::ConsistencyError {
            expected,
            hashed: counter,
        });
    }

    debug!("Reader finished after {} bytes", counter);
    Ok(counter)
}
