mod digest;
mod progress;
mod queue;
mod reader;

pub use digest::{sha1, DigestEngine, DIGEST_LEN};
pub use progress::{ConsoleProgress, NoProgress, ProgressSink, PROGRESS_PERIOD};

use crate::error::{MktorrentError, Result};
use progress::Stopper;
use queue::PieceQueue;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info};

/// Piece buffers allowed per worker thread
const BUFFERS_PER_WORKER: usize = 3;

/// Number of pieces covering `total_size` bytes
pub fn piece_count(total_size: u64, piece_length: u64) -> usize {
    total_size.div_ceil(piece_length) as usize
}

/// Hash the concatenation of the files yielded by `paths`.
///
/// One reader (the calling thread) cuts the stream into `piece_length` sized
/// pieces, `workers` threads digest them, and a progress thread reports to
/// `progress` until all pieces are done. The result is the concatenation of
/// the 20 byte SHA-1 digest of every piece, in stream order.
pub fn compute_piece_hashes<I, P>(
    paths: I,
    total_size: u64,
    piece_length: usize,
    workers: usize,
    progress: &P,
) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Result<PathBuf>>,
    P: ProgressSink + ?Sized,
{
    if piece_length == 0 {
        return Err(MktorrentError::ConfigError(
            "piece length must not be zero".to_string(),
        ));
    }
    if workers == 0 {
        return Err(MktorrentError::ConfigError(
            "at least one hashing thread is required".to_string(),
        ));
    }

    let pieces = piece_count(total_size, piece_length as u64);
    let mut digests = vec![0u8; pieces * DIGEST_LEN];

    info!(
        "Hashing {} bytes in {} pieces of {} bytes with {} threads",
        total_size, pieces, piece_length, workers
    );

    {
        let queue = &PieceQueue::new(piece_length, BUFFERS_PER_WORKER * workers);
        let stopper = &Stopper::new();
        let mut slots = digests.chunks_exact_mut(DIGEST_LEN);

        let read = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| s.spawn(move || worker(queue)))
                .collect();

            let reporter = s.spawn(move || {
                stopper.run_every(PROGRESS_PERIOD, || {
                    progress.report(queue.pieces_hashed(), pieces)
                })
            });

            let read = reader::read_pieces(paths, queue, &mut slots, piece_length, total_size);

            // wake the workers so they drain what is left and exit
            queue.set_done();

            for (id, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(hashed) => debug!("Worker {} hashed {} pieces", id, hashed),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }

            stopper.stop();
            if let Err(panic) = reporter.join() {
                std::panic::resume_unwind(panic);
            }

            read
        });

        progress.finish(queue.pieces_hashed(), pieces);
        debug!(
            "Pipeline used {} piece buffers",
            queue.buffers_allocated()
        );
        read?;
    }

    Ok(digests)
}

fn worker(queue: &PieceQueue<'_>) -> usize {
    let mut hashed = 0;

    while let Some(mut buffer) = queue.get_full() {
        let mut engine = DigestEngine::new();
        engine.update(buffer.filled());

        if let Some(dest) = buffer.dest.take() {
            engine.finish_into(dest);
        }

        queue.put_free(buffer, 1);
        hashed += 1;
    }

    hashed
}
