use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// A reusable piece buffer.
///
/// `dest` is the 20 byte slot of the digest buffer this piece hashes into; it
/// is only set while the buffer sits in the full list or is being digested.
pub struct PieceBuffer<'a> {
    pub dest: Option<&'a mut [u8]>,
    pub len: usize,
    pub data: Box<[u8]>,
}

impl<'a> PieceBuffer<'a> {
    fn new(capacity: usize) -> Self {
        Self {
            dest: None,
            len: 0,
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

struct FreeList<'a> {
    buffers: Vec<PieceBuffer<'a>>,
    allocated: usize,
    hashed: usize,
}

struct FullList<'a> {
    buffers: VecDeque<PieceBuffer<'a>>,
    done: bool,
}

/// Bounded producer/consumer queue between the reader and the workers.
///
/// Buffers move between a free list and a full list, each behind its own
/// mutex and condition variable. No more than `max_buffers` are ever
/// allocated, so a reader that runs ahead of the workers blocks until a
/// buffer is returned.
pub struct PieceQueue<'a> {
    free: Mutex<FreeList<'a>>,
    full: Mutex<FullList<'a>>,
    free_ready: Condvar,
    full_ready: Condvar,
    piece_length: usize,
    max_buffers: usize,
}

impl<'a> PieceQueue<'a> {
    pub fn new(piece_length: usize, max_buffers: usize) -> Self {
        Self {
            free: Mutex::new(FreeList {
                buffers: Vec::new(),
                allocated: 0,
                hashed: 0,
            }),
            full: Mutex::new(FullList {
                buffers: VecDeque::new(),
                done: false,
            }),
            free_ready: Condvar::new(),
            full_ready: Condvar::new(),
            piece_length,
            max_buffers: max_buffers.max(1),
        }
    }

    /// Take a free buffer, allocating one while under the cap, otherwise waiting
    pub fn get_free(&self) -> PieceBuffer<'a> {
        let mut free = self.free.lock();

        loop {
            if let Some(mut buffer) = free.buffers.pop() {
                buffer.len = 0;
                return buffer;
            }

            if free.allocated < self.max_buffers {
                free.allocated += 1;
                return PieceBuffer::new(self.piece_length);
            }

            self.free_ready.wait(&mut free);
        }
    }

    /// Take a full buffer, or `None` once the reader is done and nothing is left
    pub fn get_full(&self) -> Option<PieceBuffer<'a>> {
        let mut full = self.full.lock();

        loop {
            if let Some(buffer) = full.buffers.pop_front() {
                return Some(buffer);
            }

            if full.done {
                return None;
            }

            self.full_ready.wait(&mut full);
        }
    }

    /// Return a buffer to the free list, counting `hashed` finished pieces
    pub fn put_free(&self, mut buffer: PieceBuffer<'a>, hashed: usize) {
        buffer.dest = None;
        {
            let mut free = self.free.lock();
            free.buffers.push(buffer);
            free.hashed += hashed;
        }
        self.free_ready.notify_one();
    }

    pub fn put_full(&self, buffer: PieceBuffer<'a>) {
        self.full.lock().buffers.push_back(buffer);
        self.full_ready.notify_one();
    }

    /// Tell the workers no more pieces are coming
    pub fn set_done(&self) {
        self.full.lock().done = true;
        self.full_ready.notify_all();
    }

    pub fn pieces_hashed(&self) -> usize {
        self.free.lock().hashed
    }

    pub fn buffers_allocated(&self) -> usize {
        self.free.lock().allocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_allocates_up_to_cap() {
        let queue = PieceQueue::new(16, 2);
        let a = queue.get_free();
        let b = queue.get_free();
        assert_eq!(queue.buffers_allocated(), 2);
        assert_eq!(a.data.len(), 16);

        queue.put_free(a, 0);
        let c = queue.get_free();
        assert_eq!(queue.buffers_allocated(), 2);
        drop((b, c));
    }

    #[test]
    fn test_get_free_blocks_at_cap() {
        let queue = PieceQueue::new(8, 1);
        let returned = AtomicBool::new(false);

        thread::scope(|s| {
            let held = queue.get_free();

            let waiter = s.spawn(|| {
                let buffer = queue.get_free();
                assert!(returned.load(Ordering::SeqCst));
                buffer.data.len()
            });

            thread::sleep(Duration::from_millis(50));
            returned.store(true, Ordering::SeqCst);
            queue.put_free(held, 1);

            assert_eq!(waiter.join().unwrap(), 8);
        });

        assert_eq!(queue.buffers_allocated(), 1);
        assert_eq!(queue.pieces_hashed(), 1);
    }

    #[test]
    fn test_done_drains_then_stops() {
        let queue = PieceQueue::new(4, 3);
        let mut buffer = queue.get_free();
        buffer.len = 3;
        queue.put_full(buffer);
        queue.set_done();

        assert_eq!(queue.get_full().map(|b| b.len), Some(3));
        assert!(queue.get_full().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let queue = PieceQueue::new(4, 3);
        for len in 1..=3 {
            let mut buffer = queue.get_free();
            buffer.len = len;
            queue.put_full(buffer);
        }
        queue.set_done();

        let lens: Vec<usize> = std::iter::from_fn(|| queue.get_full()).map(|b| b.len).collect();
        assert_eq!(lens, vec![1, 2, 3]);
    }
}
