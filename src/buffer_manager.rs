use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::block_id::BlockId;
pub use crate::buffer::BufferError;
use crate::buffer::Buffer;
use crate::file_manager::FileManager;
use crate::log_manager::LogManager;
use crate::log_record::TxNum;

/// How long a pin request may wait for a frame to become available.
const MAX_PIN_WAIT: Duration = Duration::from_secs(10);

/// BufferManager owns a fixed-size pool of page frames shared by every
/// transaction.
///
/// A pin request that finds no usable frame parks on a condition variable
/// that `unpin` signals, bounded by [`MAX_PIN_WAIT`]. Eviction picks the
/// first unpinned frame.
pub struct BufferManager {
    state: Mutex<Pool>,
    available: Condvar,
    max_wait: Duration,
}

struct Pool {
    frames: Vec<Arc<RwLock<Buffer>>>,
    free_buf_count: usize,
}

impl BufferManager {
    pub fn new(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        buf_size: usize,
    ) -> Result<Self, BufferError> {
        Self::with_max_wait(fm, lm, buf_size, MAX_PIN_WAIT)
    }

    pub(crate) fn with_max_wait(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        buf_size: usize,
        max_wait: Duration,
    ) -> Result<Self, BufferError> {
        let mut frames = Vec::with_capacity(buf_size);
        for _ in 0..buf_size {
            frames.push(Arc::new(RwLock::new(Buffer::new(
                Arc::clone(&fm),
                Arc::clone(&lm),
            )?)));
        }
        Ok(Self {
            state: Mutex::new(Pool {
                frames,
                free_buf_count: buf_size,
            }),
            available: Condvar::new(),
            max_wait,
        })
    }

    /// Pin the frame holding `blk`, assigning a free frame first if the
    /// block is not resident. Waits for an unpin when every frame is pinned.
    pub fn pin(&self, blk: &BlockId) -> Result<Arc<RwLock<Buffer>>, BufferError> {
        let deadline = Instant::now() + self.max_wait;
        let mut pool = self.state.lock().unwrap();
        loop {
            if let Some(buf) = Self::try_to_pin(&mut pool, blk)? {
                return Ok(buf);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(BufferError::PinTimeout);
            }
            log::trace!("no free frame for {}, waiting", blk);
            let (guard, _) = self.available.wait_timeout(pool, deadline - now).unwrap();
            pool = guard;
        }
    }

    /// Release one pin on a buffer, waking any waiting pin requests when the
    /// frame becomes free.
    pub fn unpin(&self, buf: &Arc<RwLock<Buffer>>) -> Result<(), BufferError> {
        let mut pool = self.state.lock().unwrap();
        let mut b = buf.write().unwrap();
        b.unpin()?;
        if !b.pinned() {
            pool.free_buf_count += 1;
            self.available.notify_all();
        }
        Ok(())
    }

    /// Flush every buffer dirtied by the given transaction.
    pub fn flush_all(&self, tx_num: TxNum) -> Result<(), BufferError> {
        let pool = self.state.lock().unwrap();
        for frame in pool.frames.iter() {
            let mut buf = frame.write().unwrap();
            if buf.tx_num() == tx_num {
                buf.flush()?;
            }
        }
        Ok(())
    }

    pub fn available(&self) -> usize {
        self.state.lock().unwrap().free_buf_count
    }

    fn try_to_pin(
        pool: &mut Pool,
        blk: &BlockId,
    ) -> Result<Option<Arc<RwLock<Buffer>>>, BufferError> {
        let idx = match Self::find_assigned(pool, blk) {
            Some(idx) => idx,
            None => match Self::choose_unpinned(pool) {
                Some(idx) => {
                    let frame = Arc::clone(&pool.frames[idx]);
                    frame.write().unwrap().assign(blk.clone())?;
                    log::trace!("assigned {} to frame {}", blk, idx);
                    idx
                }
                None => return Ok(None),
            },
        };

        let frame = Arc::clone(&pool.frames[idx]);
        let mut buf = frame.write().unwrap();
        if !buf.pinned() {
            pool.free_buf_count -= 1;
        }
        buf.pin()?;
        drop(buf);
        Ok(Some(frame))
    }

    fn find_assigned(pool: &Pool, blk: &BlockId) -> Option<usize> {
        pool.frames.iter().position(|frame| {
            let buf = frame.read().unwrap();
            buf.blk() == Some(blk)
        })
    }

    fn choose_unpinned(pool: &Pool) -> Option<usize> {
        pool.frames
            .iter()
            .position(|frame| !frame.read().unwrap().pinned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    fn setup(buf_size: usize) -> (tempfile::TempDir, Arc<FileManager>, Arc<BufferManager>) {
        let td = tempdir().unwrap();
        let fm = Arc::new(FileManager::new(td.path().join("data"), 400).unwrap());
        let lm = Arc::new(LogManager::new(Arc::clone(&fm), "wal.log").unwrap());
        let bm = Arc::new(BufferManager::new(Arc::clone(&fm), lm, buf_size).unwrap());
        (td, fm, bm)
    }

    #[test]
    fn test_available_bookkeeping() {
        let (_td, fm, bm) = setup(3);
        for _ in 0..3 {
            fm.alloc("test").unwrap();
        }

        assert_eq!(bm.available(), 3);
        let buf0 = bm.pin(&BlockId::new("test", 0)).unwrap();
        assert_eq!(bm.available(), 2);
        let buf1 = bm.pin(&BlockId::new("test", 1)).unwrap();
        assert_eq!(bm.available(), 1);
        let buf2 = bm.pin(&BlockId::new("test", 2)).unwrap();
        assert_eq!(bm.available(), 0);

        // A second pin of a resident block costs no frame.
        let buf2_again = bm.pin(&BlockId::new("test", 2)).unwrap();
        assert_eq!(bm.available(), 0);

        bm.unpin(&buf0).unwrap();
        assert_eq!(bm.available(), 1);
        bm.unpin(&buf1).unwrap();
        bm.unpin(&buf2).unwrap();
        assert_eq!(bm.available(), 2);
        bm.unpin(&buf2_again).unwrap();
        assert_eq!(bm.available(), 3);
    }

    #[test]
    fn test_pin_waits_for_unpin() {
        let (_td, fm, bm) = setup(3);
        for _ in 0..4 {
            fm.alloc("test").unwrap();
        }

        let buf0 = bm.pin(&BlockId::new("test", 0)).unwrap();
        let _buf1 = bm.pin(&BlockId::new("test", 1)).unwrap();
        let _buf2 = bm.pin(&BlockId::new("test", 2)).unwrap();

        let handle = thread::spawn({
            let bm = Arc::clone(&bm);
            move || {
                // Blocks until the main thread unpins a frame.
                bm.pin(&BlockId::new("test", 3)).unwrap();
            }
        });

        thread::sleep(Duration::from_millis(50));
        bm.unpin(&buf0).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_pin_times_out_when_pool_is_exhausted() {
        let td = tempdir().unwrap();
        let fm = Arc::new(FileManager::new(td.path().join("data"), 400).unwrap());
        let lm = Arc::new(LogManager::new(Arc::clone(&fm), "wal.log").unwrap());
        let bm =
            BufferManager::with_max_wait(Arc::clone(&fm), lm, 1, Duration::from_millis(50))
                .unwrap();
        fm.alloc("test").unwrap();
        fm.alloc("test").unwrap();

        let _held = bm.pin(&BlockId::new("test", 0)).unwrap();
        assert!(matches!(
            bm.pin(&BlockId::new("test", 1)),
            Err(BufferError::PinTimeout)
        ));
    }

    #[test]
    fn test_eviction_writes_back_dirty_frame() {
        let (_td, fm, bm) = setup(1);
        let blk0 = fm.alloc("test").unwrap();
        let blk1 = fm.alloc("test").unwrap();

        let buf = bm.pin(&blk0).unwrap();
        {
            let mut b = buf.write().unwrap();
            b.page.write_i64(0, 42).unwrap();
            b.modify(1, 0).unwrap();
        }
        bm.unpin(&buf).unwrap();

        // Reassigning the only frame forces a flush of blk0.
        let buf = bm.pin(&blk1).unwrap();
        bm.unpin(&buf).unwrap();

        let mut page = crate::page::Page::new(400).unwrap();
        fm.read(&blk0, &mut page).unwrap();
        assert_eq!(page.read_i64(0).unwrap().0, 42);
    }

    #[test]
    fn test_parallel_pins() {
        let (_td, fm, bm) = setup(1);
        let num_threads = 3i64;
        let per_thread = 10i64;
        for _ in 0..num_threads * per_thread {
            fm.alloc("test").unwrap();
        }

        let mut handles = vec![];
        for t in 0..num_threads {
            let bm = Arc::clone(&bm);
            handles.push(thread::spawn(move || {
                for i in 0..per_thread {
                    let blk = BlockId::new("test", t * per_thread + i);
                    let buf = bm.pin(&blk).unwrap();
                    {
                        let mut b = buf.write().unwrap();
                        b.page.write_i64(0, t * per_thread + i).unwrap();
                        b.modify((t + 1) as TxNum, 0).unwrap();
                    }
                    bm.unpin(&buf).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for p in 0..num_threads * per_thread {
            let buf = bm.pin(&BlockId::new("test", p)).unwrap();
            let val = buf.read().unwrap().page.read_i64(0).unwrap().0;
            assert_eq!(val, p);
            bm.unpin(&buf).unwrap();
        }
    }
}
