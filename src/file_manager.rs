use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Error, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::block_id::BlockId;
use crate::page::Page;

/// Files whose name starts with this prefix are scratch space and are removed
/// when the storage directory is opened.
const TMP_FILE_PREFIX: &str = "tmp_";

/// FileManager owns a directory of block-structured files.
///
/// A single mutex serialises all operations: the seek+read/write pair on a
/// shared file handle is not atomic.
pub struct FileManager {
    inner: Mutex<HashMap<String, File>>,
    dir_path: PathBuf,
    blk_size: usize,
}

impl FileManager {
    /// Open (creating if necessary) the storage directory and delete any
    /// residual `tmp_` files from earlier runs.
    pub fn new(dir_path: PathBuf, blk_size: usize) -> Result<Self, Error> {
        if !dir_path.exists() {
            fs::create_dir_all(&dir_path)?;
        } else {
            for entry in fs::read_dir(&dir_path)? {
                let entry = entry?;
                let name = entry.file_name();
                if name.to_string_lossy().starts_with(TMP_FILE_PREFIX) {
                    fs::remove_file(entry.path())?;
                }
            }
        }

        Ok(Self {
            inner: Mutex::new(HashMap::new()),
            dir_path,
            blk_size,
        })
    }

    pub fn blk_size(&self) -> usize {
        self.blk_size
    }

    /// Read the contents of a block into a page.
    pub fn read(&self, blk: &BlockId, page: &mut Page) -> Result<(), Error> {
        let mut files = self.inner.lock().unwrap();
        let f = Self::open(&mut files, &self.dir_path, blk.file_name())?;
        f.seek(SeekFrom::Start(Self::position(blk, self.blk_size)))?;
        f.read_exact(page.contents_mut())?;
        Ok(())
    }

    /// Write the contents of a page to a block on disk. The data is durable
    /// when this returns.
    pub fn write(&self, blk: &BlockId, page: &Page) -> Result<(), Error> {
        let mut files = self.inner.lock().unwrap();
        let f = Self::open(&mut files, &self.dir_path, blk.file_name())?;
        f.seek(SeekFrom::Start(Self::position(blk, self.blk_size)))?;
        f.write_all(page.contents())?;
        f.sync_data()?;
        Ok(())
    }

    /// Extend a file by one zero-filled block and return its id.
    pub fn alloc(&self, file_name: &str) -> Result<BlockId, Error> {
        let mut files = self.inner.lock().unwrap();
        let f = Self::open(&mut files, &self.dir_path, file_name)?;
        let blk_num = (f.metadata()?.len() / self.blk_size as u64) as i64;
        f.seek(SeekFrom::Start(blk_num as u64 * self.blk_size as u64))?;
        f.write_all(&vec![0; self.blk_size])?;
        f.sync_data()?;
        Ok(BlockId::new(file_name, blk_num))
    }

    /// The number of blocks in a file.
    pub fn block_count(&self, file_name: &str) -> Result<i64, Error> {
        let mut files = self.inner.lock().unwrap();
        let f = Self::open(&mut files, &self.dir_path, file_name)?;
        Ok((f.metadata()?.len() / self.blk_size as u64) as i64)
    }

    fn position(blk: &BlockId, blk_size: usize) -> u64 {
        debug_assert!(blk.blk_num() >= 0, "block {} has no disk location", blk);
        blk.blk_num() as u64 * blk_size as u64
    }

    fn open<'a>(
        files: &'a mut HashMap<String, File>,
        dir_path: &std::path::Path,
        file_name: &str,
    ) -> Result<&'a mut File, Error> {
        if !files.contains_key(file_name) {
            let f = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(dir_path.join(file_name))?;
            files.insert(file_name.to_string(), f);
        }
        Ok(files.get_mut(file_name).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup(blk_size: usize) -> (tempfile::TempDir, FileManager) {
        let td = tempdir().unwrap();
        let fm = FileManager::new(td.path().join("data"), blk_size).unwrap();
        (td, fm)
    }

    #[test]
    fn test_alloc_read_write() {
        let (_td, fm) = setup(400);

        assert_eq!(fm.block_count("test").unwrap(), 0);
        let blk = fm.alloc("test").unwrap();
        assert_eq!(blk.blk_num(), 0);
        assert_eq!(fm.block_count("test").unwrap(), 1);

        let mut page = Page::new(400).unwrap();
        page.write_i64(80, -1900).unwrap();
        page.write_string(120, "Hello").unwrap();
        fm.write(&blk, &page).unwrap();

        let mut reread = Page::new(400).unwrap();
        fm.read(&blk, &mut reread).unwrap();
        assert_eq!(reread.read_i64(80).unwrap().0, -1900);
        assert_eq!(reread.read_string(120).unwrap().0, "Hello");
    }

    #[test]
    fn test_alloc_returns_sequential_blocks() {
        let (_td, fm) = setup(400);
        for i in 0..5 {
            let blk = fm.alloc("seq").unwrap();
            assert_eq!(blk.blk_num(), i);
        }
        assert_eq!(fm.block_count("seq").unwrap(), 5);
    }

    #[test]
    fn test_alloc_zero_fills() {
        let (_td, fm) = setup(400);
        let blk = fm.alloc("zeroed").unwrap();
        let mut page = Page::new(400).unwrap();
        page.write_i64(0, 42).unwrap();
        fm.read(&blk, &mut page).unwrap();
        assert!(page.contents().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_tmp_files_removed_on_startup() {
        let td = tempdir().unwrap();
        let dir = td.path().join("data");
        {
            let fm = FileManager::new(dir.clone(), 400).unwrap();
            fm.alloc("tmp_scratch").unwrap();
            fm.alloc("table").unwrap();
        }
        assert!(dir.join("tmp_scratch").exists());

        let _fm = FileManager::new(dir.clone(), 400).unwrap();
        assert!(!dir.join("tmp_scratch").exists());
        assert!(dir.join("table").exists());
    }
}
