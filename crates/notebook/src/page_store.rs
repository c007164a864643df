use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::save_store::write_atomic;

/// Stores per-page document payloads: one opaque blob per page under a
/// documents directory, addressed by the page's file name. The payload
/// format belongs to the editor; this store only moves bytes. Deleting
/// tree items never deletes payloads, so an accidental delete stays
/// recoverable.
/// 每頁一個不透明的文件內容檔，依頁面檔名存放於文件目錄。內容格式屬於
/// 編輯器，本儲存器僅搬運位元組。刪除樹節點不會刪除內容檔。
#[derive(Debug)]
pub struct PageDocumentStore {
    dir: PathBuf,
}

/// Errors emitted by [`PageDocumentStore`].
/// [`PageDocumentStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum PageStoreError {
    #[error("page document IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid page document file name: {0:?}")]
    InvalidFileName(String),
}

impl PageDocumentStore {
    /// Constructs a store rooted at the provided documents directory.
    /// 建立以指定文件目錄為根的儲存器。
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a page file name inside the documents directory. Only plain
    /// file names are accepted; a corrupt save must not be able to address
    /// files outside the directory.
    /// 解析文件目錄內的頁面檔名。僅接受單純檔名，毀損的存檔不得指向
    /// 目錄之外的檔案。
    pub fn document_path(&self, file_name: &str) -> Result<PathBuf, PageStoreError> {
        if file_name.is_empty()
            || file_name == "."
            || file_name == ".."
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            return Err(PageStoreError::InvalidFileName(file_name.to_string()));
        }
        Ok(self.dir.join(file_name))
    }

    pub fn exists(&self, file_name: &str) -> Result<bool, PageStoreError> {
        Ok(self.document_path(file_name)?.exists())
    }

    /// Loads a page's payload, `Ok(None)` when none has been written yet
    /// (a freshly created page has a file name but no content).
    /// 載入頁面內容；尚未寫入任何內容時回傳 `Ok(None)`。
    pub fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>, PageStoreError> {
        let path = self.document_path(file_name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PageStoreError::Io(err)),
        }
    }

    /// Writes a page's payload atomically.
    /// 以原子方式寫入頁面內容。
    pub fn save(&self, file_name: &str, payload: &[u8]) -> Result<(), PageStoreError> {
        let path = self.document_path(file_name)?;
        write_atomic(&path, payload).map_err(PageStoreError::Io)
    }
}
