use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::save::{DecodedSave, Save, SaveDataError};

/// Persists [`Save`] snapshots to disk as JSON with atomic writes.
/// 以 JSON 搭配原子寫入方式將 [`Save`] 快照存入磁碟。
#[derive(Debug)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    /// Constructs a store bound to the provided path.
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing path used for persistence.
    /// 取得此儲存器使用的檔案路徑。
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the save, returning `Ok(None)` when the file is absent (first
    /// launch). A pre-2.0 file is converted in memory and flagged via
    /// [`DecodedSave::migrated`]; writing the upgraded form back is the
    /// caller's call.
    /// 載入存檔；檔案不存在（首次啟動）時回傳 `Ok(None)`。2.0 之前的
    /// 檔案於記憶體中轉換並以 [`DecodedSave::migrated`] 標示，何時寫回
    /// 由呼叫端決定。
    pub fn load(&self) -> Result<Option<DecodedSave>, SaveStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(Save::from_json_bytes(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SaveStoreError::Io(err)),
        }
    }

    /// Writes the provided save atomically to disk.
    /// 將傳入的存檔以原子方式寫入磁碟。
    pub fn save(&self, save: &Save) -> Result<(), SaveStoreError> {
        let payload = save.to_json_bytes()?;
        write_atomic(&self.path, &payload).map_err(SaveStoreError::Io)
    }
}

/// Errors emitted by [`SaveStore`].
/// [`SaveStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum SaveStoreError {
    #[error("save file IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Data(#[from] SaveDataError),
}

/// Temp sibling plus rename, so readers never observe a half-written file.
/// 以臨時檔案搭配 rename 寫入，讀取端不會看到寫到一半的檔案。
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
