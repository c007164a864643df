//! Notebook tree data model and persistence core for Markbook.
//! Markbook 的筆記本樹狀資料模型與持久化核心。
//!
//! Content is organized as a forest of notebooks holding sections and
//! pages; the whole forest round-trips through a versioned JSON save file,
//! while each page's rich-text payload lives in its own opaque document
//! file next to it.

mod legacy;

pub mod item;
pub mod library;
pub mod page_store;
pub mod save;
pub mod save_store;

pub use item::{ItemId, ItemKind, NotebookItem};
pub use library::{Library, LibraryError};
pub use page_store::{PageDocumentStore, PageStoreError};
pub use save::{DecodedSave, Save, SaveDataError, TreeError, SAVE_FORMAT_VERSION};
pub use save_store::{SaveStore, SaveStoreError};
