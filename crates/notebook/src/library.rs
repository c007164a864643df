use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::item::{ItemId, ItemKind, NotebookItem};
use crate::save::{Save, TreeError};
use crate::save_store::{SaveStore, SaveStoreError};

/// Owns the in-memory save for the lifetime of the process: loaded once at
/// startup, mutated in place by user actions, flushed synchronously after
/// every mutation so persistence completes before the next edit is
/// accepted. Alongside the forest it keeps an `id → parent-id` side index,
/// rebuilt after every structural change — parent pointers are never stored
/// on the nodes themselves.
/// 行程期間唯一的記憶體內存檔：啟動時載入一次，依使用者操作就地修改，
/// 每次修改後同步寫回。另維護「識別碼 → 父識別碼」側索引，於每次
/// 結構變動後重建，節點本身絕不儲存父指標。
#[derive(Debug)]
pub struct Library {
    save: Save,
    store: SaveStore,
    parents: HashMap<ItemId, Option<ItemId>>,
    migrated_on_open: bool,
}

/// Errors emitted by [`Library`].
/// [`Library`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Store(#[from] SaveStoreError),
    #[error("no item with id {0} exists in the library")]
    UnknownItem(ItemId),
}

impl Library {
    /// Opens the library backed by the save file at `path`: decodes an
    /// existing save (running the pre-2.0 conversion when needed and
    /// writing the upgraded form back immediately so it is durable), or
    /// starts empty when no file exists yet.
    /// 開啟以 `path` 存檔為後盾的書庫：既有存檔直接解碼（必要時執行
    /// 舊格式轉換並立即寫回），無存檔則以空內容啟動。
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let store = SaveStore::new(path);
        let (save, migrated) = match store.load()? {
            Some(decoded) => (decoded.save, decoded.migrated),
            None => (Save::new(), false),
        };

        let mut library = Self {
            save,
            store,
            parents: HashMap::new(),
            migrated_on_open: migrated,
        };
        library.rebuild_index();
        if migrated {
            library.flush()?;
        }
        Ok(library)
    }

    /// Whether opening converted a pre-2.0 save file.
    /// 開啟時是否轉換了 2.0 之前的存檔。
    pub fn migrated_on_open(&self) -> bool {
        self.migrated_on_open
    }

    pub fn save(&self) -> &Save {
        &self.save
    }

    pub fn get(&self, id: ItemId) -> Option<&NotebookItem> {
        self.save.find(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.parents.contains_key(&id)
    }

    /// Parent id from the side index; `None` for top-level notebooks and
    /// unknown ids.
    /// 自側索引取得父識別碼；頂層筆記本與未知識別碼皆為 `None`。
    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn all_pages(&self) -> Vec<&NotebookItem> {
        self.save.all_pages()
    }

    /// Creates a new item and attaches it: notebooks at the top level
    /// (`parent = None`), sections and pages under an existing container.
    /// 建立並掛載新項目：筆記本置於頂層（`parent = None`），分區與
    /// 頁面置於既有容器之下。
    pub fn create(
        &mut self,
        parent: Option<ItemId>,
        kind: ItemKind,
        name: impl Into<String>,
    ) -> Result<ItemId, LibraryError> {
        let item = NotebookItem::new(kind, name);
        let id = match parent {
            None => self.save.add_notebook(item)?,
            Some(parent_id) => self.save.insert(parent_id, item)?,
        };
        self.after_structural_change()?;
        Ok(id)
    }

    /// Applies a display-metadata edit: rename, recolor, re-icon, favorite
    /// or expanded toggle. The item's identity, kind and structure are not
    /// reachable through the borrow handed to `op`.
    /// 套用顯示欄位編輯（改名、改色、改圖示、最愛/展開切換）。`op`
    /// 拿到的借用無法更動識別碼、類型與結構。
    pub fn update<F>(&mut self, id: ItemId, op: F) -> Result<(), LibraryError>
    where
        F: FnOnce(&mut NotebookItem),
    {
        let item = self
            .save
            .find_mut(id)
            .ok_or(LibraryError::UnknownItem(id))?;
        op(item);
        self.flush()
    }

    /// Detaches and returns the subtree rooted at `id`. The pages'
    /// documents on disk are kept.
    /// 卸下並回傳以 `id` 為根的子樹；磁碟上的頁面文件保留。
    pub fn delete(&mut self, id: ItemId) -> Result<NotebookItem, LibraryError> {
        let removed = self.save.remove(id)?;
        self.after_structural_change()?;
        Ok(removed)
    }

    /// Moves an item to a new parent, composed as detach plus append.
    /// 將項目搬移至新父節點，以卸下加附加的方式完成。
    pub fn move_item(
        &mut self,
        id: ItemId,
        new_parent: Option<ItemId>,
    ) -> Result<(), LibraryError> {
        self.save.move_item(id, new_parent)?;
        self.after_structural_change()
    }

    /// Writes the current state through the store; mutations only return
    /// once this has completed.
    /// 經由儲存器寫回目前狀態；各項修改在寫回完成後才回傳。
    pub fn flush(&self) -> Result<(), LibraryError> {
        self.store.save(&self.save)?;
        Ok(())
    }

    fn after_structural_change(&mut self) -> Result<(), LibraryError> {
        self.rebuild_index();
        self.flush()
    }

    fn rebuild_index(&mut self) {
        fn recurse(
            map: &mut HashMap<ItemId, Option<ItemId>>,
            item: &NotebookItem,
            parent: Option<ItemId>,
        ) {
            map.insert(item.id(), parent);
            for child in item.children() {
                recurse(map, child, Some(item.id()));
            }
        }

        self.parents.clear();
        for notebook in self.save.notebooks() {
            recurse(&mut self.parents, notebook, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn open_without_file_starts_empty() {
        let dir = tempdir().unwrap();
        let library = Library::open(dir.path().join("save.json")).unwrap();
        assert!(library.save().notebooks().is_empty());
        assert!(!library.migrated_on_open());
    }

    #[test]
    fn mutations_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");

        let (nb, page) = {
            let mut library = Library::open(&path).unwrap();
            let nb = library.create(None, ItemKind::Notebook, "Work").unwrap();
            let section = library.create(Some(nb), ItemKind::Section, "Q3").unwrap();
            let page = library.create(Some(section), ItemKind::Page, "Plan").unwrap();
            library.update(page, |item| item.favorite = true).unwrap();
            (nb, page)
        };

        let library = Library::open(&path).unwrap();
        assert_eq!(library.save().notebooks().len(), 1);
        assert_eq!(library.save().notebooks()[0].id(), nb);
        let pages = library.all_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id(), page);
        assert!(pages[0].favorite);
    }

    #[test]
    fn parent_index_tracks_structural_changes() {
        let dir = tempdir().unwrap();
        let mut library = Library::open(dir.path().join("save.json")).unwrap();

        let nb = library.create(None, ItemKind::Notebook, "NB").unwrap();
        let section = library.create(Some(nb), ItemKind::Section, "S").unwrap();
        let page = library.create(Some(section), ItemKind::Page, "P").unwrap();

        assert_eq!(library.parent_of(nb), None);
        assert_eq!(library.parent_of(section), Some(nb));
        assert_eq!(library.parent_of(page), Some(section));

        library.move_item(page, Some(nb)).unwrap();
        assert_eq!(library.parent_of(page), Some(nb));

        library.delete(section).unwrap();
        assert!(!library.contains(section));
        assert!(library.contains(page));
    }

    #[test]
    fn delete_detaches_descendants_everywhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        let mut library = Library::open(&path).unwrap();

        let nb = library.create(None, ItemKind::Notebook, "NB").unwrap();
        let section = library.create(Some(nb), ItemKind::Section, "S").unwrap();
        let page = library.create(Some(section), ItemKind::Page, "P").unwrap();

        let removed = library.delete(section).unwrap();
        assert_eq!(removed.pages().len(), 1);
        assert!(library.all_pages().is_empty());
        assert!(!library.contains(page));

        // the flush happened before delete returned
        let reopened = Library::open(&path).unwrap();
        assert!(reopened.all_pages().is_empty());
    }

    #[test]
    fn opening_a_legacy_file_rewrites_it_in_the_current_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(
            &path,
            br#"{"notebooks":[{"name":"CS","pages":[{"title":"Intro","fileName":"a.json","favorite":false}]}]}"#,
        )
        .unwrap();

        let library = Library::open(&path).unwrap();
        assert!(library.migrated_on_open());
        assert_eq!(library.all_pages()[0].file_name(), Some("a.json"));

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("\"version\""));

        let reopened = Library::open(&path).unwrap();
        assert!(!reopened.migrated_on_open());
    }

    #[test]
    fn invalid_creates_are_rejected() {
        let dir = tempdir().unwrap();
        let mut library = Library::open(dir.path().join("save.json")).unwrap();

        assert!(matches!(
            library.create(None, ItemKind::Page, "floating"),
            Err(LibraryError::Tree(TreeError::NotANotebook(_)))
        ));

        let nb = library.create(None, ItemKind::Notebook, "NB").unwrap();
        let page = library.create(Some(nb), ItemKind::Page, "P").unwrap();
        assert!(matches!(
            library.create(Some(page), ItemKind::Page, "child"),
            Err(LibraryError::Tree(TreeError::InvalidParentKind(_)))
        ));
        assert!(matches!(
            library.create(Some(nb), ItemKind::Notebook, "inner"),
            Err(LibraryError::Tree(TreeError::NestedNotebook(_)))
        ));
    }
}
