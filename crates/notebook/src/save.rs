use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::{ItemId, ItemKind, NotebookItem};
use crate::legacy;

/// Schema generation written into every save produced by this build.
pub const SAVE_FORMAT_VERSION: &str = "2.0.0";

/// Root persisted object: the schema version tag plus the forest of
/// top-level notebooks, in display order.
/// 持久化的根物件：格式版本標籤加上依顯示順序排列的頂層筆記本森林。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Save {
    pub(crate) version: String,
    #[serde(default)]
    pub(crate) notebooks: Vec<NotebookItem>,
}

impl Default for Save {
    fn default() -> Self {
        Self::new()
    }
}

/// Tree-manipulation errors.
/// 樹狀結構操作的錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The requested parent id exists nowhere in the forest. Also raised
    /// when a move targets a spot inside the subtree being moved, since the
    /// detach would take that destination out of the forest.
    #[error("no container with id {0} exists in the forest")]
    ParentNotFound(ItemId),
    /// Pages cannot accept children.
    #[error("item {0} is a page and cannot accept children")]
    InvalidParentKind(ItemId),
    /// Notebooks only live at the top level of the forest.
    #[error("notebook {0} cannot be nested under another item")]
    NestedNotebook(ItemId),
    /// Only notebooks may be placed at the top level.
    #[error("item {0} is not a notebook and cannot sit at the top level")]
    NotANotebook(ItemId),
    /// The item is not reachable from any top-level notebook. Signals a
    /// consistency bug upstream; never swallowed.
    #[error("item {0} is not reachable from any top-level notebook")]
    OrphanedNode(ItemId),
}

impl Save {
    /// An empty save in the current format.
    /// 建立目前格式的空存檔。
    pub fn new() -> Self {
        Self {
            version: SAVE_FORMAT_VERSION.to_string(),
            notebooks: Vec::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Top-level notebooks in display order.
    /// 依顯示順序排列的頂層筆記本。
    pub fn notebooks(&self) -> &[NotebookItem] {
        &self.notebooks
    }

    /// Appends a notebook at the end of the top level.
    /// 將筆記本附加到頂層末端。
    pub fn add_notebook(&mut self, notebook: NotebookItem) -> Result<ItemId, TreeError> {
        if notebook.kind() != ItemKind::Notebook {
            return Err(TreeError::NotANotebook(notebook.id()));
        }
        let id = notebook.id();
        self.notebooks.push(notebook);
        Ok(id)
    }

    /// Appends `item` at the end of the children of `parent_id`, keeping
    /// the existing order untouched. Notebooks are refused here; they only
    /// go through [`Save::add_notebook`].
    /// 將 `item` 附加到 `parent_id` 子清單末端，既有順序不變。筆記本
    /// 不得巢狀，只能經由 [`Save::add_notebook`] 加入。
    pub fn insert(&mut self, parent_id: ItemId, item: NotebookItem) -> Result<ItemId, TreeError> {
        if item.kind() == ItemKind::Notebook {
            return Err(TreeError::NestedNotebook(item.id()));
        }
        let parent = find_in_mut(&mut self.notebooks, parent_id)
            .ok_or(TreeError::ParentNotFound(parent_id))?;
        let id = item.id();
        match parent.children_mut() {
            Some(children) => {
                children.push(item);
                Ok(id)
            }
            None => Err(TreeError::InvalidParentKind(parent_id)),
        }
    }

    /// Finds an item anywhere in the forest by id.
    /// 依識別碼在森林中尋找項目。
    pub fn find(&self, id: ItemId) -> Option<&NotebookItem> {
        find_in(&self.notebooks, id)
    }

    pub(crate) fn find_mut(&mut self, id: ItemId) -> Option<&mut NotebookItem> {
        find_in_mut(&mut self.notebooks, id)
    }

    /// Finds the container whose immediate children hold `id`. Returns
    /// `None` both for top-level notebooks and for unknown ids. The search
    /// is depth first and stops at the first match, so with duplicated
    /// subtrees the answer is the first one in traversal order.
    /// 尋找直接子清單含有 `id` 的容器。頂層筆記本與未知識別碼皆回傳
    /// `None`。採深度優先且於首個符合者即停止。
    pub fn find_parent(&self, id: ItemId) -> Option<&NotebookItem> {
        fn search(item: &NotebookItem, id: ItemId) -> Option<&NotebookItem> {
            let children = item.children();
            if children.iter().any(|child| child.id() == id) {
                return Some(item);
            }
            for child in children {
                if let Some(found) = search(child, id) {
                    return Some(found);
                }
            }
            None
        }

        self.notebooks.iter().find_map(|nb| search(nb, id))
    }

    /// Detaches and returns the subtree rooted at `id`: top-level notebooks
    /// leave the forest sequence, anything else leaves its parent's
    /// children. Descendants go with it in one step. Page documents on
    /// disk are left in place so an accidental delete stays recoverable.
    /// 卸下並回傳以 `id` 為根的子樹：頂層筆記本自森林序列移除，其餘
    /// 項目自父節點子清單移除，子孫一併帶走。磁碟上的頁面文件保留。
    pub fn remove(&mut self, id: ItemId) -> Result<NotebookItem, TreeError> {
        if let Some(pos) = self.notebooks.iter().position(|nb| nb.id() == id) {
            return Ok(self.notebooks.remove(pos));
        }
        remove_in(&mut self.notebooks, id).ok_or(TreeError::OrphanedNode(id))
    }

    /// Moves an item: detach, then append at the destination (`None` means
    /// the top level, valid only for notebooks). The destination is
    /// validated before anything is detached, so a failed move never drops
    /// the subtree; the moved item lands at the end of the destination's
    /// children.
    /// 搬移項目：先卸下，再附加到目的地末端（`None` 代表頂層，僅筆記本
    /// 適用）。卸下前即驗證目的地，失敗的搬移不會遺失子樹。
    pub fn move_item(&mut self, id: ItemId, new_parent: Option<ItemId>) -> Result<(), TreeError> {
        let kind = self
            .find(id)
            .map(NotebookItem::kind)
            .ok_or(TreeError::OrphanedNode(id))?;

        match new_parent {
            None => {
                if kind != ItemKind::Notebook {
                    return Err(TreeError::NotANotebook(id));
                }
                let item = self.remove(id)?;
                self.notebooks.push(item);
                Ok(())
            }
            Some(parent_id) => {
                if kind == ItemKind::Notebook {
                    return Err(TreeError::NestedNotebook(id));
                }
                let parent = self
                    .find(parent_id)
                    .ok_or(TreeError::ParentNotFound(parent_id))?;
                if !parent.is_container() {
                    return Err(TreeError::InvalidParentKind(parent_id));
                }
                // A destination inside the moved subtree would leave the
                // forest together with it.
                let subtree = self.find(id).map(NotebookItem::children).unwrap_or(&[]);
                if parent_id == id || find_in(subtree, parent_id).is_some() {
                    return Err(TreeError::ParentNotFound(parent_id));
                }
                let item = self.remove(id)?;
                self.insert(parent_id, item).map(|_| ())
            }
        }
    }

    /// Every page in the forest, depth first, children in order.
    /// 森林中的全部頁面，深度優先、子項目依序。
    pub fn all_pages(&self) -> Vec<&NotebookItem> {
        self.notebooks.iter().flat_map(NotebookItem::pages).collect()
    }

    fn normalize(&mut self) {
        for notebook in &mut self.notebooks {
            notebook.normalize();
        }
    }

    /// Checks the structural invariants: globally unique ids, children
    /// present exactly on containers, document file names exactly on pages,
    /// notebooks at the top level and nowhere else.
    /// 檢查結構不變量：識別碼全域唯一、僅容器有子清單、僅頁面有文件
    /// 檔名、筆記本只出現在頂層。
    fn validate(&self) -> Result<(), String> {
        fn check(
            item: &NotebookItem,
            top_level: bool,
            seen: &mut HashSet<ItemId>,
        ) -> Result<(), String> {
            if !seen.insert(item.id()) {
                return Err(format!("duplicate item id {}", item.id()));
            }
            match item.kind() {
                ItemKind::Notebook if !top_level => {
                    return Err(format!("notebook {} is nested below the top level", item.id()));
                }
                ItemKind::Page => {
                    if item.children.is_some() {
                        return Err(format!("page {} carries children", item.id()));
                    }
                    if item.file_name.is_none() {
                        return Err(format!("page {} has no document file name", item.id()));
                    }
                }
                _ => {
                    if item.children.is_none() {
                        return Err(format!("container {} has no child list", item.id()));
                    }
                    if item.file_name.is_some() {
                        return Err(format!("container {} carries a document file name", item.id()));
                    }
                }
            }
            for child in item.children() {
                check(child, false, seen)?;
            }
            Ok(())
        }

        let mut seen = HashSet::new();
        for notebook in &self.notebooks {
            if notebook.kind() != ItemKind::Notebook {
                return Err(format!("top-level item {} is not a notebook", notebook.id()));
            }
            check(notebook, true, &mut seen)?;
        }
        Ok(())
    }
}

fn find_in(items: &[NotebookItem], id: ItemId) -> Option<&NotebookItem> {
    for item in items {
        if item.id() == id {
            return Some(item);
        }
        if let Some(found) = find_in(item.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(items: &mut [NotebookItem], id: ItemId) -> Option<&mut NotebookItem> {
    for item in items.iter_mut() {
        if item.id() == id {
            return Some(item);
        }
        if let Some(children) = item.children_mut() {
            if let Some(found) = find_in_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_in(items: &mut [NotebookItem], id: ItemId) -> Option<NotebookItem> {
    for item in items.iter_mut() {
        if let Some(children) = item.children_mut() {
            if let Some(pos) = children.iter().position(|child| child.id() == id) {
                return Some(children.remove(pos));
            }
            if let Some(found) = remove_in(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Outcome of decoding a save payload: the container itself plus whether it
/// went through the pre-2.0 conversion on the way in.
/// 解碼存檔的結果：容器本身，以及是否經過 2.0 之前格式的轉換。
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSave {
    pub save: Save,
    pub migrated: bool,
}

/// Save-payload decoding errors. Malformed current-format data and a failed
/// legacy conversion are reported distinctly so the user can be told which
/// one went wrong.
/// 存檔解碼錯誤。目前格式毀損與舊格式轉換失敗分開回報。
#[derive(Debug, Error)]
pub enum SaveDataError {
    #[error("save data could not be parsed: {0}")]
    Malformed(String),
    #[error("pre-2.0 save conversion failed: {0}")]
    Migration(String),
}

impl Save {
    /// Order-preserving JSON encoding of the full forest.
    /// 保序的完整森林 JSON 編碼。
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SaveDataError> {
        serde_json::to_vec_pretty(self).map_err(|err| SaveDataError::Malformed(err.to_string()))
    }

    /// Decodes a save payload. A `version` field selects the current
    /// schema, with documented defaults filling any missing optional
    /// fields; its absence marks a pre-2.0 file and routes through the
    /// one-time legacy conversion. Both paths validate the result before
    /// handing it out.
    /// 解碼存檔。含 `version` 欄位者以目前格式解讀，缺漏欄位補預設值；
    /// 無 `version` 者視為 2.0 之前的檔案，走一次性轉換。兩者皆於
    /// 回傳前驗證結構。
    pub fn from_json_bytes(bytes: &[u8]) -> Result<DecodedSave, SaveDataError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|err| SaveDataError::Malformed(err.to_string()))?;

        if value.get("version").is_some() {
            let mut save: Save = serde_json::from_value(value)
                .map_err(|err| SaveDataError::Malformed(err.to_string()))?;
            save.normalize();
            save.validate().map_err(SaveDataError::Malformed)?;
            Ok(DecodedSave {
                save,
                migrated: false,
            })
        } else {
            let save = legacy::migrate(value)?;
            save.validate().map_err(SaveDataError::Migration)?;
            Ok(DecodedSave {
                save,
                migrated: true,
            })
        }
    }
}
