use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const DEFAULT_COLOR: &str = "#000000";

/// Unique identifier assigned to every item in the notebook forest.
/// 筆記本森林中每個項目的唯一識別碼。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generates a fresh random identifier, assignable offline before any
    /// persistence happens.
    /// 產生新的隨機識別碼，可在任何持久化之前離線指派。
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier previously produced by [`ItemId::new`].
    /// 解析先前由 [`ItemId::new`] 產生的識別碼字串。
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of notebook item. Fixed at construction.
/// 筆記本項目的類型，建立後不再改變。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Notebook,
    Section,
    Page,
}

impl ItemKind {
    /// Notebooks and sections hold children; pages do not.
    /// 筆記本與分區可容納子項目，頁面不行。
    pub fn is_container(&self) -> bool {
        matches!(self, ItemKind::Notebook | ItemKind::Section)
    }

    pub(crate) fn default_icon(&self) -> &'static str {
        match self {
            ItemKind::Notebook => "book",
            ItemKind::Section => "folder",
            ItemKind::Page => "file-text",
        }
    }
}

/// A single node of the notebook tree: a notebook, a section or a page.
/// Identity and kind are fixed at construction; display metadata stays
/// freely editable. Containers own their children in order, pages carry the
/// file name of their externally stored document instead.
/// 筆記本樹的單一節點。識別碼與類型在建立時固定；顯示欄位可自由編輯。
/// 容器依序持有子項目，頁面則記錄外部文件的檔名。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotebookItem {
    pub(crate) id: ItemId,
    #[serde(rename = "type")]
    pub(crate) kind: ItemKind,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) children: Option<Vec<NotebookItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) file_name: Option<String>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl NotebookItem {
    /// Creates a detached item of the given kind: fresh id, icon derived
    /// from the kind, empty children for containers, a `<id>.json` document
    /// file name for pages. The item is not inserted anywhere.
    /// 建立未掛載的項目：新識別碼、依類型決定的圖示、容器附空子清單、
    /// 頁面附 `<id>.json` 文件檔名。不會插入任何樹中。
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        let id = ItemId::new();
        Self {
            id,
            kind,
            name: name.into(),
            color: DEFAULT_COLOR.to_string(),
            icon: kind.default_icon().to_string(),
            expanded: false,
            favorite: false,
            children: if kind.is_container() {
                Some(Vec::new())
            } else {
                None
            },
            file_name: if kind == ItemKind::Page {
                Some(format!("{id}.json"))
            } else {
                None
            },
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// File name of the externally stored document; `Some` only for pages.
    /// 外部文件的檔名，僅頁面為 `Some`。
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Immediate children in display order. Empty for pages.
    /// 依顯示順序排列的直接子項目；頁面回傳空集合。
    pub fn children(&self) -> &[NotebookItem] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NotebookItem>> {
        self.children.as_mut()
    }

    /// Collects every page in this subtree, depth first, children in order.
    /// Traversal starts at the children; the receiver itself is never part
    /// of the result.
    /// 以深度優先、子項目依序的方式收集此子樹中所有頁面。走訪從子項目
    /// 開始，不包含節點本身。
    pub fn pages(&self) -> Vec<&NotebookItem> {
        fn recurse<'a>(item: &'a NotebookItem, out: &mut Vec<&'a NotebookItem>) {
            if item.kind == ItemKind::Page {
                out.push(item);
            } else {
                for child in item.children() {
                    recurse(child, out);
                }
            }
        }

        let mut out = Vec::new();
        for child in self.children() {
            recurse(child, &mut out);
        }
        out
    }

    /// Restores invariants on items decoded from older or hand-edited
    /// saves: kind-appropriate icon when missing, the default color when
    /// missing, an empty child list for containers, the id-derived
    /// document file name for pages.
    /// 修補自舊檔或手改存檔解碼出的項目：補上類型圖示、預設顏色、
    /// 容器缺少的空子清單，以及頁面依識別碼推得的文件檔名。
    pub(crate) fn normalize(&mut self) {
        if self.icon.is_empty() {
            self.icon = self.kind.default_icon().to_string();
        }
        if self.color.is_empty() {
            self.color = DEFAULT_COLOR.to_string();
        }
        if self.kind.is_container() && self.children.is_none() {
            self.children = Some(Vec::new());
        }
        if self.kind == ItemKind::Page && self.file_name.is_none() {
            self.file_name = Some(format!("{}.json", self.id));
        }
        if let Some(children) = self.children.as_mut() {
            for child in children {
                child.normalize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_pairwise_distinct() {
        let ids: HashSet<ItemId> = (0..256)
            .map(|_| NotebookItem::new(ItemKind::Page, "p").id())
            .collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn ids_round_trip_through_display() {
        let id = ItemId::new();
        assert_eq!(ItemId::parse(&id.to_string()).unwrap(), id);
        assert!(ItemId::parse("not-an-id").is_err());
    }

    #[test]
    fn construction_derives_kind_defaults() {
        let notebook = NotebookItem::new(ItemKind::Notebook, "School");
        assert_eq!(notebook.icon, "book");
        assert!(notebook.children.is_some());
        assert!(notebook.file_name().is_none());

        let section = NotebookItem::new(ItemKind::Section, "Math");
        assert_eq!(section.icon, "folder");
        assert!(section.children.is_some());

        let page = NotebookItem::new(ItemKind::Page, "Algebra");
        assert_eq!(page.icon, "file-text");
        assert!(page.children.is_none());
        assert_eq!(page.file_name(), Some(format!("{}.json", page.id()).as_str()));
        assert!(!page.favorite);
        assert_eq!(page.color, "#000000");
    }

    #[test]
    fn kind_survives_display_edits() {
        let mut page = NotebookItem::new(ItemKind::Page, "Draft");
        page.name = "Final".to_string();
        page.color = "#ff0000".to_string();
        page.icon = "star".to_string();
        page.favorite = true;
        assert_eq!(page.kind(), ItemKind::Page);
    }

    #[test]
    fn pages_walks_depth_first_without_the_receiver() {
        let mut notebook = NotebookItem::new(ItemKind::Notebook, "NB");
        let mut section = NotebookItem::new(ItemKind::Section, "S");
        let inner = NotebookItem::new(ItemKind::Page, "inner");
        let inner_id = inner.id();
        section.children_mut().unwrap().push(inner);
        let first = NotebookItem::new(ItemKind::Page, "first");
        let first_id = first.id();
        notebook.children_mut().unwrap().push(first);
        notebook.children_mut().unwrap().push(section);
        let last = NotebookItem::new(ItemKind::Page, "last");
        let last_id = last.id();
        notebook.children_mut().unwrap().push(last);

        let order: Vec<ItemId> = notebook.pages().iter().map(|p| p.id()).collect();
        assert_eq!(order, vec![first_id, inner_id, last_id]);

        let page = NotebookItem::new(ItemKind::Page, "alone");
        assert!(page.pages().is_empty());
    }
}
