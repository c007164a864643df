//! One-time conversion of pre-2.0 save files.
//!
//! The old format had no `version` tag and no sections: a flat list of
//! notebooks, each holding pages under `pages`, with `title` instead of
//! `name` and page-level `fileName` references. Knowledge of that shape
//! lives here and nowhere else.
//! 2.0 之前存檔的一次性轉換。舊格式沒有 `version` 標籤與分區，僅有
//! 平面的筆記本與頁面，欄位名稱亦不同。舊格式的知識只存在於本模組。

use serde::Deserialize;

use crate::item::{ItemKind, NotebookItem};
use crate::save::{Save, SaveDataError};

#[derive(Debug, Deserialize)]
struct LegacySave {
    notebooks: Vec<LegacyNotebook>,
}

#[derive(Debug, Deserialize)]
struct LegacyNotebook {
    name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    expanded: bool,
    #[serde(default)]
    pages: Vec<LegacyPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPage {
    title: String,
    file_name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    favorite: bool,
}

/// Converts a parsed legacy document into a current-format [`Save`]. Every
/// node gets a fresh id, but pages keep their existing `fileName` so the
/// document payloads already on disk stay reachable.
/// 將舊格式文件轉換為目前格式的 [`Save`]。每個節點取得新識別碼，但頁面
/// 沿用原本的 `fileName`，既有的文件內容因此仍可讀取。
pub(crate) fn migrate(value: serde_json::Value) -> Result<Save, SaveDataError> {
    let legacy: LegacySave =
        serde_json::from_value(value).map_err(|err| SaveDataError::Migration(err.to_string()))?;

    let mut save = Save::new();
    for old in legacy.notebooks {
        let mut notebook = NotebookItem::new(ItemKind::Notebook, old.name);
        if let Some(color) = old.color {
            notebook.color = color;
        }
        if let Some(icon) = old.icon {
            notebook.icon = icon;
        }
        notebook.expanded = old.expanded;

        for old_page in old.pages {
            let mut page = NotebookItem::new(ItemKind::Page, old_page.title);
            page.file_name = Some(old_page.file_name);
            if let Some(color) = old_page.color {
                page.color = color;
            }
            if let Some(icon) = old_page.icon {
                page.icon = icon;
            }
            page.favorite = old_page.favorite;
            notebook.children.get_or_insert_with(Vec::new).push(page);
        }
        save.notebooks.push(notebook);
    }
    Ok(save)
}
