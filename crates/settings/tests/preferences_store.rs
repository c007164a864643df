use markbook_settings::{Preferences, PreferencesStore};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("prefs.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    assert!(store.preferences().save_file_path.is_none());
    assert_eq!(store.preferences().accent_color, "#FF7A27");
    assert_eq!(store.preferences().default_zoom, 1.0);
    assert_eq!(store.preferences().tab_size, 4);
    assert_eq!(store.preferences().sidebar_width, 275);
    assert!(store.preferences().show_menu_bar);
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("prefs.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .update(|prefs| {
            prefs.save_file_path = Some(PathBuf::from("/data/save.json"));
            prefs.theme = 1;
            prefs.default_zoom = 1.25;
            prefs.show_menu_bar = false;
        })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    assert_eq!(
        reloaded.preferences().save_file_path,
        Some(PathBuf::from("/data/save.json"))
    );
    assert_eq!(reloaded.preferences().theme, 1);
    assert_eq!(reloaded.preferences().default_zoom, 1.25);
    assert!(!reloaded.preferences().show_menu_bar);
}

#[test]
fn overwrite_sanitizes_out_of_range_values() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("prefs.json");

    let mut store = PreferencesStore::load(&path).expect("default");
    let mut prefs = store.preferences().clone();
    prefs.default_zoom = 80.0;
    prefs.tab_size = 0;
    prefs.accent_color = String::new();

    store.overwrite(prefs).expect("overwrite");

    let current = store.preferences();
    assert_eq!(current.default_zoom, 3.0);
    assert_eq!(current.tab_size, 4);
    assert_eq!(current.accent_color, "#FF7A27");
}

#[test]
fn legacy_data_dir_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("prefs.json");
    fs::write(
        &path,
        r#"{ "dataDir": "/home/user/notes", "theme": 1 }"#,
    )
    .expect("write legacy prefs");

    let store = PreferencesStore::load(&path).expect("load legacy");
    assert_eq!(
        store.preferences().save_file_path,
        Some(PathBuf::from("/home/user/notes/save.json"))
    );
    assert_eq!(store.preferences().theme, 1);

    // the upgraded file no longer mentions the old key
    let rewritten = fs::read_to_string(&path).expect("reread");
    assert!(!rewritten.contains("dataDir"));
    assert!(rewritten.contains("saveFilePath"));
}

#[test]
fn unknown_fields_are_ignored() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("prefs.json");
    fs::write(
        &path,
        r#"{ "theme": 2, "somethingFromTheFuture": true }"#,
    )
    .expect("write prefs");

    let store = PreferencesStore::load(&path).expect("load");
    assert_eq!(store.preferences().theme, 2);
}
