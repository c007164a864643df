use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// User preferences persisted between runs. Field names on disk are
/// camelCase to stay compatible with files written by earlier releases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Where the notebook save file lives; `None` until first resolved
    /// against the platform data directory.
    #[serde(default)]
    pub save_file_path: Option<PathBuf>,
    #[serde(default)]
    pub theme: u32,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,
    #[serde(default)]
    pub default_maximized: bool,
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u32,
    #[serde(default = "default_true")]
    pub show_menu_bar: bool,
    #[serde(default = "default_last_used_version")]
    pub last_used_version: String,
}

fn default_accent_color() -> String {
    "#FF7A27".to_string()
}

fn default_zoom() -> f64 {
    1.0
}

fn default_tab_size() -> u32 {
    4
}

fn default_sidebar_width() -> u32 {
    275
}

fn default_true() -> bool {
    true
}

fn default_last_used_version() -> String {
    "0.0.0".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            save_file_path: None,
            theme: 0,
            accent_color: default_accent_color(),
            default_zoom: default_zoom(),
            default_maximized: false,
            tab_size: default_tab_size(),
            sidebar_width: default_sidebar_width(),
            show_menu_bar: true,
            last_used_version: default_last_used_version(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if !self.default_zoom.is_finite() {
            self.default_zoom = default_zoom();
        }
        self.default_zoom = self.default_zoom.clamp(0.5, 3.0);
        if self.tab_size == 0 {
            self.tab_size = default_tab_size();
        }
        self.tab_size = self.tab_size.clamp(1, 16);
        self.sidebar_width = self.sidebar_width.clamp(120, 1000);
        if self.accent_color.trim().is_empty() {
            self.accent_color = default_accent_color();
        }
        if self.last_used_version.trim().is_empty() {
            self.last_used_version = default_last_used_version();
        }
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    /// Loads preferences from `path`, falling back to defaults when the
    /// file does not exist. A pre-2.0 file that still carries the old
    /// `dataDir` key gets its save-file path derived from that directory
    /// and is rewritten in the current shape right away.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        let legacy_data_dir = value
            .get("dataDir")
            .and_then(|v| v.as_str())
            .map(PathBuf::from);
        let mut data: Preferences =
            serde_json::from_value(value).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();

        let mut store = Self { path, data };
        if let Some(data_dir) = legacy_data_dir {
            if store.data.save_file_path.is_none() {
                store.data.save_file_path = Some(data_dir.join("save.json"));
            }
            // drop the legacy key from disk
            store.save()?;
        }
        Ok(store)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
