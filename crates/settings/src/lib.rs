//! User preferences for Markbook.

pub mod preferences;

pub use preferences::{Preferences, PreferencesError, PreferencesStore};
