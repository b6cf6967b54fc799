//! Named configuration presets.
//!
//! A [`PresetLibrary`] is a catalog of named [`TreeOptions`], loaded once
//! and cached for its lifetime.  [`PresetLibrary::load`] hands out
//! independent clones, never references — two trees configured from the same
//! preset share no level-indexed arrays.
//!
//! # Fallback policy
//! Asking for an *unknown* name returns `TreeOptions::default()` — a usable
//! tree, not an error — because a missing preset should cost one generic
//! tree, not a whole forest.  An *unreadable or unparsable preset file*
//! during [`from_dir`](PresetLibrary::from_dir) enumeration is logged with
//! `warn!` and skipped; only a failure to read the directory itself is an
//! error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bevy::log::warn;

use crate::options::TreeOptions;

/// Presets compiled into the crate, keyed by display name.
const BUILTIN: &[(&str, &str)] = &[
    ("Ash Small", include_str!("../presets/ash_small.json")),
    ("Aspen Medium", include_str!("../presets/aspen_medium.json")),
    ("Bush 1", include_str!("../presets/bush_1.json")),
    ("Oak Large", include_str!("../presets/oak_large.json")),
    ("Oak Medium", include_str!("../presets/oak_medium.json")),
    ("Pine Large", include_str!("../presets/pine_large.json")),
];

/// Failure to load a preset catalog.
#[derive(Debug)]
pub enum PresetError {
    /// The preset directory could not be enumerated.
    Io { path: PathBuf, source: std::io::Error },
    /// A compiled-in preset document failed to parse.
    Parse { name: String, source: serde_json::Error },
}

impl std::fmt::Display for PresetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetError::Io { path, .. } => {
                write!(f, "cannot read preset directory {}", path.display())
            }
            PresetError::Parse { name, .. } => write!(f, "preset {name:?} is malformed"),
        }
    }
}

impl std::error::Error for PresetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PresetError::Io { source, .. } => Some(source),
            PresetError::Parse { source, .. } => Some(source),
        }
    }
}

/// A loaded, cached catalog of named tree configurations.
#[derive(Clone, Debug, Default)]
pub struct PresetLibrary {
    presets: BTreeMap<String, TreeOptions>,
}

impl PresetLibrary {
    /// The compiled-in catalog.
    ///
    /// These documents ship inside the crate, so a parse failure means the
    /// crate itself is broken — it is still surfaced as a [`PresetError`]
    /// rather than a panic, and the test suite pins every entry.
    pub fn builtin() -> Result<Self, PresetError> {
        let mut presets = BTreeMap::new();
        for (name, json) in BUILTIN {
            let options: TreeOptions =
                serde_json::from_str(json).map_err(|source| PresetError::Parse {
                    name: (*name).to_string(),
                    source,
                })?;
            presets.insert((*name).to_string(), options);
        }
        Ok(Self { presets })
    }

    /// Load every `*.json` document in `dir`.
    ///
    /// Preset names are derived from file stems: `oak_medium.json` becomes
    /// `"Oak Medium"`.  Unreadable or malformed files are logged and
    /// skipped; the rest of the catalog still loads.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, PresetError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| PresetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut presets = BTreeMap::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("skipping unreadable preset {}: {e}", path.display());
                    continue;
                }
            };
            match serde_json::from_str::<TreeOptions>(&text) {
                Ok(options) => {
                    let name = display_name(&path);
                    presets.insert(name, options);
                }
                Err(e) => {
                    warn!("skipping malformed preset {}: {e}", path.display());
                }
            }
        }
        Ok(Self { presets })
    }

    /// Independent copy of the named preset, or a default configuration for
    /// an unknown name.
    pub fn load(&self, name: &str) -> TreeOptions {
        self.presets.get(name).cloned().unwrap_or_default()
    }

    /// Exact lookup without the default fallback.
    pub fn get(&self, name: &str) -> Option<&TreeOptions> {
        self.presets.get(name)
    }

    /// All preset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// `oak_medium.json` → `Oak Medium`.
fn display_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("preset");
    stem.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
