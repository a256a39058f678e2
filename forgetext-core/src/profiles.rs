//! Processing Profiles - named, versioned processing contracts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::presets::Mode;
use crate::validation::{Format, DEFAULT_MAX_FILE_SIZE_MB};

pub type ProfileId = String;

pub const BUILTIN_PROFILE_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Could not read profiles from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub profile_version: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub superseded_by: Option<String>,
    pub format: Format,
    pub mode: Mode,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_engine_min_version() -> String {
    "1.0.0".to_string()
}

fn default_max_file_size_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

impl Profile {
    /// The stock `<format>-<mode>` profile.
    pub fn builtin(format: Format, mode: Mode) -> Self {
        let verb = match mode {
            Mode::Minify => "Minify",
            Mode::Format => "Format",
        };
        Self {
            id: format!("{}-{}", format, mode),
            name: format!("{} {}", format.as_str().to_uppercase(), verb),
            description: format!("Validate then {} {} input", mode, format),
            profile_version: BUILTIN_PROFILE_VERSION.to_string(),
            engine_min_version: default_engine_min_version(),
            deprecated: false,
            superseded_by: None,
            format,
            mode,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

/// Profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minify and format profiles for every supported format.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for format in Format::ALL {
            for mode in [Mode::Minify, Mode::Format] {
                registry.register(Profile::builtin(format, mode));
            }
        }
        registry
    }

    /// Builtins overlaid with every `*.json` profile in `dir`.
    ///
    /// A missing directory yields just the builtins. Files that fail to read
    /// or parse are skipped with a warning.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ProfileError> {
        let mut registry = Self::builtin();
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "profile directory missing, using builtins");
            return Ok(registry);
        }

        let io_err = |source| ProfileError::Io {
            path: dir.display().to_string(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<Profile>(&content).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(profile) => {
                    tracing::debug!(id = %profile.id, path = %path.display(), "loaded profile");
                    registry.register(profile);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable profile");
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// All profiles, ordered by id.
    pub fn list(&self) -> Vec<&Profile> {
        self.profiles.values().collect()
    }

    /// Insert or replace by id.
    pub fn register(&mut self, profile: Profile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
