//! On-disk layout of a tracked zone and its `config.json`.
//!
//! ```text
//! <zone>/config.json
//! <zone>/original/*.png
//! <zone>/masks/<year>_mask.png
//! <zone>/overlays/<year>_overlay.png
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::area::BoundingBox;
use crate::errors::{GlacierSegError, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const ORIGINAL_DIR: &str = "original";
pub const MASKS_DIR: &str = "masks";
pub const OVERLAYS_DIR: &str = "overlays";

/// Contents of `config.json`.
///
/// Keys this crate does not know about are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    pub bbox: BoundingBox,
    pub years: Vec<i32>,
    #[serde(default)]
    pub area_by_year: BTreeMap<i32, f64>,
    #[serde(default)]
    pub filenames: BTreeMap<i32, String>,
    #[serde(default)]
    pub trend: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ZoneConfig {
    pub fn validate(&self) -> Result<()> {
        match self.bbox.check() {
            Some(reason) => Err(GlacierSegError::Validation {
                field: "bbox".to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Configured years without repeats, in first-seen order.
    pub fn tracked_years(&self) -> Vec<i32> {
        let mut seen = Vec::with_capacity(self.years.len());
        for &year in &self.years {
            if !seen.contains(&year) {
                seen.push(year);
            }
        }
        seen
    }
}

/// A zone directory.
#[derive(Debug, Clone)]
pub struct Zone {
    root: PathBuf,
}

impl Zone {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(GlacierSegError::FileSystem {
                path: root,
                operation: "zone directory lookup".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "zone directory does not exist",
                ),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.root.join(ORIGINAL_DIR)
    }

    pub fn masks_dir(&self) -> PathBuf {
        self.root.join(MASKS_DIR)
    }

    pub fn overlays_dir(&self) -> PathBuf {
        self.root.join(OVERLAYS_DIR)
    }

    pub fn mask_path(&self, year: i32) -> PathBuf {
        self.masks_dir().join(format!("{year}_mask.png"))
    }

    pub fn overlay_path(&self, year: i32) -> PathBuf {
        self.overlays_dir().join(format!("{year}_overlay.png"))
    }

    pub fn ensure_output_dirs(&self) -> Result<()> {
        for dir in [self.masks_dir(), self.overlays_dir()] {
            fs::create_dir_all(&dir).map_err(|e| GlacierSegError::FileSystem {
                path: dir.clone(),
                operation: "output directory creation".to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// PNG files directly under `original/`, sorted by file name.
    pub fn list_originals(&self) -> Result<Vec<PathBuf>> {
        let dir = self.originals_dir();
        let mut files = Vec::new();

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| GlacierSegError::FileSystem {
                path: dir.clone(),
                operation: "source image listing".to_string(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && is_png(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    pub fn load_config(&self) -> Result<ZoneConfig> {
        let path = self.config_path();
        let text = fs::read_to_string(&path).map_err(|e| GlacierSegError::FileSystem {
            path: path.clone(),
            operation: "configuration read".to_string(),
            source: e,
        })?;
        let config: ZoneConfig = serde_json::from_str(&text)
            .map_err(|source| GlacierSegError::ConfigFormat {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Replace `config.json` atomically: write a sibling temp file, then rename over it.
    pub fn save_config(&self, config: &ZoneConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(config).map_err(|source| {
            GlacierSegError::ConfigFormat {
                path: path.clone(),
                source,
            }
        })?;

        let fs_error = |operation: &str, source: std::io::Error| GlacierSegError::FileSystem {
            path: path.clone(),
            operation: operation.to_string(),
            source,
        };

        let mut file =
            NamedTempFile::new_in(&self.root).map_err(|e| fs_error("temp file creation", e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| fs_error("configuration write", e))?;
        file.persist(&path)
            .map_err(|e| fs_error("configuration replace", e.error))?;
        Ok(())
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// First file whose name contains `year` as a substring.
///
/// `files` is expected in listing order; when several names match, the earliest wins.
pub fn find_image_for_year(files: &[PathBuf], year: i32) -> Option<&PathBuf> {
    let needle = year.to_string();
    files.iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(&needle))
    })
}
