use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

pub const COVER_ART_PREFIX: &str = "cover_art_";

/// Extensions `most_recent` considers to be cover art
pub const RECOGNISED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Writes decoded artwork into the cache directory. Files are only ever added.
#[derive(Debug, Clone)]
pub struct CoverArtStore {
    dir: PathBuf,
}

impl CoverArtStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))
    }

    /// Persist `bytes` as `cover_art_<epoch-millis>.<extension>`.
    ///
    /// If that name is taken (two images in one millisecond) the timestamp is
    /// bumped until a free name is found; existing files are never touched.
    pub fn save(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let mut millis = epoch_millis();
        loop {
            let path = self
                .dir
                .join(format!("{COVER_ART_PREFIX}{millis}.{extension}"));

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    millis += 1;
                    continue;
                }
                Err(e) => return Err(Error::io(path, e)),
            };

            if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
                // Only the half-written file we just created
                let _ = fs::remove_file(&path);
                return Err(Error::io(path, e));
            }

            log::debug!("Saved {} bytes of cover art to {:?}", bytes.len(), path);
            return Ok(path);
        }
    }

    pub fn most_recent(&self) -> Option<PathBuf> {
        most_recent(&self.dir)
    }
}

/// The recognised image in `dir` with the newest modification time
pub fn most_recent(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::trace!("Cannot scan cover art directory {:?}: {}", dir, e);
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| has_recognised_extension(path))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

fn has_recognised_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            RECOGNISED_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
