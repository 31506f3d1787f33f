use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fields::FieldTable;
use crate::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::reader::ReaderTiming;
use crate::types::Field;
use crate::view::ViewOptions;

pub const CONFIG_ENV: &str = "CASSETTE_CONFIG";
pub const PIPE_ENV: &str = "CASSETTE_PIPE";
pub const COVER_DIR_ENV: &str = "CASSETTE_COVER_DIR";

pub const DEFAULT_PIPE_PATH: &str = "/tmp/shairport-sync-metadata";
pub const DEFAULT_COVER_ART_DIR: &str = "/tmp/shairport-sync/.cache/coverart";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pipe_path: PathBuf,
    pub cover_art_dir: PathBuf,
    /// Extra or overriding code -> field routes on top of the built-in four
    pub fields: HashMap<String, Field>,
    pub source_poll_ms: u64,
    pub idle_poll_ms: u64,
    pub error_backoff_ms: u64,
    pub max_frame_bytes: usize,
    /// Seconds without an update before the display goes idle
    pub freshness_secs: u64,
    pub refresh_ms: u64,
    pub idle_artwork: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipe_path: PathBuf::from(DEFAULT_PIPE_PATH),
            cover_art_dir: PathBuf::from(DEFAULT_COVER_ART_DIR),
            fields: HashMap::new(),
            source_poll_ms: 1000,
            idle_poll_ms: 100,
            error_backoff_ms: 1000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            freshness_secs: 5,
            refresh_ms: 1000,
            idle_artwork: None,
        }
    }
}

impl Config {
    /// Defaults, then the JSON file named by `CASSETTE_CONFIG`, then path overrides
    /// from `CASSETTE_PIPE` / `CASSETTE_COVER_DIR`.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var_os(key).map(PathBuf::from));
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(pipe) = lookup(PIPE_ENV) {
            log::info!("Using metadata pipe from {}: {:?}", PIPE_ENV, pipe);
            self.pipe_path = pipe;
        }
        if let Some(dir) = lookup(COVER_DIR_ENV) {
            log::info!("Using cover art directory from {}: {:?}", COVER_DIR_ENV, dir);
            self.cover_art_dir = dir;
        }
    }

    pub fn field_table(&self) -> FieldTable {
        let mut table = FieldTable::default();
        for (code, field) in &self.fields {
            if let Some(previous) = table.insert(code, *field) {
                log::info!("Code {} remapped from {:?} to {:?}", code, previous, field);
            }
        }
        table
    }

    pub fn reader_timing(&self) -> ReaderTiming {
        ReaderTiming {
            source_poll: Duration::from_millis(self.source_poll_ms),
            idle_poll: Duration::from_millis(self.idle_poll_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        // tokio intervals panic on a zero period
        Duration::from_millis(self.refresh_ms.max(1))
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            freshness: Duration::from_secs(self.freshness_secs),
            cover_art_dir: self.cover_art_dir.clone(),
            idle_artwork: self.idle_artwork.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_receiver_paths() {
        let config = Config::default();
        assert_eq!(config.pipe_path, PathBuf::from(DEFAULT_PIPE_PATH));
        assert_eq!(config.reader_timing(), ReaderTiming::default());
        assert_eq!(config.field_table().len(), 4);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pipe_path": "/run/metadata", "fields": {{"61736172": "artist"}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.pipe_path, PathBuf::from("/run/metadata"));
        assert_eq!(config.cover_art_dir, PathBuf::from(DEFAULT_COVER_ART_DIR));

        let table = config.field_table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.route("61736172"), Some(Field::Artist));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pipe": "/run/metadata"}}"#).unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn overrides_replace_paths() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            PIPE_ENV => Some(PathBuf::from("/tmp/other-pipe")),
            _ => None,
        });
        assert_eq!(config.pipe_path, PathBuf::from("/tmp/other-pipe"));
        assert_eq!(config.cover_art_dir, PathBuf::from(DEFAULT_COVER_ART_DIR));
    }
}
