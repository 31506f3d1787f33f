//! What a display should show for a given state snapshot.
//!
//! Rendering lives outside this crate; this only applies the freshness policy
//! and the cover-art fallback so every front end agrees on them.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::cover_art::most_recent;
use crate::types::SongState;

pub const PLACEHOLDER: &str = "—";
pub const IDLE_TITLE: &str = "Connect to Play Music";
pub const IDLE_SUBTITLE: &str = "Open AirPlay on your device and select 'Receiver'";

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub freshness: Duration,
    pub cover_art_dir: PathBuf,
    pub idle_artwork: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlayingView {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_art: Option<PathBuf>,
    pub idle: bool,
}

impl NowPlayingView {
    pub fn resolve(snapshot: &SongState, now: SystemTime, options: &ViewOptions) -> Self {
        if snapshot.age(now) > options.freshness {
            return Self {
                title: IDLE_TITLE.to_string(),
                artist: IDLE_SUBTITLE.to_string(),
                album: PLACEHOLDER.to_string(),
                cover_art: options.idle_artwork.clone(),
                idle: true,
            };
        }

        let cover_art = snapshot
            .cover_art_path
            .clone()
            .filter(|path| path.exists())
            .or_else(|| most_recent(&options.cover_art_dir));

        Self {
            title: or_placeholder(&snapshot.track_name),
            artist: or_placeholder(&snapshot.artist),
            album: or_placeholder(&snapshot.album),
            cover_art,
            idle: false,
        }
    }
}

fn or_placeholder(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &std::path::Path) -> ViewOptions {
        ViewOptions {
            freshness: Duration::from_secs(5),
            cover_art_dir: dir.to_path_buf(),
            idle_artwork: Some(PathBuf::from("/opt/logo.png")),
        }
    }

    #[test]
    fn stale_state_is_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let view = NowPlayingView::resolve(&SongState::default(), SystemTime::now(), &options(tmp.path()));

        assert!(view.idle);
        assert_eq!(view.title, IDLE_TITLE);
        assert_eq!(view.cover_art, Some(PathBuf::from("/opt/logo.png")));
    }

    #[test]
    fn fresh_state_shows_fields_with_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let snapshot = SongState {
            track_name: Some("Hello".to_string()),
            artist: Some(String::new()),
            last_update: now - Duration::from_secs(1),
            ..SongState::default()
        };

        let view = NowPlayingView::resolve(&snapshot, now, &options(tmp.path()));

        assert!(!view.idle);
        assert_eq!(view.title, "Hello");
        assert_eq!(view.artist, PLACEHOLDER);
        assert_eq!(view.album, PLACEHOLDER);
        assert_eq!(view.cover_art, None);
    }

    #[test]
    fn missing_picture_falls_back_to_most_recent_cover() {
        let tmp = tempfile::tempdir().unwrap();
        let cached = tmp.path().join("cover_art_1.jpg");
        std::fs::write(&cached, b"jpeg").unwrap();
        let now = SystemTime::now();
        let snapshot = SongState {
            cover_art_path: Some(tmp.path().join("deleted.png")),
            last_update: now,
            ..SongState::default()
        };

        let view = NowPlayingView::resolve(&snapshot, now, &options(tmp.path()));
        assert_eq!(view.cover_art, Some(cached));
    }
}
