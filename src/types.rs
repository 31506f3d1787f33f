use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The "now playing" fields the pipeline tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TrackName,
    /// Carried under the protocol's "comment" code
    Artist,
    Album,
    Picture,
}

impl Field {
    /// The text slot this field writes, or `None` for the picture payload
    pub fn text_field(self) -> Option<TextField> {
        match self {
            Field::TrackName => Some(TextField::TrackName),
            Field::Artist => Some(TextField::Artist),
            Field::Album => Some(TextField::Album),
            Field::Picture => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    TrackName,
    Artist,
    Album,
}

/// One decoded `<item>` from the metadata stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub code: String,
    pub length: u64,
    pub payload_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongState {
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_art_path: Option<PathBuf>,
    pub last_update: SystemTime,
}

impl SongState {
    /// Milliseconds since the epoch of the last successful update (0 before any)
    pub fn last_update_millis(&self) -> u128 {
        self.last_update
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    /// Time elapsed since the last update, saturating at zero for clocks that went backwards
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_update).unwrap_or(Duration::ZERO)
    }
}

impl Default for SongState {
    fn default() -> Self {
        Self {
            track_name: None,
            artist: None,
            album: None,
            cover_art_path: None,
            last_update: UNIX_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_empty() {
        let state = SongState::default();
        assert!(state.track_name.is_none());
        assert!(state.cover_art_path.is_none());
        assert_eq!(state.last_update_millis(), 0);
    }

    #[test]
    fn only_picture_has_no_text_slot() {
        assert_eq!(Field::Artist.text_field(), Some(TextField::Artist));
        assert_eq!(Field::Picture.text_field(), None);
    }

    #[test]
    fn age_saturates_for_future_timestamps() {
        let state = SongState {
            last_update: SystemTime::now() + Duration::from_secs(60),
            ..SongState::default()
        };
        assert_eq!(state.age(SystemTime::now()), Duration::ZERO);
    }
}
