use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::types::{SongState, TextField};

pub type SharedState = Arc<StateStore>;

pub fn create_state() -> SharedState {
    Arc::new(StateStore::default())
}

/// Holder of the latest song fields.
///
/// Every mutation stamps `last_update` under the same lock that assigns the
/// field, and `snapshot` copies everything out under that lock, so readers
/// always observe the result of whole writes.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<SongState>,
}

impl StateStore {
    pub fn update_field(&self, field: TextField, value: String) {
        let mut guard = self.inner.lock();
        match field {
            TextField::TrackName => guard.track_name = Some(value),
            TextField::Artist => guard.artist = Some(value),
            TextField::Album => guard.album = Some(value),
        }
        stamp(&mut guard);
    }

    pub fn update_picture(&self, path: PathBuf) {
        let mut guard = self.inner.lock();
        guard.cover_art_path = Some(path);
        stamp(&mut guard);
    }

    pub fn snapshot(&self) -> SongState {
        self.inner.lock().clone()
    }
}

// Keeps `last_update` strictly increasing even if the wall clock stalls or steps back.
fn stamp(state: &mut SongState) {
    let now = SystemTime::now();
    let floor = state.last_update + Duration::from_nanos(1);
    state.last_update = if now > state.last_update { now } else { floor };
}
