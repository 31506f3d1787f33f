//! Now-playing metadata from an AirPlay receiver's metadata pipe.
//!
//! A background [`MetadataReader`] keeps the pipe attached, splits it into
//! `<item>` frames, and writes track title, artist, album and cover art into a
//! [`StateStore`]. Display code only ever calls [`StateStore::snapshot`] and
//! [`most_recent`].

pub mod cancel;
pub mod config;
pub mod cover_art;
pub mod error;
pub mod fields;
pub mod frame;
pub mod payload;
pub mod pipeline;
pub mod reader;
pub mod source;
pub mod state;
pub mod tokenizer;
pub mod types;
pub mod view;

pub use cancel::CancelToken;
pub use config::Config;
pub use cover_art::{most_recent, CoverArtStore};
pub use error::{Error, Result};
pub use fields::FieldTable;
pub use payload::PayloadProcessor;
pub use pipeline::MetadataPipeline;
pub use reader::{MetadataReader, ReaderTiming};
pub use source::{PathSource, StreamSource};
pub use state::{create_state, SharedState, StateStore};
pub use types::{Field, MetadataItem, SongState, TextField};
pub use view::{NowPlayingView, ViewOptions};
