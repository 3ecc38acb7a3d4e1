//! Core of the RAW culler: folder scanning, image loading, the thumbnail
//! pipeline, score persistence and selection state. The iced shell in
//! `main.rs` is a thin layer over [`Session`].

pub mod error;
pub mod logging;
pub mod raw;
pub mod scan;
pub mod shell;
pub mod state;

pub use raw::{loader, pipeline, preview, thumbnail};
pub use state::{autosave, data, library, ratings, selection, session, settings, zoom};

pub use raw::loader::ImageLoader;
pub use state::data::{Identity, ImageRecord, Score};
pub use state::session::Session;
