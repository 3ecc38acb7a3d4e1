//! State management module
//!
//! This module handles all application state, including:
//! - Shared data structures (data.rs)
//! - The rating sidecar and its lookup rules (ratings.rs)
//! - Debounced rating writes (autosave.rs)
//! - Focus, multi-select and navigation (selection.rs)
//! - The per-folder session tying everything together (session.rs)
//! - Persisted user settings (settings.rs)
//! - The project/folder catalog database (library.rs)
//! - Viewer zoom and drag panning (zoom.rs)

pub mod autosave;
pub mod data;
pub mod library;
pub mod ratings;
pub mod selection;
pub mod session;
pub mod settings;
pub mod zoom;
