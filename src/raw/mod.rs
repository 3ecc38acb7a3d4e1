//! Image decoding module
//!
//! This module handles:
//! - Extracting embedded JPEG previews from RAW files (preview.rs)
//! - Producing displayable buffers for any supported file (loader.rs)
//! - Rendering and caching grid thumbnails (thumbnail.rs)
//! - Scheduling thumbnail generation with bounded concurrency (pipeline.rs)

pub mod loader;
pub mod pipeline;
pub mod preview;
pub mod thumbnail;
