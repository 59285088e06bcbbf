//! gridcrop-export: Pure output serializers (sans-IO)
//!
//! Converts processed images into encoded bytes. Currently supports PNG.

pub mod png;

pub use png::{ExportError, to_png};
