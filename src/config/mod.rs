//! Configuration module for Synocast.
//!
//! Handles loading and validating the list of mirrored sources.

mod settings;

pub use settings::{
    Settings, SourceDescriptor, SourceKind, DEFAULT_MANIFEST_TIMEOUT_SECS,
    DEFAULT_MIN_DURATION_SECS,
};
