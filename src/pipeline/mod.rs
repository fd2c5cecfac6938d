//! Selection and retention building blocks.
//!
//! Everything here is independent of the video host: stream ranking,
//! duration gating and file naming are pure, and retention only touches
//! the directory it is given.

mod duration;
mod naming;
mod retention;
mod selector;

pub use duration::{check_duration, DurationVerdict};
pub use naming::{sanitize_file_name, target_path, INVALID_FILE_NAME_CHARS, REPLACEMENT_CHAR};
pub use retention::{
    enforce_retention, plan_retention, RetentionFailure, RetentionReport, PARTIAL_SUFFIX,
};
pub use selector::{select_stream, NoStreamReason, SelectedStream, Selection};
