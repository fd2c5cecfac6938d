//! CLI command implementations.

mod check;
mod doctor;
mod run;

pub use check::run_check;
pub use doctor::run_doctor;
pub use run::run_sources;
