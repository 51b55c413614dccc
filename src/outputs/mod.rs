//! Output writers.
//!
//! - [`json`]: writes the [`IngestResult`](crate::models::IngestResult)
//!   snapshot consumed by the dashboard
//!
//! # Output Structure
//!
//! ```text
//! data/
//! └── latest.json   # overwritten on every snapshot run
//! ```

pub mod json;
