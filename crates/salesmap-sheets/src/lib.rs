//! Record sources for sales-location rows.
//!
//! Every source implements [`RecordSource`]: fetch the whole sheet (header
//! row first) or append one validated record. [`SheetsClient`] talks to the
//! Google Sheets v4 values API, [`FileSource`] reads and appends a local CSV
//! file, and [`MemorySource`] keeps rows in process.

pub mod client;
pub mod error;
pub mod file;
pub mod memory;
pub mod source;
pub mod types;

pub use client::SheetsClient;
pub use error::SourceError;
pub use file::FileSource;
pub use memory::MemorySource;
pub use source::{build_source, RecordSource};
