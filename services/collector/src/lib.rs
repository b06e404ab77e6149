//! Collector - everything that gets raw tables into memory
//!
//! - `table`: the untyped `RawTable` / `Cell` model
//! - `local`: CSV and XLS/XLSX files on disk
//! - `remote`: Open Government Data API resources
//! - `sources`: which files and resources to read

pub mod local;
pub mod remote;
pub mod sources;
pub mod table;

pub use local::{load_local_file, load_or_empty, LoadError};
pub use remote::{FetchError, OgdClient, OgdConfig, RemoteSource};
pub use sources::SourcesConfig;
pub use table::{Cell, RawTable};
