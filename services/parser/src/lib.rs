//! Parser - turns raw tables into the canonical agriculture and climate datasets
//!
//! Pipeline order: `classify` -> `reshape` / `narrow` (agriculture) or
//! `climate` (rainfall) -> `records` cleaning -> `dataset`.
//! `harmonize` drives the whole thing, including the remote fallback.

pub mod classify;
pub mod climate;
pub mod dataset;
pub mod harmonize;
pub mod narrow;
pub mod records;
pub mod reshape;

pub use classify::{classify, Shape};
pub use dataset::{AgricultureDataset, ClimateDataset, Datasets};
pub use harmonize::{HarmonizeReport, Harmonizer, SourceReport};
pub use records::{AgricultureRecord, ClimateRecord};
