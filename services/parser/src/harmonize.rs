//! Harmonization Pipeline - builds the canonical datasets from every source
//!
//! Agriculture:
//! - load -> classify -> normalize each configured file
//! - fall back to remote resources when local rows are below the threshold
//! - clean the merged rows into `AgricultureRecord`s
//!
//! Climate:
//! - local file first; remote resources only when it yields nothing
//! - header substitution, then cleaning into `ClimateRecord`s
//!
//! Nothing here returns an error: a source that cannot be read contributes
//! no rows and the pipeline carries on.

use crate::classify::{classify, Shape};
use crate::climate::stage_climate;
use crate::dataset::{AgricultureDataset, ClimateDataset, Datasets};
use crate::narrow::map_narrow;
use crate::records::{AgricultureRecord, ClimateRecord, StagedClimateRow, StagedRow};
use crate::reshape::wide_to_long;
use collector::remote::DEFAULT_FETCH_LIMIT;
use collector::{load_or_empty, Cell, RawTable, RemoteSource, SourcesConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A configured path and the shape it was found to have
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    /// `None` when the file could not be loaded
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub file: SourceFile,
    pub staged_rows: usize,
}

/// What one pipeline run did, for operators
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarmonizeReport {
    pub sources: Vec<SourceReport>,
    pub local_rows: usize,
    pub remote_fallback: bool,
    pub remote_rows: usize,
    pub agriculture_staged: usize,
    pub agriculture_rows: usize,
    pub climate_from_remote: bool,
    pub climate_staged: usize,
    pub climate_rows: usize,
}

pub struct Harmonizer<'a> {
    sources: &'a SourcesConfig,
    remote: &'a dyn RemoteSource,
    fetch_limit: usize,
}

impl<'a> Harmonizer<'a> {
    pub fn new(sources: &'a SourcesConfig, remote: &'a dyn RemoteSource) -> Self {
        Self {
            sources,
            remote,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_fetch_limit(mut self, fetch_limit: usize) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    /// Build both datasets
    pub async fn build(&self) -> Datasets {
        self.run().await.0
    }

    /// Build both datasets and report what happened along the way
    pub async fn run(&self) -> (Datasets, HarmonizeReport) {
        let mut report = HarmonizeReport::default();

        info!("loading agriculture data");
        let agriculture = self.build_agriculture(&mut report).await;

        info!("loading climate data");
        let climate = self.build_climate(&mut report).await;

        (Datasets::new(agriculture, climate), report)
    }

    async fn build_agriculture(&self, report: &mut HarmonizeReport) -> AgricultureDataset {
        let mut staged: Vec<StagedRow> = Vec::new();

        for path in &self.sources.agriculture_paths {
            let (file, rows) = normalize_source(path);
            report.sources.push(SourceReport {
                file,
                staged_rows: rows.len(),
            });
            if !rows.is_empty() {
                info!(path = %path.display(), rows = rows.len(), "added source rows");
                staged.extend(rows);
            }
        }

        report.local_rows = staged.len();
        info!(rows = report.local_rows, "total rows from files");

        if report.local_rows < self.sources.min_local_rows {
            info!(
                rows = report.local_rows,
                threshold = self.sources.min_local_rows,
                "supplementing agriculture data from remote resources"
            );
            report.remote_fallback = true;

            for resource_id in &self.sources.agriculture_resource_ids {
                let table = self.remote.fetch(resource_id, self.fetch_limit).await;
                if table.is_empty() {
                    continue;
                }
                let rows = stage_verbatim(&table);
                info!(resource_id = %resource_id, rows = rows.len(), "added remote rows");
                report.remote_rows += rows.len();
                staged.extend(rows);
            }
        }

        report.agriculture_staged = staged.len();
        let records = clean_agriculture(&staged);
        report.agriculture_rows = records.len();

        let dataset = AgricultureDataset::new(records);
        info!(
            rows = dataset.len(),
            removed = staged.len() - dataset.len(),
            states = dataset.states().len(),
            crops = dataset.crops().len(),
            years = ?dataset.year_range(),
            "agriculture data cleaned"
        );
        if dataset.is_empty() {
            warn!("no valid agriculture data after cleaning");
        }
        dataset
    }

    async fn build_climate(&self, report: &mut HarmonizeReport) -> ClimateDataset {
        let mut tables: Vec<RawTable> = Vec::new();

        if let Some(path) = &self.sources.climate_path {
            let local = load_or_empty(path);
            if !local.is_empty() {
                info!(path = %path.display(), rows = local.len(), "local climate file added");
                tables.push(local);
            }
        }

        if tables.is_empty() {
            info!("local climate data not available, trying remote resources");
            report.climate_from_remote = true;
            for resource_id in &self.sources.climate_resource_ids {
                let table = self.remote.fetch(resource_id, self.fetch_limit).await;
                if !table.is_empty() {
                    tables.push(table);
                }
            }
        }

        let staged: Vec<StagedClimateRow> = tables.iter().flat_map(stage_climate).collect();
        report.climate_staged = staged.len();

        let records = clean_climate(&staged);
        report.climate_rows = records.len();

        let dataset = ClimateDataset::new(records);
        info!(
            rows = dataset.len(),
            removed = staged.len() - dataset.len(),
            states = dataset.states().len(),
            years = ?dataset.year_range(),
            "climate data cleaned"
        );
        if dataset.is_empty() {
            warn!("no valid climate data after cleaning");
        }
        dataset
    }
}

impl Datasets {
    /// Run the full pipeline. Calling it again on unchanged sources is how
    /// the datasets are rebuilt.
    pub async fn build(sources: &SourcesConfig, remote: &dyn RemoteSource, fetch_limit: usize) -> Datasets {
        Harmonizer::new(sources, remote)
            .with_fetch_limit(fetch_limit)
            .build()
            .await
    }
}

/// Load, classify and normalize one agriculture file
pub fn normalize_source(path: &Path) -> (SourceFile, Vec<StagedRow>) {
    let table = load_or_empty(path);
    if table.is_empty() {
        return (
            SourceFile {
                path: path.to_path_buf(),
                shape: None,
            },
            Vec::new(),
        );
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let shape = classify(&table);
    info!(filename = %filename, %shape, "detected file type");

    let rows = match shape {
        Shape::WideYearIndexed => wide_to_long(&table, &filename),
        Shape::NarrowCropIndexed => map_narrow(&table, &filename),
        Shape::Unrecognized => {
            warn!(filename = %filename, "unknown file format, attempting narrow mapping");
            map_narrow(&table, &filename)
        }
    };

    (
        SourceFile {
            path: path.to_path_buf(),
            shape: Some(shape),
        },
        rows,
    )
}

/// Remote rows are taken as-is: columns named like the canonical ones
/// (ignoring case) are used, everything else is left undefined.
pub fn stage_verbatim(table: &RawTable) -> Vec<StagedRow> {
    let find = |name: &str| {
        table
            .headers()
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let state = find("State_Name");
    let crop = find("Crop_Name");
    let production = find("Production");
    let year = find("Year");

    let pick = |row: &[Cell], col: Option<usize>| col.map(|c| row[c].clone()).unwrap_or(Cell::Empty);

    table
        .rows()
        .iter()
        .map(|row| StagedRow {
            state: pick(row, state),
            crop: pick(row, crop),
            production: pick(row, production),
            year: pick(row, year),
            source_file: None,
        })
        .collect()
}

pub fn clean_agriculture(rows: &[StagedRow]) -> Vec<AgricultureRecord> {
    rows.iter().filter_map(AgricultureRecord::from_staged).collect()
}

pub fn clean_climate(rows: &[StagedClimateRow]) -> Vec<ClimateRecord> {
    rows.iter().filter_map(ClimateRecord::from_staged).collect()
}
