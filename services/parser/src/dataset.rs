//! The two canonical datasets and the read-only views the query engine needs

use crate::records::{AgricultureRecord, ClimateRecord, MIN_YEAR};
use chrono::Datelike;
use std::collections::BTreeSet;

/// Latest year reported when no agriculture data qualifies
pub const DEFAULT_LATEST_YEAR: i32 = 2020;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgricultureDataset {
    records: Vec<AgricultureRecord>,
}

impl AgricultureDataset {
    pub fn new(records: Vec<AgricultureRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AgricultureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn states(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.state_name.as_str()).collect()
    }

    pub fn crops(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.crop_name.as_str()).collect()
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        year_range(self.records.iter().map(|r| r.year))
    }

    /// Rows whose state and crop contain the given fragments
    pub fn matching<'a>(
        &'a self,
        state: Option<&'a str>,
        crop: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AgricultureRecord> + 'a {
        self.records.iter().filter(move |r| {
            state.map_or(true, |s| r.state_name.contains(s))
                && crop.map_or(true, |c| r.crop_name.contains(c))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateDataset {
    records: Vec<ClimateRecord>,
}

impl ClimateDataset {
    pub fn new(records: Vec<ClimateRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ClimateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn states(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.state_name.as_str()).collect()
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        year_range(self.records.iter().map(|r| r.year))
    }

    /// Rows whose state contains the given fragment
    pub fn for_state<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a ClimateRecord> + 'a {
        self.records.iter().filter(move |r| r.state_name.contains(state))
    }
}

fn year_range(years: impl Iterator<Item = i32>) -> Option<(i32, i32)> {
    years.fold(None, |acc, y| match acc {
        None => Some((y, y)),
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
    })
}

/// Both canonical datasets, built once and never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub agriculture: AgricultureDataset,
    pub climate: ClimateDataset,
    latest_year: i32,
}

impl Datasets {
    pub fn new(agriculture: AgricultureDataset, climate: ClimateDataset) -> Self {
        let current_year = chrono::Utc::now().year();
        let latest_year = latest_year(&agriculture, current_year);
        Self {
            agriculture,
            climate,
            latest_year,
        }
    }

    /// Most recent agriculture year not in the future
    pub fn latest_year(&self) -> i32 {
        self.latest_year
    }

    /// True when neither dataset holds a single row
    pub fn is_empty(&self) -> bool {
        self.agriculture.is_empty() && self.climate.is_empty()
    }
}

impl Default for Datasets {
    fn default() -> Self {
        Self::new(AgricultureDataset::default(), ClimateDataset::default())
    }
}

/// Max year in (1900, current_year], or the default when nothing qualifies
pub fn latest_year(agriculture: &AgricultureDataset, current_year: i32) -> i32 {
    agriculture
        .records()
        .iter()
        .map(|r| r.year)
        .filter(|y| *y > MIN_YEAR && *y <= current_year)
        .max()
        .unwrap_or(DEFAULT_LATEST_YEAR)
}
