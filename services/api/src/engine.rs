//! Query engine - the analytical answers behind every intent
//!
//! All functions read the shared, immutable datasets, filter by substring on
//! the extracted state/crop names and render a markdown answer with a fixed
//! citation. Production figures are shown in thousands of tonnes.

use crate::entities::{extract_years, EntityExtractor, NormalizedLevenshtein, Similarity};
use crate::router::{self, Intent, QuestionContext};
use parser::{AgricultureRecord, Datasets};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Pair compared when the question names fewer than two states
pub const DEFAULT_COMPARISON: (&str, &str) = ("MAHARASHTRA", "GUJARAT");
const DATA_URL: &str = "data.gov.in";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub name: &'static str,
    pub url: &'static str,
}

impl Source {
    const fn cite(name: &'static str) -> Self {
        Self { name, url: DATA_URL }
    }
}

pub const AGRICULTURE_AND_CLIMATE: Source = Source::cite("Agriculture & Climate Database");
pub const AGRICULTURE: Source = Source::cite("Agriculture Database");
pub const CROPS: Source = Source::cite("Crop Database");
pub const CLIMATE: Source = Source::cite("Climate Database");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl Answer {
    /// Answer without any citation
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            answer: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn cited(text: impl Into<String>, source: Source) -> Self {
        Self {
            answer: text.into(),
            sources: vec![source],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Highest,
    Lowest,
}

pub struct QueryEngine {
    datasets: Arc<Datasets>,
    extractor: EntityExtractor,
}

impl QueryEngine {
    pub fn new(datasets: Arc<Datasets>) -> Self {
        Self::with_similarity(datasets, Box::new(NormalizedLevenshtein))
    }

    pub fn with_similarity(datasets: Arc<Datasets>, similarity: Box<dyn Similarity>) -> Self {
        let extractor = EntityExtractor::new(&datasets, similarity);
        info!(states = extractor.state_vocabulary().len(), "entity vocabulary ready");
        Self {
            datasets,
            extractor,
        }
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn has_data(&self) -> bool {
        !self.datasets.is_empty()
    }

    /// Extract every entity the router may need
    pub fn context(&self, question: &str) -> QuestionContext {
        QuestionContext {
            question: question.to_string(),
            upper: question.to_uppercase(),
            states: self.extractor.extract_states(question),
            crops: self.extractor.extract_crops(question),
            years: extract_years(question),
        }
    }

    /// Route a question and build its answer
    pub fn ask(&self, question: &str) -> (Intent, Answer) {
        let ctx = self.context(question);
        debug!(
            question = %ctx.question,
            states = ?ctx.states,
            crops = ?ctx.crops,
            years = ?ctx.years,
            "extracted entities"
        );

        let route = router::route(&ctx);
        info!(intent = ?route.intent, "routed question");
        (route.intent, (route.answer)(self, &ctx))
    }

    pub fn compare_states(&self, state1: &str, state2: &str) -> Answer {
        let mut out = format!("## Comparison: {} vs {}\n\n", state1, state2);
        out.push_str(&format!("*(Data up to {})*\n\n", self.datasets.latest_year()));

        let climate = &self.datasets.climate;
        if !climate.is_empty() {
            let avg1 = mean(climate.for_state(state1).map(|r| r.rainfall));
            let avg2 = mean(climate.for_state(state2).map(|r| r.rainfall));

            if let (Some(avg1), Some(avg2)) = (avg1, avg2) {
                out.push_str("### 🌧️ Rainfall Comparison\n");
                out.push_str(&format!("- **{}**: {:.2} mm (average annual)\n", state1, avg1));
                out.push_str(&format!("- **{}**: {:.2} mm (average annual)\n", state2, avg2));
                out.push_str(&format!("- **Difference**: {:.2} mm\n\n", (avg1 - avg2).abs()));
            }
        }

        let agriculture = &self.datasets.agriculture;
        if !agriculture.is_empty() {
            for (i, state) in [state1, state2].into_iter().enumerate() {
                let totals = sum_by(agriculture.matching(Some(state), None), |r| &r.crop_name);
                if totals.is_empty() {
                    continue;
                }
                out.push_str(&format!("### 🌾 Top 5 Crops in {}\n", state));
                for (rank, (crop, production)) in largest(totals, 5).into_iter().enumerate() {
                    out.push_str(&format!("{}. **{}**: {}\n", rank + 1, crop, kilo_tonnes(production)));
                }
                if i == 0 {
                    out.push('\n');
                }
            }
        }

        Answer::cited(out, AGRICULTURE_AND_CLIMATE)
    }

    pub fn find_highest_lowest(&self, extreme: Extreme, crop: Option<&str>, state: Option<&str>) -> Answer {
        let agriculture = &self.datasets.agriculture;
        if agriculture.is_empty() {
            return Answer::plain("No agriculture data available.");
        }

        // first row wins ties
        let mut pick: Option<&AgricultureRecord> = None;
        for r in agriculture.matching(state, crop).filter(|r| r.production > 0.0) {
            let better = match (pick, extreme) {
                (None, _) => true,
                (Some(p), Extreme::Highest) => r.production > p.production,
                (Some(p), Extreme::Lowest) => r.production < p.production,
            };
            if better {
                pick = Some(r);
            }
        }

        let Some(r) = pick else {
            return Answer::plain("No matching data found.");
        };

        let mut out = match extreme {
            Extreme::Highest => String::from("## 🏆 Highest Production\n\n"),
            Extreme::Lowest => String::from("## 📉 Lowest Production\n\n"),
        };
        out.push_str(&format!("- **Crop**: {}\n", r.crop_name));
        out.push_str(&format!("- **State**: {}\n", r.state_name));
        out.push_str(&format!("- **Production**: {}\n", kilo_tonnes(r.production)));
        out.push_str(&format!("- **Year**: {}\n", r.year));

        Answer::cited(out, AGRICULTURE)
    }

    pub fn analyze_trend(&self, state: Option<&str>, crop: Option<&str>) -> Answer {
        let agriculture = &self.datasets.agriculture;
        if agriculture.is_empty() {
            return Answer::plain("No agriculture data available.");
        }

        let yearly = sum_by(agriculture.matching(state, crop), |r| r.year);
        let (Some((&first_year, &first)), Some((&last_year, &last))) =
            (yearly.first_key_value(), yearly.last_key_value())
        else {
            return Answer::plain("Insufficient data for trend analysis.");
        };
        if yearly.len() < 2 {
            return Answer::plain("Insufficient data for trend analysis.");
        }

        let mut out = String::from("## 📈 Trend Analysis\n\n");
        if let Some(state) = state {
            out.push_str(&format!("**State**: {}\n", state));
        }
        if let Some(crop) = crop {
            out.push_str(&format!("**Crop**: {}\n", crop));
        }
        out.push_str(&format!("**Period**: {} to {}\n", first_year, last_year));

        if first == 0.0 {
            out.push_str(&format!(
                "**Change**: cannot compute percent change, total production in {} is zero\n",
                first_year
            ));
        } else {
            let change = (last - first) / first * 100.0;
            out.push_str(&format!("**Change**: {:+.2}%\n", change));
            let direction = if change > 0.0 { "📈 Increasing" } else { "📉 Decreasing" };
            out.push_str(&format!("**Direction**: {}\n", direction));
        }

        Answer::cited(out, AGRICULTURE)
    }

    pub fn get_crop_info(&self, crop: &str, state: Option<&str>) -> Answer {
        let agriculture = &self.datasets.agriculture;
        if agriculture.is_empty() {
            return Answer::plain("No agriculture data available.");
        }

        let rows: Vec<&AgricultureRecord> = agriculture.matching(state, Some(crop)).collect();
        if rows.is_empty() {
            let mut msg = format!("No data found for {}", crop);
            if let Some(state) = state {
                msg.push_str(&format!(" in {}", state));
            }
            return Answer::plain(msg);
        }

        let mut out = format!("## 🌾 {} Statistics\n\n", crop);
        if let Some(state) = state {
            out.push_str(&format!("**State**: {}\n", state));
        }

        let total: f64 = rows.iter().map(|r| r.production).sum();
        let average = total / rows.len() as f64;
        out.push_str(&format!("- **Total Production**: {}\n", kilo_tonnes(total)));
        out.push_str(&format!("- **Average Production**: {}\n", kilo_tonnes(average)));

        if let Some((lo, hi)) = year_span(rows.iter().map(|r| r.year)) {
            out.push_str(&format!("- **Data Period**: {} - {}\n", lo, hi));
        }

        if state.is_none() {
            let by_state = sum_by(rows.iter().copied(), |r| &r.state_name);
            out.push_str("\n**Top 3 Producing States**:\n");
            for (rank, (name, production)) in largest(by_state, 3).into_iter().enumerate() {
                out.push_str(&format!("{}. {}: {}\n", rank + 1, name, kilo_tonnes(production)));
            }
        }

        Answer::cited(out, CROPS)
    }

    pub fn get_rainfall_info(&self, state: &str) -> Answer {
        let climate = &self.datasets.climate;
        if climate.is_empty() {
            return Answer::plain("No climate data available.");
        }

        let rows: Vec<_> = climate.for_state(state).collect();
        let Some(average) = mean(rows.iter().map(|r| r.rainfall)) else {
            return Answer::plain(format!("No rainfall data found for {}.", state));
        };
        let max = rows.iter().map(|r| r.rainfall).fold(f64::MIN, f64::max);
        let min = rows.iter().map(|r| r.rainfall).fold(f64::MAX, f64::min);

        let mut out = format!("## 🌧️ Rainfall Data: {}\n\n", state);
        out.push_str(&format!("- **Average Rainfall**: {:.2} mm\n", average));
        out.push_str(&format!("- **Maximum Rainfall**: {:.2} mm\n", max));
        out.push_str(&format!("- **Minimum Rainfall**: {:.2} mm\n", min));
        if let Some((lo, hi)) = year_span(rows.iter().map(|r| r.year)) {
            out.push_str(&format!("- **Data Period**: {} - {}\n", lo, hi));
        }

        Answer::cited(out, CLIMATE)
    }

    pub fn help(&self) -> Answer {
        Answer::plain(
            "❌ Unable to understand the question.\n\n**Try asking:**\n\
             - Compare Maharashtra and Gujarat\n\
             - Which state has highest rice production?\n\
             - Show me wheat statistics\n\
             - What is the rainfall in Kerala?\n\
             - Analyze production trend in Punjab",
        )
    }
}

fn kilo_tonnes(production: f64) -> String {
    format!("{:.2}k tonnes", production / 1000.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn year_span(years: impl Iterator<Item = i32>) -> Option<(i32, i32)> {
    years.fold(None, |acc, y| match acc {
        None => Some((y, y)),
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
    })
}

/// Production summed per key, keys in ascending order
fn sum_by<'a, K: Ord>(
    rows: impl Iterator<Item = &'a AgricultureRecord>,
    key: impl Fn(&'a AgricultureRecord) -> K,
) -> BTreeMap<K, f64> {
    let mut totals = BTreeMap::new();
    for r in rows {
        *totals.entry(key(r)).or_insert(0.0) += r.production;
    }
    totals
}

/// The `n` largest totals; equal totals keep key order
fn largest<K>(totals: BTreeMap<K, f64>, n: usize) -> Vec<(K, f64)> {
    let mut ranked: Vec<(K, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}


#[cfg(test)]
mod tests {
    use super::*;
    use parser::{AgricultureDataset, ClimateDataset};

    fn engine() -> QueryEngine {
        QueryEngine::new(Arc::new(fixtures::datasets()))
    }

    fn agri_only(records: Vec<AgricultureRecord>) -> QueryEngine {
        QueryEngine::new(Arc::new(Datasets::new(
            AgricultureDataset::new(records),
            ClimateDataset::default(),
        )))
    }

    fn record(state: &str, crop: &str, production: f64, year: i32) -> AgricultureRecord {
        AgricultureRecord {
            state_name: state.to_string(),
            crop_name: crop.to_string(),
            production,
            year,
            source_file: None,
        }
    }

    #[test]
    fn test_compare_states_sections() {
        let answer = engine().compare_states("MAHARASHTRA", "GUJARAT");
        let text = &answer.answer;

        assert!(text.starts_with("## Comparison: MAHARASHTRA vs GUJARAT\n\n*(Data up to 2016)*"));
        assert!(text.contains("### 🌧️ Rainfall Comparison"));
        assert!(text.contains("- **MAHARASHTRA**: 1100.00 mm (average annual)"));
        assert!(text.contains("- **GUJARAT**: 800.00 mm (average annual)"));
        assert!(text.contains("- **Difference**: 300.00 mm"));
        assert_eq!(text.matches("Top 5 Crops in").count(), 2);
        assert!(text.contains("1. **SUGARCANE**: 80.00k tonnes"));
        assert!(text.contains("1. **COTTON**: 9.00k tonnes"));
        assert_eq!(answer.sources, vec![AGRICULTURE_AND_CLIMATE]);
    }

    #[test]
    fn test_compare_skips_rainfall_without_both_states() {
        let text = engine().compare_states("PUNJAB", "GUJARAT").answer;
        assert!(!text.contains("Rainfall Comparison"));
        assert!(text.contains("### 🌾 Top 5 Crops in PUNJAB\n1. **WHEAT**: 35.00k tonnes\n2. **RICE**: 22.50k tonnes"));
    }

    #[test]
    fn test_compare_by_substring_merges_states() {
        // "BENGAL" also matches "WEST BENGAL"
        let text = engine().compare_states("BENGAL", "GOA").answer;
        assert!(text.contains("### 🌾 Top 5 Crops in BENGAL\n1. **RICE**: 15.00k tonnes"));
    }

    #[test]
    fn test_highest_rice() {
        let answer = engine().find_highest_lowest(Extreme::Highest, Some("RICE"), None);
        assert!(answer.answer.starts_with("## 🏆 Highest Production"));
        assert!(answer.answer.contains("- **Crop**: RICE\n"));
        assert!(answer.answer.contains("- **State**: WEST BENGAL\n"));
        assert!(answer.answer.contains("- **Production**: 15.00k tonnes\n"));
        assert!(answer.answer.contains("- **Year**: 2014\n"));
        assert_eq!(answer.sources, vec![AGRICULTURE]);
    }

    #[test]
    fn test_lowest_in_state() {
        let answer = engine().find_highest_lowest(Extreme::Lowest, None, Some("MAHARASHTRA"));
        assert!(answer.answer.starts_with("## 📉 Lowest Production"));
        assert!(answer.answer.contains("- **Crop**: WHEAT\n"));
    }

    #[test]
    fn test_extreme_ties_pick_first_row() {
        let engine = agri_only(vec![
            record("GOA", "RICE", 5.0, 2014),
            record("BIHAR", "RICE", 5.0, 2015),
        ]);
        let high = engine.find_highest_lowest(Extreme::Highest, None, None).answer;
        let low = engine.find_highest_lowest(Extreme::Lowest, None, None).answer;
        assert!(high.contains("- **State**: GOA"));
        assert!(low.contains("- **State**: GOA"));
    }

    #[test]
    fn test_extreme_no_match() {
        let answer = engine().find_highest_lowest(Extreme::Highest, Some("JUTE"), None);
        assert_eq!(answer, Answer::plain("No matching data found."));
    }

    #[test]
    fn test_trend_increasing() {
        let answer = engine().analyze_trend(Some("PUNJAB"), None);
        let text = &answer.answer;
        assert!(text.contains("**State**: PUNJAB\n"));
        assert!(text.contains("**Period**: 2013 to 2014\n"));
        // 28000 -> 29500
        assert!(text.contains("**Change**: +5.36%\n"));
        assert!(text.contains("**Direction**: 📈 Increasing"));
    }

    #[test]
    fn test_trend_decreasing() {
        let text = engine().analyze_trend(Some("MAHARASHTRA"), None).answer;
        // 83000 -> 8500
        assert!(text.contains("**Change**: -89.76%\n"));
        assert!(text.contains("📉 Decreasing"));
    }

    #[test]
    fn test_trend_needs_two_years() {
        let insufficient = Answer::plain("Insufficient data for trend analysis.");
        assert_eq!(engine().analyze_trend(Some("KERALA"), None), insufficient);
        assert_eq!(engine().analyze_trend(Some("NAGALAND"), None), insufficient);
    }

    #[test]
    fn test_trend_zero_first_year_is_guarded() {
        let engine = agri_only(vec![
            record("GOA", "RICE", 0.0, 2014),
            record("GOA", "RICE", 10.0, 2015),
        ]);
        let text = engine.analyze_trend(None, None).answer;
        assert!(text.contains("cannot compute percent change"));
        assert!(!text.contains("inf"));
    }

    #[test]
    fn test_crop_info_all_states() {
        let answer = engine().get_crop_info("WHEAT", None);
        let text = &answer.answer;
        assert!(text.starts_with("## 🌾 WHEAT Statistics\n\n"));
        assert!(text.contains("- **Total Production**: 39.00k tonnes\n"));
        assert!(text.contains("- **Average Production**: 9.75k tonnes\n"));
        assert!(text.contains("- **Data Period**: 2013 - 2015\n"));
        assert!(text.contains("**Top 3 Producing States**:\n1. PUNJAB: 35.00k tonnes\n2. GUJARAT: 2.50k tonnes\n3. MAHARASHTRA: 1.50k tonnes\n"));
        assert_eq!(answer.sources, vec![CROPS]);
    }

    #[test]
    fn test_crop_info_in_state() {
        let text = engine().get_crop_info("RICE", Some("PUNJAB")).answer;
        assert!(text.contains("**State**: PUNJAB\n"));
        assert!(!text.contains("Top 3"));
    }

    #[test]
    fn test_crop_info_missing() {
        assert_eq!(
            engine().get_crop_info("COTTON", Some("KERALA")),
            Answer::plain("No data found for COTTON in KERALA")
        );
    }

    #[test]
    fn test_rainfall_info() {
        let answer = engine().get_rainfall_info("KERALA");
        let text = &answer.answer;
        assert!(text.starts_with("## 🌧️ Rainfall Data: KERALA\n\n"));
        assert!(text.contains("- **Average Rainfall**: 2750.00 mm\n"));
        assert!(text.contains("- **Maximum Rainfall**: 3000.00 mm\n"));
        assert!(text.contains("- **Minimum Rainfall**: 2500.00 mm\n"));
        assert!(text.contains("- **Data Period**: 2014 - 2015\n"));
        assert_eq!(answer.sources, vec![CLIMATE]);
    }

    #[test]
    fn test_rainfall_info_unknown_state() {
        assert_eq!(
            engine().get_rainfall_info("GOA"),
            Answer::plain("No rainfall data found for GOA.")
        );
    }

    #[test]
    fn test_empty_datasets() {
        let engine = QueryEngine::new(Arc::new(Datasets::default()));
        assert!(!engine.has_data());
        assert_eq!(
            engine.find_highest_lowest(Extreme::Highest, None, None),
            Answer::plain("No agriculture data available.")
        );
        assert_eq!(engine.get_rainfall_info("GOA"), Answer::plain("No climate data available."));
    }
}
