//! Intent router - ordered (predicate, handler) list, first match wins
//!
//! Keyword patterns run against the upper-cased question. Order matters:
//! "compare the trend" is a comparison, not a trend question.

use crate::engine::{Answer, Extreme, QueryEngine, DEFAULT_COMPARISON};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Compare,
    Highest,
    Lowest,
    Trend,
    CropInfo,
    Rainfall,
    Help,
}

/// A question with its entities already extracted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionContext {
    pub question: String,
    pub upper: String,
    pub states: Vec<String>,
    pub crops: Vec<String>,
    pub years: Vec<i32>,
}

impl QuestionContext {
    fn first_state(&self) -> Option<&str> {
        self.states.first().map(String::as_str)
    }

    fn first_crop(&self) -> Option<&str> {
        self.crops.first().map(String::as_str)
    }
}

pub struct Route {
    pub intent: Intent,
    pub matches: fn(&QuestionContext) -> bool,
    pub answer: fn(&QueryEngine, &QuestionContext) -> Answer,
}

fn keywords(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static COMPARE: Lazy<Regex> = Lazy::new(|| keywords(r"COMPAR[EI]"));
static HIGH: Lazy<Regex> = Lazy::new(|| keywords(r"HIGHEST|MAXIMUM|MAX|TOP|BEST"));
static LOW: Lazy<Regex> = Lazy::new(|| keywords(r"LOWEST|MINIMUM|MIN|BOTTOM|WORST"));
static TREND: Lazy<Regex> = Lazy::new(|| keywords(r"TREND|CORRELAT|ANALYZ|PATTERN|CHANGE"));
static DESCRIBE: Lazy<Regex> =
    Lazy::new(|| keywords(r"STATISTIC|INFO|DATA|DETAIL|ABOUT|PRODUCTION"));
static RAIN: Lazy<Regex> = Lazy::new(|| keywords(r"RAINFALL|RAIN|PRECIPITAT|CLIMATE|WEATHER"));

fn is_compare(ctx: &QuestionContext) -> bool {
    COMPARE.is_match(&ctx.upper)
}

fn is_highest(ctx: &QuestionContext) -> bool {
    HIGH.is_match(&ctx.upper)
}

fn is_lowest(ctx: &QuestionContext) -> bool {
    LOW.is_match(&ctx.upper)
}

fn is_trend(ctx: &QuestionContext) -> bool {
    TREND.is_match(&ctx.upper)
}

fn is_crop_info(ctx: &QuestionContext) -> bool {
    !ctx.crops.is_empty() && DESCRIBE.is_match(&ctx.upper)
}

fn is_rainfall(ctx: &QuestionContext) -> bool {
    !ctx.states.is_empty() && RAIN.is_match(&ctx.upper)
}

fn always(_: &QuestionContext) -> bool {
    true
}

fn compare(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    match ctx.states.as_slice() {
        [a, b, ..] => engine.compare_states(a, b),
        _ => engine.compare_states(DEFAULT_COMPARISON.0, DEFAULT_COMPARISON.1),
    }
}

fn highest(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    engine.find_highest_lowest(Extreme::Highest, ctx.first_crop(), ctx.first_state())
}

fn lowest(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    engine.find_highest_lowest(Extreme::Lowest, ctx.first_crop(), ctx.first_state())
}

fn trend(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    engine.analyze_trend(ctx.first_state(), ctx.first_crop())
}

fn crop_info(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    match ctx.first_crop() {
        Some(crop) => engine.get_crop_info(crop, ctx.first_state()),
        None => engine.help(),
    }
}

fn rainfall(engine: &QueryEngine, ctx: &QuestionContext) -> Answer {
    match ctx.first_state() {
        Some(state) => engine.get_rainfall_info(state),
        None => engine.help(),
    }
}

fn help(engine: &QueryEngine, _: &QuestionContext) -> Answer {
    engine.help()
}

/// Priority order, top to bottom. The last route always matches.
pub static ROUTES: &[Route] = &[
    Route { intent: Intent::Compare, matches: is_compare, answer: compare },
    Route { intent: Intent::Highest, matches: is_highest, answer: highest },
    Route { intent: Intent::Lowest, matches: is_lowest, answer: lowest },
    Route { intent: Intent::Trend, matches: is_trend, answer: trend },
    Route { intent: Intent::CropInfo, matches: is_crop_info, answer: crop_info },
    Route { intent: Intent::Rainfall, matches: is_rainfall, answer: rainfall },
    Route { intent: Intent::Help, matches: always, answer: help },
];

pub fn route(ctx: &QuestionContext) -> &'static Route {
    ROUTES
        .iter()
        .find(|r| (r.matches)(ctx))
        .unwrap_or(&ROUTES[ROUTES.len() - 1])
}
