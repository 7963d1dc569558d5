//! Text-to-threshold inference.
//!
//! Two patterns are recognized, case-insensitively:
//! - hours: `<number> hours` or `<number> hrs`
//! - daylight factor: `<number>% daylight factor` or `<number>% DF`
//!
//! Within one document the smallest value per metric wins (the most conservative
//! reading). Across documents the largest of those minima wins (the strictest rule).
//! A number whose closest keyword in the same clause is "target" feeds the metric's
//! target instead. A metric with only target values takes the smallest one as its minimum.
use tracing::debug;

use crate::thresholds::{
    RegulationDocument, Threshold, ThresholdSet, DEFAULT_DAYLIGHT_FACTOR, DEFAULT_SUN_HOURS,
};

/// Credit names containing one of these (lowercase) are scanned.
const CREDIT_KEYWORDS: [&str; 3] = ["daylight", "sun", "solar"];

const HOURS_UNITS: [&str; 2] = ["hours", "hrs"];

/// Keywords marking a number as a minimum when they are closer to it than "target".
const MINIMUM_KEYWORDS: [&str; 3] = ["minimum", "at least", "min "];

/// Raw numeric matches of one requirement string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementMatches {
    /// Values followed by an hours unit.
    pub hours: Vec<f32>,
    /// Daylight factor percentages, converted to fractions.
    pub daylight_factor: Vec<f32>,
}

impl RequirementMatches {
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty() && self.daylight_factor.is_empty()
    }
}

/// Scans a requirement string for hour and daylight-factor values.
pub fn scan_requirement(text: &str) -> RequirementMatches {
    let mut out = RequirementMatches::default();
    for m in scan_values(text) {
        match m.metric {
            Metric::Hours => out.hours.push(m.value),
            Metric::DaylightFactor => out.daylight_factor.push(m.value),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Hours,
    DaylightFactor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ValueMatch {
    metric: Metric,
    value: f32,
    is_target: bool,
}

fn scan_values(text: &str) -> Vec<ValueMatch> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let starts_number =
            bytes[i].is_ascii_digit() && (i == 0 || !is_number_byte(bytes[i - 1]));
        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }

        let Ok(value) = text[start..i].parse::<f32>() else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }

        let rest = skip_whitespace(&bytes[i..]);
        let matched = if HOURS_UNITS.iter().any(|unit| match_word(rest, unit).is_some()) {
            Some((Metric::Hours, value))
        } else {
            rest.strip_prefix(b"%")
                .filter(|after| match_daylight_factor(skip_whitespace(after)))
                .map(|_| (Metric::DaylightFactor, value / 100.0))
        };
        if let Some((metric, value)) = matched {
            out.push(ValueMatch {
                metric,
                value,
                is_target: is_target_number(text, start),
            });
        }
    }

    out
}

/// Whether "target" is the closest keyword before the number at `start`, within its clause.
fn is_target_number(text: &str, start: usize) -> bool {
    let bytes = text.as_bytes();
    let clause_start = (0..start)
        .rev()
        .find(|&j| is_clause_break(bytes, j))
        .map_or(0, |j| j + 1);
    let clause = text[clause_start..start].to_ascii_lowercase();
    let target = clause.rfind("target");
    let minimum = MINIMUM_KEYWORDS.iter().filter_map(|k| clause.rfind(k)).max();
    target.is_some() && target > minimum
}

/// Clause separators; a period only counts when it is not a decimal point.
fn is_clause_break(bytes: &[u8], j: usize) -> bool {
    match bytes[j] {
        b',' | b';' | b':' | b'\n' => true,
        b'.' => !bytes.get(j + 1).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}

/// Thresholds of a single requirement set, with defaults for unmatched metrics.
pub fn extract_thresholds<S: AsRef<str>>(requirement_texts: &[S]) -> ThresholdSet {
    let reading = read_texts(requirement_texts.iter().map(AsRef::as_ref));
    reading.resolve()
}

/// Thresholds for a set of simultaneously active regulation documents.
///
/// Only credits whose name mentions daylight, sun, or solar are scanned. Returns `None`
/// when no document has such a credit, meaning no certification context applies.
pub fn resolve_thresholds(documents: &[RegulationDocument]) -> Option<ThresholdSet> {
    let mut combined: Option<DocumentReading> = None;

    for doc in documents {
        let texts = doc
            .credits
            .iter()
            .filter(|c| is_relevant_credit(&c.name))
            .flat_map(|c| c.requirement_texts.iter().map(String::as_str));
        let mut texts = texts.peekable();
        if texts.peek().is_none() {
            debug!("Regulation '{}' has no daylight or sun credits.", doc.name);
            continue;
        }
        let reading = read_texts(texts);
        combined = Some(match combined {
            Some(acc) => acc.strictest(reading),
            None => reading,
        });
    }

    let set = combined?.resolve();
    debug!(
        "Resolved thresholds from {} documents: {:?}.",
        documents.len(),
        set
    );
    Some(set)
}

/// Whether a credit name is about daylight or sun access.
pub fn is_relevant_credit(name: &str) -> bool {
    let lower = name.to_lowercase();
    CREDIT_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[derive(Debug, Clone, Copy, Default)]
struct MetricReading {
    minimum: Option<f32>,
    target: Option<f32>,
}

impl MetricReading {
    fn observe(&mut self, value: f32, is_target: bool) {
        if value < 0.0 {
            return;
        }
        let slot = if is_target {
            &mut self.target
        } else {
            &mut self.minimum
        };
        *slot = Some(slot.map_or(value, |cur| cur.min(value)));
    }

    fn strictest(self, other: MetricReading) -> MetricReading {
        MetricReading {
            minimum: max_opt(self.minimum, other.minimum),
            target: max_opt(self.target, other.target),
        }
    }

    fn resolve(self, default: Threshold) -> Threshold {
        match (self.minimum, self.target) {
            (Some(minimum), target) => Threshold::parsed(minimum, target),
            (None, Some(target)) => Threshold::parsed(target, None),
            (None, None) => default,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DocumentReading {
    sun_hours: MetricReading,
    daylight_factor: MetricReading,
}

impl DocumentReading {
    fn strictest(self, other: DocumentReading) -> DocumentReading {
        DocumentReading {
            sun_hours: self.sun_hours.strictest(other.sun_hours),
            daylight_factor: self.daylight_factor.strictest(other.daylight_factor),
        }
    }

    fn resolve(self) -> ThresholdSet {
        ThresholdSet {
            sun_hours: Some(self.sun_hours.resolve(DEFAULT_SUN_HOURS)),
            daylight_factor: Some(self.daylight_factor.resolve(DEFAULT_DAYLIGHT_FACTOR)),
        }
    }
}

fn read_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> DocumentReading {
    let mut reading = DocumentReading::default();
    for text in texts {
        for m in scan_values(text) {
            let metric = match m.metric {
                Metric::Hours => &mut reading.sun_hours,
                Metric::DaylightFactor => &mut reading.daylight_factor,
            };
            metric.observe(m.value, m.is_target);
        }
    }
    reading
}

fn max_opt(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[inline]
fn is_number_byte(b: u8) -> bool {
    b.is_ascii_digit() || b == b'.'
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let n = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[n..]
}

/// Case-insensitive word match; returns the bytes after the word.
fn match_word<'a>(bytes: &'a [u8], word: &str) -> Option<&'a [u8]> {
    let w = word.as_bytes();
    if bytes.len() < w.len() || !bytes[..w.len()].eq_ignore_ascii_case(w) {
        return None;
    }
    let rest = &bytes[w.len()..];
    match rest.first() {
        Some(b) if b.is_ascii_alphanumeric() => None,
        _ => Some(rest),
    }
}

fn match_daylight_factor(bytes: &[u8]) -> bool {
    if match_word(bytes, "df").is_some() {
        return true;
    }
    match match_word(bytes, "daylight") {
        Some(rest) => {
            let spaced = skip_whitespace(rest);
            spaced.len() < rest.len() && match_word(spaced, "factor").is_some()
        }
        None => false,
    }
}
