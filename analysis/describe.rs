//! # Descriptive Statistics
//!
//! Chart datasets for the report's descriptive section, computed from the
//! full dataset before any modeling: outcome distribution, age histogram,
//! chest-pain-type distribution, and outcome by sex. Rendering is plain
//! text, one `#` bar per category scaled to a fixed width, so the report
//! stays terminal-friendly.

use crate::data::{AGE_COLUMN, CP_COLUMN, Dataset, SEX_COLUMN};

const BAR_WIDTH: usize = 40;
const AGE_BIN_YEARS: f64 = 5.0;

/// Clinical names for the `cp` codes 0 through 3.
const CHEST_PAIN_LABELS: [&str; 4] = [
    "typical angina",
    "atypical angina",
    "non-anginal pain",
    "asymptomatic",
];

/// A titled list of labelled counts, renderable as a text bar chart.
#[derive(Debug, Clone)]
pub struct FrequencyChart {
    pub title: String,
    pub rows: Vec<(String, usize)>,
}

impl FrequencyChart {
    /// Renders the chart with `#` bars scaled so the largest row spans the
    /// full bar width. Nonzero counts always draw at least one mark.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("--- {} ---\n", self.title));
        let label_width = self
            .rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        let max_count = self.rows.iter().map(|&(_, count)| count).max().unwrap_or(0);
        for (label, count) in &self.rows {
            let bar_len = if *count == 0 || max_count == 0 {
                0
            } else {
                ((*count * BAR_WIDTH + max_count / 2) / max_count).max(1)
            };
            out.push_str(&format!(
                "{:<label_width$} | {} {}\n",
                label,
                "#".repeat(bar_len),
                count
            ));
        }
        out
    }
}

/// Record counts per outcome class.
pub fn outcome_distribution(dataset: &Dataset) -> FrequencyChart {
    let (absent, present) = dataset.label_counts();
    FrequencyChart {
        title: "Outcome distribution".to_string(),
        rows: vec![
            ("no disease".to_string(), absent),
            ("disease".to_string(), present),
        ],
    }
}

/// Ages grouped into fixed five-year bins spanning the observed range.
/// Interior bins with zero records are kept, so gaps stay visible.
pub fn age_histogram(dataset: &Dataset) -> FrequencyChart {
    let ages = dataset.features().column(AGE_COLUMN).to_owned();
    let min = ages.fold(f64::INFINITY, |acc, &a| acc.min(a));
    let max = ages.fold(f64::NEG_INFINITY, |acc, &a| acc.max(a));

    let lo_bin = (min / AGE_BIN_YEARS).floor() as i64;
    let hi_bin = (max / AGE_BIN_YEARS).floor() as i64;
    let mut rows = Vec::with_capacity((hi_bin - lo_bin + 1) as usize);
    for bin in lo_bin..=hi_bin {
        let count = ages
            .iter()
            .filter(|&&a| (a / AGE_BIN_YEARS).floor() as i64 == bin)
            .count();
        let start = bin * AGE_BIN_YEARS as i64;
        rows.push((format!("{}-{}", start, start + AGE_BIN_YEARS as i64 - 1), count));
    }
    FrequencyChart {
        title: "Age distribution (years)".to_string(),
        rows,
    }
}

/// Record counts per chest-pain code, labelled clinically. Codes outside
/// the documented 0..=3 range are collected under `other`.
pub fn chest_pain_distribution(dataset: &Dataset) -> FrequencyChart {
    let mut counts = [0_usize; 4];
    let mut other = 0_usize;
    for &code in dataset.features().column(CP_COLUMN) {
        match code as i64 {
            c @ 0..=3 if code.fract() == 0.0 => counts[c as usize] += 1,
            _ => other += 1,
        }
    }
    let mut rows: Vec<(String, usize)> = CHEST_PAIN_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    if other > 0 {
        rows.push(("other".to_string(), other));
    }
    FrequencyChart {
        title: "Chest pain type".to_string(),
        rows,
    }
}

/// Outcome counts within each sex.
pub fn outcome_by_sex(dataset: &Dataset) -> FrequencyChart {
    let mut rows = [0_usize; 4]; // female/absent, female/present, male/absent, male/present
    for (record, &label) in dataset.features().outer_iter().zip(dataset.labels()) {
        let male = record[SEX_COLUMN] == 1.0;
        let present = label == 1.0;
        rows[usize::from(male) * 2 + usize::from(present)] += 1;
    }
    FrequencyChart {
        title: "Outcome by sex".to_string(),
        rows: vec![
            ("female / no disease".to_string(), rows[0]),
            ("female / disease".to_string(), rows[1]),
            ("male / no disease".to_string(), rows[2]),
            ("male / disease".to_string(), rows[3]),
        ],
    }
}
