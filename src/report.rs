//! CSV export of evaluation results.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::metrics::EvaluationResult;

pub const CSV_HEADER: [&str; 4] = ["Measurement", "Avg Deviation (%)", "MAE (cm)", "Accuracy Rating"];

/// Qualitative rating of a percentage deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AccuracyRating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsImprovement,
}

impl AccuracyRating {
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation <= 3.0 {
            AccuracyRating::Excellent
        } else if deviation <= 6.0 {
            AccuracyRating::VeryGood
        } else if deviation <= 10.0 {
            AccuracyRating::Good
        } else if deviation <= 15.0 {
            AccuracyRating::Fair
        } else {
            AccuracyRating::NeedsImprovement
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AccuracyRating::Excellent => "Excellent",
            AccuracyRating::VeryGood => "Very Good",
            AccuracyRating::Good => "Good",
            AccuracyRating::Fair => "Fair",
            AccuracyRating::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for AccuracyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An evaluation result ready to be written as CSV.
pub struct CsvReport<'a> {
    result: &'a EvaluationResult,
    dataset_name: &'a str,
    date: NaiveDate,
}

impl<'a> CsvReport<'a> {
    pub fn new(result: &'a EvaluationResult, dataset_name: &'a str, date: NaiveDate) -> Self {
        Self {
            result,
            dataset_name,
            date,
        }
    }

    pub fn to_csv(&self) -> String {
        let mut s = String::new();

        push_row(&mut s, &["Dataset", self.dataset_name]);
        push_row(&mut s, &["Samples", &self.result.sample_count.to_string()]);
        push_row(&mut s, &["Date", &self.date.format("%Y-%m-%d").to_string()]);
        s.push('\n');

        push_row(&mut s, &CSV_HEADER);
        for key in &self.result.key_measurements {
            push_measurement(&mut s, key.name.as_str(), key.deviation, key.mae);
        }
        push_measurement(
            &mut s,
            "OVERALL",
            self.result.percentage_deviation,
            self.result.mae,
        );

        s
    }
}

fn push_measurement(s: &mut String, name: &str, deviation: f64, mae: f64) {
    let rating = AccuracyRating::from_deviation(deviation);
    push_row(
        s,
        &[
            name,
            &format!("{:.2}", deviation),
            &format!("{:.2}", mae),
            rating.as_str(),
        ],
    );
}

fn push_row(s: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    s.push_str(&row.join(","));
    s.push('\n');
}

/// Quote a field containing a comma, quote or line break; inner quotes are doubled.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
