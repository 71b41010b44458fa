//! Terminal and JSON rendering of screening results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

use screener_runtime::{FileEvaluation, FileOutcome};

/// Width of a full (100%) bar in the comparison chart.
const BAR_WIDTH: usize = 40;

/// A finished screening run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub summary: RunSummary,
    pub results: Vec<FileEvaluation>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub evaluated: usize,
    pub failed: usize,
}

impl Report {
    pub fn new(model: impl Into<String>, results: Vec<FileEvaluation>) -> Self {
        Self::at(Utc::now(), model, results)
    }

    fn at(generated_at: DateTime<Utc>, model: impl Into<String>, results: Vec<FileEvaluation>) -> Self {
        let evaluated = results.iter().filter(|r| r.is_success()).count();
        Self {
            generated_at,
            model: model.into(),
            summary: RunSummary {
                total: results.len(),
                evaluated,
                failed: results.len() - evaluated,
            },
            results,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Resume Screening Report");
        let _ = writeln!(
            out,
            "Generated: {} (model: {})",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.model
        );
        let _ = writeln!(
            out,
            "{} file(s): {} evaluated, {} failed",
            self.summary.total, self.summary.evaluated, self.summary.failed
        );

        for result in &self.results {
            let _ = writeln!(out);
            let _ = writeln!(out, "== {} ==", result.file_name);
            match &result.outcome {
                FileOutcome::Failed { reason } => {
                    let _ = writeln!(out, "Analysis failed for this resume: {}", reason);
                }
                FileOutcome::Evaluated { record } => {
                    let _ = writeln!(out, "Candidate: {}", record.candidate_name);
                    for rating in &record.ratings {
                        let _ = writeln!(
                            out,
                            "  {}: {}/5 - {}",
                            rating.criterion.label(),
                            rating.rating,
                            rating.justification
                        );
                    }
                    match record.overall_fit_percentage {
                        Some(pct) => {
                            let _ = writeln!(out, "Overall Fit: {:.1}%", pct);
                        }
                        None => {
                            let _ = writeln!(out, "Overall Fit: could not be determined");
                        }
                    }
                    if !record.overall_summary.is_empty() {
                        let _ = writeln!(out, "Summary: {}", record.overall_summary);
                    }
                }
            }
        }

        let chart = self.fit_chart();
        if !chart.is_empty() {
            let _ = writeln!(out);
            out.push_str(&chart);
        }

        out
    }

    /// Horizontal bar chart of overall fit per evaluated file.
    ///
    /// A record without a percentage is drawn as 0.
    pub fn fit_chart(&self) -> String {
        let bars: Vec<(&str, f64)> = self
            .results
            .iter()
            .filter_map(|r| r.record().map(|rec| (r.file_name.as_str(), rec.fit_or_zero())))
            .collect();
        if bars.is_empty() {
            return String::new();
        }

        let label_width = bars.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);

        let mut out = String::from("Candidate Fit Comparison\n");
        for (name, pct) in bars {
            let _ = writeln!(
                out,
                "{:<lw$} |{:<bw$}| {:5.1}%",
                name,
                bar(pct),
                pct,
                lw = label_width,
                bw = BAR_WIDTH,
            );
        }
        out
    }
}

fn bar(pct: f64) -> String {
    let filled = (pct.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled)
}
