//! Core data types for resume evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive bounds for a criterion rating.
pub const RATING_RANGE: (i32, i32) = (1, 5);

/// Inclusive bounds for the overall fit percentage.
pub const PERCENTAGE_RANGE: (f64, f64) = (0.0, 100.0);

/// Name used when the model cannot discern the candidate.
pub const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// The five fixed evaluation dimensions, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    YearsOfExperience,
    SkillsMatch,
    ProjectsRelevance,
    WorkExperienceRelevance,
    EducationRelevance,
}

impl Criterion {
    /// All criteria in the order the model is asked to rate them.
    pub const ALL: [Criterion; 5] = [
        Criterion::YearsOfExperience,
        Criterion::SkillsMatch,
        Criterion::ProjectsRelevance,
        Criterion::WorkExperienceRelevance,
        Criterion::EducationRelevance,
    ];

    /// Human-readable label, as used in prompts and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::YearsOfExperience => "Years of Experience",
            Criterion::SkillsMatch => "Skills Match",
            Criterion::ProjectsRelevance => "Projects Relevance",
            Criterion::WorkExperienceRelevance => "Working Experience Relevance",
            Criterion::EducationRelevance => "Educational History Relevance",
        }
    }

    /// Stable machine key (matches the serde representation).
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::YearsOfExperience => "years_of_experience",
            Criterion::SkillsMatch => "skills_match",
            Criterion::ProjectsRelevance => "projects_relevance",
            Criterion::WorkExperienceRelevance => "work_experience_relevance",
            Criterion::EducationRelevance => "education_relevance",
        }
    }

    /// Match a free-text label (case and punctuation insensitive).
    pub fn from_label(text: &str) -> Option<Criterion> {
        let wanted = normalize_label(text);
        Criterion::ALL
            .into_iter()
            .find(|c| normalize_label(c.label()) == wanted || normalize_label(c.key()) == wanted)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A single rated criterion with the model's justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRating {
    pub criterion: Criterion,

    /// Rating, nominally 1-5
    pub rating: i32,

    pub justification: String,
}

/// A structured evaluation of one resume against one job description.
///
/// Built once by the decoder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Candidate name, or "Candidate" if not discernible
    pub candidate_name: String,

    /// Exactly five ratings in `Criterion::ALL` order
    pub ratings: Vec<CriterionRating>,

    /// Overall fit, nominally 0-100; absent when the model omitted it
    pub overall_fit_percentage: Option<f64>,

    pub overall_summary: String,
}

impl EvaluationRecord {
    /// Look up the rating for a criterion.
    pub fn rating(&self, criterion: Criterion) -> Option<&CriterionRating> {
        self.ratings.iter().find(|r| r.criterion == criterion)
    }

    /// Fit percentage with the chart convention of substituting zero.
    pub fn fit_or_zero(&self) -> f64 {
        self.overall_fit_percentage.unwrap_or(0.0)
    }

    /// Report advisory range violations. An empty list means in bounds.
    pub fn range_violations(&self) -> Vec<RangeViolation> {
        let mut violations = Vec::new();

        for r in &self.ratings {
            if r.rating < RATING_RANGE.0 || r.rating > RATING_RANGE.1 {
                violations.push(RangeViolation::Rating {
                    criterion: r.criterion,
                    value: r.rating,
                });
            }
        }

        if let Some(pct) = self.overall_fit_percentage {
            if !(PERCENTAGE_RANGE.0..=PERCENTAGE_RANGE.1).contains(&pct) {
                violations.push(RangeViolation::Percentage { value: pct });
            }
        }

        violations
    }
}

/// A value outside its advisory bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeViolation {
    Rating { criterion: Criterion, value: i32 },
    Percentage { value: f64 },
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeViolation::Rating { criterion, value } => write!(
                f,
                "{} rating {} outside {}..={}",
                criterion, value, RATING_RANGE.0, RATING_RANGE.1
            ),
            RangeViolation::Percentage { value } => write!(
                f,
                "overall fit {} outside {}..={}",
                value, PERCENTAGE_RANGE.0, PERCENTAGE_RANGE.1
            ),
        }
    }
}

/// An uploaded resume as submitted by the user.
#[derive(Clone, PartialEq)]
pub struct ResumeFile {
    /// Original file name, used to attribute results
    pub name: String,

    /// Declared MIME type (e.g. "application/pdf", "image/png")
    pub mime: String,

    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

impl fmt::Debug for ResumeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ratings: [i32; 5], pct: Option<f64>) -> EvaluationRecord {
        EvaluationRecord {
            candidate_name: "Jane Doe".to_string(),
            ratings: Criterion::ALL
                .iter()
                .zip(ratings)
                .map(|(c, r)| CriterionRating {
                    criterion: *c,
                    rating: r,
                    justification: "ok".to_string(),
                })
                .collect(),
            overall_fit_percentage: pct,
            overall_summary: "Strong fit".to_string(),
        }
    }

    #[test]
    fn test_criterion_from_label() {
        assert_eq!(
            Criterion::from_label("Years of Experience"),
            Some(Criterion::YearsOfExperience)
        );
        assert_eq!(
            Criterion::from_label("  skills match: "),
            Some(Criterion::SkillsMatch)
        );
        assert_eq!(
            Criterion::from_label("education_relevance"),
            Some(Criterion::EducationRelevance)
        );
        assert_eq!(Criterion::from_label("Hobbies"), None);
    }

    #[test]
    fn test_criterion_serde_key_matches() {
        for c in Criterion::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.key()));
        }
    }

    #[test]
    fn test_in_range_record_has_no_violations() {
        assert!(record([1, 2, 3, 4, 5], Some(82.5)).range_violations().is_empty());
        assert!(record([1, 2, 3, 4, 5], None).range_violations().is_empty());
    }

    #[test]
    fn test_out_of_range_values_reported() {
        let violations = record([0, 2, 3, 4, 9], Some(120.0)).range_violations();
        assert_eq!(violations.len(), 3);
        assert!(violations[0].to_string().contains("Years of Experience"));
        assert!(matches!(violations[2], RangeViolation::Percentage { .. }));
    }

    #[test]
    fn test_fit_or_zero() {
        assert_eq!(record([3; 5], None).fit_or_zero(), 0.0);
        assert_eq!(record([3; 5], Some(40.0)).fit_or_zero(), 40.0);
    }

    #[test]
    fn test_resume_file_debug_hides_bytes() {
        let file = ResumeFile::new("cv.png", "image/png", vec![1, 2, 3]);
        let debug = format!("{:?}", file);
        assert!(debug.contains("cv.png"));
        assert!(debug.contains("len: 3"));
    }
}
