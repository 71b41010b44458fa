//! Prompts for resume evaluation.
//!
//! The system prompt fixes the evaluator's role. The user prompt carries the
//! job description and the reply format, and is sent alongside the resume
//! image. Each [`DecodeStrategy`] has a matching format section so whatever
//! format is requested, the decoder knows how to read it.

use screener_core::{Criterion, DecodeStrategy};

/// System prompt shared by every evaluation.
pub const SYSTEM_PROMPT: &str = r#"
You are a technical recruiter screening resumes against a job description.

Rate only what the resume image shows. Do not assume skills or experience
that are not written on it. If a detail is unreadable or absent, rate it low
and say so in the justification.

Ratings are integers from 1 to 5, where 5 is best.
The overall fit is a percentage from 0 to 100.
"#;

const JSON_FORMAT: &str = r#"
## Output Format (JSON)
Return a single JSON object and nothing else:
{
  "candidate_name": "name if discernible from the resume, else \"Candidate\"",
  "ratings": [
    { "criterion": "years_of_experience", "rating": 1-5, "justification": "1-2 sentences" },
    { "criterion": "skills_match", "rating": 1-5, "justification": "1-2 sentences" },
    { "criterion": "projects_relevance", "rating": 1-5, "justification": "1-2 sentences" },
    { "criterion": "work_experience_relevance", "rating": 1-5, "justification": "1-2 sentences" },
    { "criterion": "education_relevance", "rating": 1-5, "justification": "1-2 sentences" }
  ],
  "overall_fit_percentage": 0.0-100.0,
  "overall_summary": "1-2 sentences on overall suitability"
}
"#;

const TUPLE_FORMAT: &str = r#"
## Output Format (tuple)
Return one tuple literal in exactly this structure, as plain text without code fences:
(
    "Candidate name if discernible from the resume, else 'Candidate'",
    [
        [Years of Experience rating (integer 1-5), "justification"],
        [Skills Match rating (integer 1-5), "justification"],
        [Projects Relevance rating (integer 1-5), "justification"],
        [Working Experience Relevance rating (integer 1-5), "justification"],
        [Educational History Relevance rating (integer 1-5), "justification"]
    ],
    [overall fit percentage (float 0.0-100.0)],
    "overall summary (1-2 sentences)"
)

Example:
(
    "Ava Johnson",
    [
        [1, "Some experience, but not related to the role."],
        [2, "Skills partially align, key skills like Rust are missing."],
        [2, "Projects are not detailed against the requirements."],
        [2, "Work experience is relevant but lacks the technology match."],
        [5, "Excellent educational background in Computer Science."]
    ],
    [20.0],
    "Low fit due to missing skills despite a strong education."
)
"#;

const LINES_FORMAT_TAIL: &str = r#"
Finally, give the overall fit on its own line:
Overall Fit Percentage: [Percentage]%

Example (follow the format, not the content):
1. Years of Experience: Rating: 4/5, Justification: Good experience in related field.
2. Skills Match: Rating: 5/5, Justification: Excellent alignment with required skills.
...
Overall Fit Percentage: 85%
"#;

fn format_section(format: DecodeStrategy) -> String {
    match format {
        DecodeStrategy::Json => JSON_FORMAT.to_string(),
        DecodeStrategy::Tuple => TUPLE_FORMAT.to_string(),
        DecodeStrategy::Lines => {
            let mut section = String::from("\n## Output Format (lines)\nOne line per criterion:\n");
            for (i, criterion) in Criterion::ALL.iter().enumerate() {
                section.push_str(&format!(
                    "{}. {}: Rating: [Rating]/5, Justification: [Justification]\n",
                    i + 1,
                    criterion.label()
                ));
            }
            section.push_str(LINES_FORMAT_TAIL);
            section
        }
    }
}

/// Build the user prompt that accompanies the resume image.
pub fn build_evaluation_prompt(job_description: &str, format: DecodeStrategy) -> String {
    let criteria = Criterion::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the resume image provided in relation to the following job description.\n\n\
         ## Job Description\n{}\n\n\
         ## Criteria\n\
         Rate how well the resume aligns with the job description on each criterion, \
         with a brief justification (1-2 sentences):\n{}\n\n\
         Then give an overall fit percentage and a short summary of suitability.\n{}",
        job_description.trim(),
        criteria,
        format_section(format)
    )
}
