//! Prompt templates for field answering and magic prompt generation

use crate::field::{AnswerShape, DateGranularity, FieldType, FieldValue};

/// Templates for generating prompts
pub struct PromptTemplate;

impl PromptTemplate {
    /// User prompt asking for the answer to one field
    pub fn field_prompt(field_type: FieldType, field: &FieldValue) -> String {
        let mut prompt = format!("Question: {}\n", field.title.trim());

        if let Some(description) = field.description.as_deref().map(str::trim)
            && !description.is_empty()
        {
            prompt.push_str(&format!("Description: {}\n", description));
        }

        if field_type.is_grid() {
            prompt.push_str(&format!("Rows: {}\n", list(&field.rows)));
            prompt.push_str(&format!("Columns: {}\n", list(&field.columns)));
        } else if !field.options.is_empty() {
            prompt.push_str(&format!("Options: {}\n", list(&field.options)));
        }

        prompt.push('\n');
        prompt.push_str(&Self::format_instructions(field_type));
        prompt
    }

    /// How the answer must be formatted for `field_type`
    pub fn format_instructions(field_type: FieldType) -> String {
        match field_type.shape() {
            AnswerShape::Text => match field_type {
                FieldType::Paragraph => {
                    "Answer in a few plain sentences. Reply with the answer text only.".to_string()
                }
                _ => "Answer in one short line. Reply with the answer text only.".to_string(),
            },
            AnswerShape::Generic => {
                let what = match field_type {
                    FieldType::Email => "a single valid email address",
                    FieldType::Url => "a single absolute http(s) URL",
                    FieldType::Dropdown => "exactly one of the options, copied verbatim",
                    _ => "a short value",
                };
                format!(r#"Reply with JSON {{"answer": "..."}} where the answer is {}."#, what)
            }
            AnswerShape::Date => {
                let format = match field_type.date_granularity() {
                    Some(DateGranularity::Date) => "YYYY-MM-DD",
                    Some(DateGranularity::Time) => "HH:MM (24-hour)",
                    _ => "YYYY-MM-DDTHH:MM (24-hour)",
                };
                format!("Reply with the value only, formatted as {}.", format)
            }
            AnswerShape::LinearScale => {
                r#"Reply with JSON {"answer": n} where n is one of the listed numbers."#.to_string()
            }
            AnswerShape::SingleOption => format!(
                r#"Reply with JSON {{"optionText": "...", "isOther": false}} naming exactly one option verbatim.{}"#,
                other_hint(field_type)
            ),
            AnswerShape::MultiOption => format!(
                r#"Reply with a JSON array of {{"optionText": "...", "isOther": false}} objects, one per selected option, without duplicates.{}"#,
                other_hint(field_type)
            ),
            AnswerShape::ChoiceGrid => {
                r#"Reply with a JSON array of {"row": "...", "selectedColumn": "..."}, at most one entry per row, using the row and column labels verbatim."#
                    .to_string()
            }
            AnswerShape::CheckboxGrid => {
                r#"Reply with a JSON array of {"row": "...", "cols": [{"data": "..."}]}, at most one entry per row with at least one column, using the labels verbatim."#
                    .to_string()
            }
        }
    }

    /// System prompt for magic prompt generation
    pub fn magic_prompt_system() -> &'static str {
        r#"Analyze all questions and create a comprehensive expert role that covers all domains:
"You are an expert specializing in [list all domains based on frequency]. As a multidisciplinary professional with deep knowledge across these fields, you serve as [list relevant roles]. Your extensive experience covers [list key specialties from all domains]. Provide accurate and detailed answers drawing from your comprehensive expertise."
Count and incorporate ALL question domains to ensure comprehensive expertise."#
    }

    /// User prompt asking for a system prompt tailored to `questions`
    pub fn magic_prompt_request(questions: &[String]) -> String {
        let listed = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Analyze these form questions and generate an optimal system prompt.

Questions:
{}

Requirements:
1. Detect the subject area and context
2. Determine the appropriate expertise level
3. Generate a comprehensive system prompt

Reply with JSON only:
{{
  "subject_context": "detected subject/domain of the form",
  "expertise_level": "required expertise level for responses",
  "system_prompt": "generated system prompt for the context"
}}"#,
            listed
        )
    }
}

fn list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("\"{}\"", s.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn other_hint(field_type: FieldType) -> &'static str {
    if field_type.allows_other() {
        r#" If no option fits, use {"isOther": true, "otherOptionValue": "..."} instead."#
    } else {
        ""
    }
}
