//! Form widget categories

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Category of a form widget (Value Object)
///
/// Decides which answer shape a provider must produce, which validation
/// rule applies and which merge strategy reconciles several answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Paragraph,
    Email,
    Url,
    Dropdown,
    Date,
    Time,
    DateAndTime,
    DateTimeWithoutYear,
    DateTimeWithMeridiem,
    DateTimeWithMeridiemWithoutYear,
    DateWithoutYear,
    TimeWithMeridiem,
    Duration,
    LinearScale,
    MultipleChoice,
    MultipleChoiceWithOther,
    MultiCorrect,
    MultiCorrectWithOther,
    MultipleChoiceGrid,
    CheckboxGrid,
}

/// The answer shape a field type expects.
///
/// Several field types share a shape; this is the single place the
/// many-to-one mapping lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerShape {
    Text,
    Generic,
    Date,
    LinearScale,
    SingleOption,
    MultiOption,
    ChoiceGrid,
    CheckboxGrid,
}

/// Granularity of a date/time answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGranularity {
    Date,
    Time,
    DateTime,
}

impl FieldType {
    pub const ALL: [FieldType; 21] = [
        FieldType::Text,
        FieldType::Paragraph,
        FieldType::Email,
        FieldType::Url,
        FieldType::Dropdown,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateAndTime,
        FieldType::DateTimeWithoutYear,
        FieldType::DateTimeWithMeridiem,
        FieldType::DateTimeWithMeridiemWithoutYear,
        FieldType::DateWithoutYear,
        FieldType::TimeWithMeridiem,
        FieldType::Duration,
        FieldType::LinearScale,
        FieldType::MultipleChoice,
        FieldType::MultipleChoiceWithOther,
        FieldType::MultiCorrect,
        FieldType::MultiCorrectWithOther,
        FieldType::MultipleChoiceGrid,
        FieldType::CheckboxGrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Paragraph => "paragraph",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Dropdown => "dropdown",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateAndTime => "date_and_time",
            FieldType::DateTimeWithoutYear => "date_time_without_year",
            FieldType::DateTimeWithMeridiem => "date_time_with_meridiem",
            FieldType::DateTimeWithMeridiemWithoutYear => "date_time_with_meridiem_without_year",
            FieldType::DateWithoutYear => "date_without_year",
            FieldType::TimeWithMeridiem => "time_with_meridiem",
            FieldType::Duration => "duration",
            FieldType::LinearScale => "linear_scale",
            FieldType::MultipleChoice => "multiple_choice",
            FieldType::MultipleChoiceWithOther => "multiple_choice_with_other",
            FieldType::MultiCorrect => "multi_correct",
            FieldType::MultiCorrectWithOther => "multi_correct_with_other",
            FieldType::MultipleChoiceGrid => "multiple_choice_grid",
            FieldType::CheckboxGrid => "checkbox_grid",
        }
    }

    /// The answer shape providers must produce for this field type
    pub fn shape(&self) -> AnswerShape {
        match self {
            FieldType::Text | FieldType::Paragraph => AnswerShape::Text,
            FieldType::Email | FieldType::Url | FieldType::Dropdown => AnswerShape::Generic,
            FieldType::Date
            | FieldType::Time
            | FieldType::DateAndTime
            | FieldType::DateTimeWithoutYear
            | FieldType::DateTimeWithMeridiem
            | FieldType::DateTimeWithMeridiemWithoutYear
            | FieldType::DateWithoutYear
            | FieldType::TimeWithMeridiem
            | FieldType::Duration => AnswerShape::Date,
            FieldType::LinearScale => AnswerShape::LinearScale,
            FieldType::MultipleChoice | FieldType::MultipleChoiceWithOther => {
                AnswerShape::SingleOption
            }
            FieldType::MultiCorrect | FieldType::MultiCorrectWithOther => AnswerShape::MultiOption,
            FieldType::MultipleChoiceGrid => AnswerShape::ChoiceGrid,
            FieldType::CheckboxGrid => AnswerShape::CheckboxGrid,
        }
    }

    /// Granularity of the date/time value, `None` for non-date fields
    pub fn date_granularity(&self) -> Option<DateGranularity> {
        match self {
            FieldType::Date | FieldType::DateWithoutYear => Some(DateGranularity::Date),
            FieldType::Time | FieldType::TimeWithMeridiem | FieldType::Duration => {
                Some(DateGranularity::Time)
            }
            FieldType::DateAndTime
            | FieldType::DateTimeWithoutYear
            | FieldType::DateTimeWithMeridiem
            | FieldType::DateTimeWithMeridiemWithoutYear => Some(DateGranularity::DateTime),
            _ => None,
        }
    }

    /// Whether a free-form "Other" entry is a legal answer
    pub fn allows_other(&self) -> bool {
        matches!(
            self,
            FieldType::MultipleChoiceWithOther | FieldType::MultiCorrectWithOther
        )
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, FieldType::MultipleChoiceGrid | FieldType::CheckboxGrid)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| DomainError::UnknownFieldType(s.to_string()))
    }
}
