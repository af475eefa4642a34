//! Typed answer shapes
//!
//! [`AnswerPayload`] is the sum type over every answer shape a field can
//! take. Raw provider output is decoded into it once, at the boundary, so
//! validation and merging match on variants instead of poking at JSON.

use crate::field::{AnswerShape, DateGranularity, FieldType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::raw::RawAnswer;

/// One selected option of a choice field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionChoice {
    /// One of the field's declared options
    Listed(String),
    /// Free-form text for the "Other" option
    Other(String),
}

impl OptionChoice {
    pub fn text(&self) -> &str {
        match self {
            OptionChoice::Listed(s) | OptionChoice::Other(s) => s,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, OptionChoice::Other(_))
    }
}

/// A date and/or time answer, projected to the field's granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DateAnswer {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl DateAnswer {
    /// Parse an ISO-like string and project it onto `granularity`.
    ///
    /// A full date-time satisfies any granularity; a bare date or bare time
    /// only satisfies its own.
    pub fn parse(text: &str, granularity: DateGranularity) -> Option<Self> {
        let parsed = parse_temporal(text.trim())?;
        match (granularity, parsed) {
            (DateGranularity::Date, Temporal::DateTime(dt)) => Some(DateAnswer::Date(dt.date())),
            (DateGranularity::Date, Temporal::Date(d)) => Some(DateAnswer::Date(d)),
            (DateGranularity::Time, Temporal::DateTime(dt)) => Some(DateAnswer::Time(dt.time())),
            (DateGranularity::Time, Temporal::Time(t)) => Some(DateAnswer::Time(t)),
            (DateGranularity::DateTime, Temporal::DateTime(dt)) => Some(DateAnswer::DateTime(dt)),
            _ => None,
        }
    }
}

impl std::fmt::Display for DateAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateAnswer::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateAnswer::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            DateAnswer::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

fn parse_temporal(text: &str) -> Option<Temporal> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::DateTime(dt.naive_local()));
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Temporal::DateTime(dt));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Temporal::Date(d));
    }
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(text, fmt) {
            return Some(Temporal::Time(t));
        }
    }
    None
}

/// A choice-grid row and the single column picked for it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSelection {
    pub row: String,
    pub column: String,
}

/// A checkbox-grid row and every column ticked for it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRowSelections {
    pub row: String,
    pub columns: Vec<String>,
}

/// A typed answer for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerPayload {
    Text(String),
    /// Email, URL and dropdown answers
    Generic(String),
    Date(DateAnswer),
    LinearScale(i64),
    SingleOption(OptionChoice),
    MultiOption(Vec<OptionChoice>),
    ChoiceGrid(Vec<GridSelection>),
    CheckboxGrid(Vec<GridRowSelections>),
}

impl AnswerPayload {
    /// Decode a raw provider answer into the shape `field_type` expects.
    ///
    /// Returns `None` for anything that does not have that shape; this is
    /// never an error.
    pub fn decode(field_type: FieldType, raw: &RawAnswer) -> Option<Self> {
        let value = raw.value();
        match field_type.shape() {
            AnswerShape::Text => answer_string(value).map(AnswerPayload::Text),
            AnswerShape::Generic => answer_string(value).map(AnswerPayload::Generic),
            AnswerShape::Date => {
                let granularity = field_type.date_granularity()?;
                let text = answer_string(value)?;
                DateAnswer::parse(&text, granularity).map(AnswerPayload::Date)
            }
            AnswerShape::LinearScale => answer_integer(value).map(AnswerPayload::LinearScale),
            AnswerShape::SingleOption => decode_option(value).map(AnswerPayload::SingleOption),
            AnswerShape::MultiOption => value
                .as_array()?
                .iter()
                .map(decode_option)
                .collect::<Option<Vec<_>>>()
                .map(AnswerPayload::MultiOption),
            AnswerShape::ChoiceGrid => {
                let rows: Vec<WireChoiceRow> = serde_json::from_value(value.clone()).ok()?;
                Some(AnswerPayload::ChoiceGrid(
                    rows.into_iter()
                        .map(|r| GridSelection {
                            row: r.row,
                            column: r.selected_column,
                        })
                        .collect(),
                ))
            }
            AnswerShape::CheckboxGrid => {
                let rows: Vec<WireCheckboxRow> = serde_json::from_value(value.clone()).ok()?;
                Some(AnswerPayload::CheckboxGrid(
                    rows.into_iter()
                        .map(|r| GridRowSelections {
                            row: r.row,
                            columns: r.cols.into_iter().map(WireColumn::into_label).collect(),
                        })
                        .collect(),
                ))
            }
        }
    }

    /// The shape this payload has
    pub fn shape(&self) -> AnswerShape {
        match self {
            AnswerPayload::Text(_) => AnswerShape::Text,
            AnswerPayload::Generic(_) => AnswerShape::Generic,
            AnswerPayload::Date(_) => AnswerShape::Date,
            AnswerPayload::LinearScale(_) => AnswerShape::LinearScale,
            AnswerPayload::SingleOption(_) => AnswerShape::SingleOption,
            AnswerPayload::MultiOption(_) => AnswerShape::MultiOption,
            AnswerPayload::ChoiceGrid(_) => AnswerShape::ChoiceGrid,
            AnswerPayload::CheckboxGrid(_) => AnswerShape::CheckboxGrid,
        }
    }
}

/// A plain string, or the `answer` member of an object
fn answer_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("answer").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn answer_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("answer").and_then(answer_integer),
        _ => None,
    }
}

fn decode_option(value: &Value) -> Option<OptionChoice> {
    if let Value::String(s) = value {
        return Some(OptionChoice::Listed(s.clone()));
    }
    let wire: WireOption = serde_json::from_value(value.clone()).ok()?;
    if wire.is_other.unwrap_or(false) {
        return Some(OptionChoice::Other(wire.other_option_value.unwrap_or_default()));
    }
    wire.option_text.map(OptionChoice::Listed)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOption {
    option_text: Option<String>,
    is_other: Option<bool>,
    other_option_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChoiceRow {
    row: String,
    selected_column: String,
}

#[derive(Deserialize)]
struct WireCheckboxRow {
    row: String,
    cols: Vec<WireColumn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireColumn {
    Label(String),
    Tagged { data: String },
}

impl WireColumn {
    fn into_label(self) -> String {
        match self {
            WireColumn::Label(s) | WireColumn::Tagged { data: s } => s,
        }
    }
}
