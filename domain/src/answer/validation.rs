//! Answer validation
//!
//! Structural conformance of an answer to the field it is meant for.
//! Validation is pure: it never mutates its input and never fails loudly;
//! an answer that does not fit is simply invalid.

use super::payload::{AnswerPayload, GridRowSelections, GridSelection, OptionChoice};
use super::raw::RawAnswer;
use crate::field::{FieldType, FieldValue};
use std::collections::HashSet;

/// Stateless validator for answers against field context
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerValidator;

impl AnswerValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a raw provider answer against the field
    pub fn validate_raw(&self, field_type: FieldType, field: &FieldValue, raw: &RawAnswer) -> bool {
        self.accept(field_type, field, raw).is_some()
    }

    /// Decode and validate a raw answer, returning the typed payload if it fits.
    ///
    /// Option, row and column labels in the returned payload are the field's
    /// declared labels, so accepted answers naming the same label compare equal.
    pub fn accept(
        &self,
        field_type: FieldType,
        field: &FieldValue,
        raw: &RawAnswer,
    ) -> Option<AnswerPayload> {
        let payload = canonicalize(field_type, field, AnswerPayload::decode(field_type, raw)?);
        self.validate(field_type, field, &payload).then_some(payload)
    }

    /// Check a typed answer against the field
    pub fn validate(&self, field_type: FieldType, field: &FieldValue, answer: &AnswerPayload) -> bool {
        if answer.shape() != field_type.shape() {
            return false;
        }

        match answer {
            AnswerPayload::Text(text) => !text.trim().is_empty(),
            AnswerPayload::Generic(value) => match field_type {
                FieldType::Email => is_email(value),
                FieldType::Url => is_url(value),
                FieldType::Dropdown => field.has_option(value),
                _ => !value.trim().is_empty(),
            },
            // Decoding already enforced the granularity
            AnswerPayload::Date(_) => true,
            AnswerPayload::LinearScale(score) => match field.scale_bounds() {
                Some((min, max)) => (min..=max).contains(score),
                None => true,
            },
            AnswerPayload::SingleOption(choice) => valid_choice(field_type, field, choice),
            AnswerPayload::MultiOption(choices) => {
                let mut seen = HashSet::new();
                !choices.is_empty()
                    && choices
                        .iter()
                        .all(|c| valid_choice(field_type, field, c) && seen.insert(c))
            }
            AnswerPayload::ChoiceGrid(rows) => valid_choice_grid(field, rows),
            AnswerPayload::CheckboxGrid(rows) => valid_checkbox_grid(field, rows),
        }
    }
}

/// Rewrite labels that match a declared label to that label. Unknown labels
/// are left alone for validation to reject.
fn canonicalize(field_type: FieldType, field: &FieldValue, payload: AnswerPayload) -> AnswerPayload {
    let declared = |found: Option<&str>, label: String| found.map(str::to_string).unwrap_or(label);
    let choice = |choice: OptionChoice| match choice {
        OptionChoice::Listed(label) => {
            OptionChoice::Listed(declared(field.option_label(&label), label))
        }
        other => other,
    };

    match payload {
        AnswerPayload::Generic(value) if field_type == FieldType::Dropdown => {
            AnswerPayload::Generic(declared(field.option_label(&value), value))
        }
        AnswerPayload::SingleOption(c) => AnswerPayload::SingleOption(choice(c)),
        AnswerPayload::MultiOption(choices) => {
            AnswerPayload::MultiOption(choices.into_iter().map(choice).collect())
        }
        AnswerPayload::ChoiceGrid(rows) => AnswerPayload::ChoiceGrid(
            rows.into_iter()
                .map(|r| GridSelection {
                    row: declared(field.row_label(&r.row), r.row),
                    column: declared(field.column_label(&r.column), r.column),
                })
                .collect(),
        ),
        AnswerPayload::CheckboxGrid(rows) => AnswerPayload::CheckboxGrid(
            rows.into_iter()
                .map(|r| {
                    let mut columns: Vec<String> = Vec::with_capacity(r.columns.len());
                    for column in r.columns {
                        let column = declared(field.column_label(&column), column);
                        if !columns.contains(&column) {
                            columns.push(column);
                        }
                    }
                    GridRowSelections {
                        row: declared(field.row_label(&r.row), r.row),
                        columns,
                    }
                })
                .collect(),
        ),
        other => other,
    }
}

fn valid_choice(field_type: FieldType, field: &FieldValue, choice: &OptionChoice) -> bool {
    match choice {
        OptionChoice::Listed(label) => field.has_option(label),
        OptionChoice::Other(text) => field_type.allows_other() && !text.trim().is_empty(),
    }
}

fn valid_choice_grid(field: &FieldValue, rows: &[GridSelection]) -> bool {
    let mut seen = HashSet::new();
    !rows.is_empty()
        && rows.iter().all(|r| {
            field.has_row(&r.row) && field.has_column(&r.column) && seen.insert(r.row.trim())
        })
}

fn valid_checkbox_grid(field: &FieldValue, rows: &[GridRowSelections]) -> bool {
    let mut seen = HashSet::new();
    !rows.is_empty()
        && rows.iter().all(|r| {
            field.has_row(&r.row)
                && seen.insert(r.row.trim())
                && !r.columns.is_empty()
                && r.columns.iter().all(|c| field.has_column(c))
        })
}

fn is_email(value: &str) -> bool {
    let value = value.trim();
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !value.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn is_url(value: &str) -> bool {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldHandle;
    use serde_json::json;

    fn field(title: &str) -> FieldValue {
        FieldValue::new(FieldHandle::new("f"), title)
    }

    fn listed(s: &str) -> OptionChoice {
        OptionChoice::Listed(s.to_string())
    }

    #[test]
    fn test_shape_mismatch_is_invalid() {
        let v = AnswerValidator::new();
        assert!(!v.validate(
            FieldType::Text,
            &field("Name"),
            &AnswerPayload::LinearScale(3)
        ));
    }

    #[test]
    fn test_text_rules() {
        let v = AnswerValidator::new();
        let f = field("Name");
        assert!(v.validate(FieldType::Text, &f, &AnswerPayload::Text("Ada".into())));
        assert!(!v.validate(FieldType::Text, &f, &AnswerPayload::Text("   ".into())));
    }

    #[test]
    fn test_generic_rules() {
        let v = AnswerValidator::new();
        let f = field("Contact").with_options(["Mail", "Phone"]);
        let generic = |s: &str| AnswerPayload::Generic(s.to_string());

        assert!(v.validate(FieldType::Email, &f, &generic("ada@example.com")));
        assert!(!v.validate(FieldType::Email, &f, &generic("ada@localhost")));
        assert!(!v.validate(FieldType::Email, &f, &generic("a@b@c.com")));
        assert!(v.validate(FieldType::Url, &f, &generic("https://example.com/x")));
        assert!(!v.validate(FieldType::Url, &f, &generic("example.com")));
        assert!(v.validate(FieldType::Dropdown, &f, &generic("Phone")));
        assert!(!v.validate(FieldType::Dropdown, &f, &generic("Fax")));
    }

    #[test]
    fn test_linear_scale_bounds() {
        let v = AnswerValidator::new();
        let f = field("Rate us").with_options(["1", "2", "3", "4", "5"]);
        assert!(v.validate(FieldType::LinearScale, &f, &AnswerPayload::LinearScale(5)));
        assert!(!v.validate(FieldType::LinearScale, &f, &AnswerPayload::LinearScale(6)));
    }

    #[test]
    fn test_single_choice_must_exist() {
        let v = AnswerValidator::new();
        let f = field("Pick").with_options(["A", "B"]);
        let one = |c| AnswerPayload::SingleOption(c);

        assert!(v.validate(FieldType::MultipleChoice, &f, &one(listed("A"))));
        assert!(!v.validate(FieldType::MultipleChoice, &f, &one(listed("Z"))));
        assert!(!v.validate(
            FieldType::MultipleChoice,
            &f,
            &one(OptionChoice::Other("Z".into()))
        ));
        assert!(v.validate(
            FieldType::MultipleChoiceWithOther,
            &f,
            &one(OptionChoice::Other("Z".into()))
        ));
        assert!(!v.validate(
            FieldType::MultipleChoiceWithOther,
            &f,
            &one(OptionChoice::Other(" ".into()))
        ));
    }

    #[test]
    fn test_multi_choice_rejects_empty_and_duplicates() {
        let v = AnswerValidator::new();
        let f = field("Pick many").with_options(["A", "B"]);
        let many = |c: Vec<OptionChoice>| AnswerPayload::MultiOption(c);

        assert!(v.validate(FieldType::MultiCorrect, &f, &many(vec![listed("A"), listed("B")])));
        assert!(!v.validate(FieldType::MultiCorrect, &f, &many(vec![])));
        assert!(!v.validate(FieldType::MultiCorrect, &f, &many(vec![listed("A"), listed("A")])));
    }

    #[test]
    fn test_grid_rows_must_be_declared() {
        let v = AnswerValidator::new();
        let f = field("Grid").with_grid(["R1", "R2"], ["C1", "C2"]);
        let sel = |r: &str, c: &str| GridSelection {
            row: r.into(),
            column: c.into(),
        };

        assert!(v.validate(
            FieldType::MultipleChoiceGrid,
            &f,
            &AnswerPayload::ChoiceGrid(vec![sel("R1", "C2"), sel("R2", "C1")])
        ));
        assert!(!v.validate(
            FieldType::MultipleChoiceGrid,
            &f,
            &AnswerPayload::ChoiceGrid(vec![sel("R3", "C1")])
        ));
        assert!(!v.validate(
            FieldType::MultipleChoiceGrid,
            &f,
            &AnswerPayload::ChoiceGrid(vec![sel("R1", "C1"), sel("R1", "C2")])
        ));
        assert!(!v.validate(
            FieldType::CheckboxGrid,
            &f,
            &AnswerPayload::CheckboxGrid(vec![GridRowSelections {
                row: "R1".into(),
                columns: vec!["C1".into(), "C9".into()],
            }])
        ));
    }

    #[test]
    fn test_accept_uses_declared_labels() {
        let v = AnswerValidator::new();
        let f = field("Rate").with_grid(["Food ", "Service"], ["Good", "Bad"]);

        let answer = v.accept(
            FieldType::MultipleChoiceGrid,
            &f,
            &RawAnswer::new(json!([{"row": "Food", "selectedColumn": " Good"}])),
        );
        assert_eq!(
            answer,
            Some(AnswerPayload::ChoiceGrid(vec![GridSelection {
                row: "Food ".into(),
                column: "Good".into(),
            }]))
        );

        let options = field("Pick").with_options(["Red", "Blue"]);
        let multi = v.accept(
            FieldType::MultiCorrect,
            &options,
            &RawAnswer::new(json!(["Red", "Red "])),
        );
        assert_eq!(multi, None);
    }

    #[test]
    fn test_validate_raw_never_panics_on_garbage() {
        let v = AnswerValidator::new();
        let f = field("Anything").with_grid(["R"], ["C"]);
        for field_type in FieldType::ALL {
            for garbage in [json!(null), json!({}), json!([1, 2]), json!(true)] {
                assert!(!v.validate_raw(field_type, &f, &RawAnswer::new(garbage)));
            }
        }
    }
}
