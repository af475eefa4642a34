//! Weighted merge strategies
//!
//! Reconciles the candidate answers of one round into a single answer.
//! Candidates are expected in configuration order: every "first seen" tie
//! break below relies on it. Labels are compared exactly, so candidates
//! should carry the field's declared labels as produced by
//! [`AnswerValidator::accept`](crate::answer::AnswerValidator::accept).
//!
//! | Shape | Strategy |
//! |-------|----------|
//! | text, generic, date, single option | heaviest group of equal values |
//! | linear scale | weighted mean, rounded and clamped to the scale |
//! | multi option | options backed by more than half the responding weight |
//! | grids | the above, row by row |

use super::candidate::CandidateAnswer;
use crate::answer::{AnswerPayload, GridRowSelections, GridSelection};
use crate::field::{AnswerShape, FieldType, FieldValue};

/// Weight differences below this are treated as ties
pub const TIE_EPSILON: f64 = 1e-9;

/// Share of the responding weight an option must exceed to be selected
pub const MAJORITY_SHARE: f64 = 0.5;

/// Merge candidate answers for a field into one consensus answer.
///
/// Returns `None` when there are no candidates of the field's shape.
pub fn merge(
    field_type: FieldType,
    field: &FieldValue,
    candidates: &[CandidateAnswer],
) -> Option<AnswerPayload> {
    match field_type.shape() {
        AnswerShape::Text => plurality(candidates.iter().filter_map(|c| match &c.value {
            AnswerPayload::Text(s) => Some((s.clone(), c.weight)),
            _ => None,
        }))
        .map(AnswerPayload::Text),
        AnswerShape::Generic => plurality(candidates.iter().filter_map(|c| match &c.value {
            AnswerPayload::Generic(s) => Some((s.clone(), c.weight)),
            _ => None,
        }))
        .map(AnswerPayload::Generic),
        AnswerShape::Date => plurality(candidates.iter().filter_map(|c| match &c.value {
            AnswerPayload::Date(d) => Some((*d, c.weight)),
            _ => None,
        }))
        .map(AnswerPayload::Date),
        AnswerShape::SingleOption => plurality(candidates.iter().filter_map(|c| match &c.value {
            AnswerPayload::SingleOption(o) => Some((o.clone(), c.weight)),
            _ => None,
        }))
        .map(AnswerPayload::SingleOption),
        AnswerShape::LinearScale => {
            let votes: Vec<(i64, f64)> = candidates
                .iter()
                .filter_map(|c| match &c.value {
                    AnswerPayload::LinearScale(v) => Some((*v, c.weight)),
                    _ => None,
                })
                .collect();
            weighted_scale(&votes, field.scale_bounds()).map(AnswerPayload::LinearScale)
        }
        AnswerShape::MultiOption => {
            let ballots: Vec<_> = candidates
                .iter()
                .filter_map(|c| match &c.value {
                    AnswerPayload::MultiOption(options) => Some((options.clone(), c.weight)),
                    _ => None,
                })
                .collect();
            let selected = majority_set(&ballots);
            (!selected.is_empty()).then_some(AnswerPayload::MultiOption(selected))
        }
        AnswerShape::ChoiceGrid => merge_choice_grid(field, candidates),
        AnswerShape::CheckboxGrid => merge_checkbox_grid(field, candidates),
    }
}

/// Cumulative weight per distinct value, in first-seen order
fn tally<T: PartialEq>(votes: impl IntoIterator<Item = (T, f64)>) -> Vec<(T, f64)> {
    let mut totals: Vec<(T, f64)> = Vec::new();
    for (value, weight) in votes {
        match totals.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 += weight,
            None => totals.push((value, weight)),
        }
    }
    totals
}

/// The heaviest entry; the earliest one wins a tie
fn heaviest<T>(entries: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for (value, weight) in entries {
        let replace = match &best {
            Some((_, best_weight)) => weight > *best_weight + TIE_EPSILON,
            None => true,
        };
        if replace {
            best = Some((value, weight));
        }
    }
    best.map(|(value, _)| value)
}

/// The value with the highest cumulative weight
fn plurality<T: PartialEq>(votes: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
    heaviest(tally(votes))
}

fn weighted_scale(votes: &[(i64, f64)], bounds: Option<(i64, i64)>) -> Option<i64> {
    if votes.is_empty() {
        return None;
    }

    let total: f64 = votes.iter().map(|(_, w)| w).sum();
    let mean = if total > 0.0 {
        votes.iter().map(|(v, w)| *v as f64 * w).sum::<f64>() / total
    } else {
        votes.iter().map(|(v, _)| *v as f64).sum::<f64>() / votes.len() as f64
    };

    let lower = mean.floor();
    let upper = mean.ceil();
    let rounded = if upper > lower && ((mean - lower) - 0.5).abs() < TIE_EPSILON {
        // Exactly between two points: side with the heavier supporters
        let support = |point: f64| -> f64 {
            votes
                .iter()
                .filter(|(v, _)| *v as f64 == point)
                .map(|(_, w)| w)
                .sum()
        };
        let (down, up) = (support(lower), support(upper));
        if up > down + TIE_EPSILON {
            upper
        } else if down > up + TIE_EPSILON {
            lower
        } else {
            mean.round()
        }
    } else {
        mean.round()
    };

    let score = rounded as i64;
    Some(match bounds {
        Some((min, max)) => score.clamp(min, max),
        None => score,
    })
}

/// Items backed by more than [`MAJORITY_SHARE`] of the ballots' weight.
///
/// Falls back to the single heaviest ballot when nothing crosses the
/// threshold.
fn majority_set<T: PartialEq + Clone>(ballots: &[(Vec<T>, f64)]) -> Vec<T> {
    let total: f64 = ballots.iter().map(|(_, w)| w).sum();
    let threshold = total * MAJORITY_SHARE;

    let support = tally(ballots.iter().flat_map(|(items, weight)| {
        items
            .iter()
            .enumerate()
            .filter(|(i, item)| !items[..*i].contains(item))
            .map(|(_, item)| (item.clone(), *weight))
    }));

    let selected: Vec<T> = support
        .into_iter()
        .filter(|(_, w)| *w - threshold > TIE_EPSILON)
        .map(|(item, _)| item)
        .collect();

    if !selected.is_empty() {
        return selected;
    }
    heaviest(ballots.iter().cloned()).unwrap_or_default()
}

/// Row labels in the field's declared order, unknown rows after them
fn ordered_rows<'a>(field: &FieldValue, seen: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut rows: Vec<&str> = Vec::new();
    for row in seen {
        if !rows.contains(&row) {
            rows.push(row);
        }
    }
    rows.sort_by_key(|row| {
        field
            .rows
            .iter()
            .position(|r| r == row)
            .unwrap_or(usize::MAX)
    });
    rows
}

fn merge_choice_grid(field: &FieldValue, candidates: &[CandidateAnswer]) -> Option<AnswerPayload> {
    let grids: Vec<(&[GridSelection], f64)> = candidates
        .iter()
        .filter_map(|c| match &c.value {
            AnswerPayload::ChoiceGrid(rows) => Some((rows.as_slice(), c.weight)),
            _ => None,
        })
        .collect();

    let rows = ordered_rows(
        field,
        grids.iter().flat_map(|(g, _)| g.iter().map(|s| s.row.as_str())),
    );

    let merged: Vec<GridSelection> = rows
        .into_iter()
        .filter_map(|row| {
            let votes = grids.iter().flat_map(|(g, weight)| {
                g.iter()
                    .filter(move |s| s.row == row)
                    .map(move |s| (s.column.clone(), *weight))
            });
            plurality(votes).map(|column| GridSelection {
                row: row.to_string(),
                column,
            })
        })
        .collect();

    (!merged.is_empty()).then_some(AnswerPayload::ChoiceGrid(merged))
}

fn merge_checkbox_grid(field: &FieldValue, candidates: &[CandidateAnswer]) -> Option<AnswerPayload> {
    let grids: Vec<(&[GridRowSelections], f64)> = candidates
        .iter()
        .filter_map(|c| match &c.value {
            AnswerPayload::CheckboxGrid(rows) => Some((rows.as_slice(), c.weight)),
            _ => None,
        })
        .collect();

    let rows = ordered_rows(
        field,
        grids.iter().flat_map(|(g, _)| g.iter().map(|s| s.row.as_str())),
    );

    let merged: Vec<GridRowSelections> = rows
        .into_iter()
        .filter_map(|row| {
            let ballots: Vec<(Vec<String>, f64)> = grids
                .iter()
                .flat_map(|(g, weight)| {
                    g.iter()
                        .filter(|s| s.row == row)
                        .map(|s| (s.columns.clone(), *weight))
                })
                .collect();
            let columns = majority_set(&ballots);
            (!columns.is_empty()).then(|| GridRowSelections {
                row: row.to_string(),
                columns,
            })
        })
        .collect();

    (!merged.is_empty()).then_some(AnswerPayload::CheckboxGrid(merged))
}
