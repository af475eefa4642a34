//! Extracted representation of one form field

use serde::{Deserialize, Serialize};

/// Opaque reference to the UI element a field was extracted from.
///
/// Owned by the host's extractor/filler; the core only carries it around
/// so the filler can find its way back to the widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldHandle(String);

impl FieldHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted field context (Value Object)
///
/// `options` holds choice labels (or scale points for linear scales),
/// `rows` and `columns` hold grid labels. Unused collections stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub handle: FieldHandle,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl FieldValue {
    pub fn new(handle: FieldHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
            description: None,
            options: Vec::new(),
            rows: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_grid<R, C, S, T>(mut self, rows: R, columns: C) -> Self
    where
        R: IntoIterator<Item = S>,
        C: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.rows = rows.into_iter().map(Into::into).collect();
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.option_label(label).is_some()
    }

    pub fn has_row(&self, label: &str) -> bool {
        self.row_label(label).is_some()
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.column_label(label).is_some()
    }

    /// The declared option matching `label`, ignoring surrounding whitespace
    pub fn option_label(&self, label: &str) -> Option<&str> {
        find_label(&self.options, label)
    }

    pub fn row_label(&self, label: &str) -> Option<&str> {
        find_label(&self.rows, label)
    }

    pub fn column_label(&self, label: &str) -> Option<&str> {
        find_label(&self.columns, label)
    }

    /// Numeric bounds of a linear scale, taken from the integral options.
    ///
    /// Returns `None` when no option parses as an integer.
    pub fn scale_bounds(&self) -> Option<(i64, i64)> {
        let points: Vec<i64> = self
            .options
            .iter()
            .filter_map(|o| o.trim().parse::<i64>().ok())
            .collect();
        let min = points.iter().copied().min()?;
        let max = points.iter().copied().max()?;
        Some((min, max))
    }
}

fn find_label<'a>(labels: &'a [String], label: &str) -> Option<&'a str> {
    let label = label.trim();
    labels
        .iter()
        .find(|l| l.trim() == label)
        .map(String::as_str)
}
