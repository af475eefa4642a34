//! Provider trust weights
//!
//! The [`WeightTable`] keeps one weight per provider in configuration order
//! and normalizes them so the active (non-zero) weights form a distribution.

use crate::core::provider::ProviderId;
use serde::Serialize;

/// Tolerance under which a weight sum counts as already normalized
pub const NORMALIZED_TOLERANCE: f64 = 1e-10;

/// Normalized per-provider trust weights
///
/// Entries keep insertion order, which is also the fan-out order and the
/// tie-break order for merging.
///
/// # Example
///
/// ```
/// use docfiller_domain::{ProviderId, WeightTable};
///
/// let mut table = WeightTable::new();
/// table.set([(ProviderId::Gpt5, 3.0), (ProviderId::Gemini, 1.0)]);
/// table.normalize();
///
/// assert_eq!(table.get(&ProviderId::Gpt5), Some(0.75));
/// assert_eq!(table.get(&ProviderId::Gemini), Some(0.25));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightTable {
    entries: Vec<(ProviderId, f64)>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equal weights over `providers`, normalized
    pub fn uniform(providers: impl IntoIterator<Item = ProviderId>) -> Self {
        let mut table = Self::new();
        table.set(providers.into_iter().map(|p| (p, 1.0)));
        table.normalize();
        table
    }

    /// Insert or overwrite weights.
    ///
    /// Existing providers keep their position; new ones are appended.
    /// Negative and non-finite inputs are stored as 0, which excludes the
    /// provider from fan-out until it is reweighted. Does not normalize.
    pub fn set(&mut self, weights: impl IntoIterator<Item = (ProviderId, f64)>) {
        for (provider, weight) in weights {
            let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
            match self.entries.iter_mut().find(|(p, _)| *p == provider) {
                Some(entry) => entry.1 = weight,
                None => self.entries.push((provider, weight)),
            }
        }
    }

    /// Rescale weights so the active ones sum to 1.
    ///
    /// Leaves the table untouched when it is already normalized or when no
    /// weight is positive. Idempotent.
    pub fn normalize(&mut self) {
        let sum = self.total();
        if (sum - 1.0).abs() < NORMALIZED_TOLERANCE {
            return;
        }

        let non_zero = self.entries.iter().filter(|(_, w)| *w > 0.0).count();
        if non_zero == 0 {
            return;
        }

        if sum == 0.0 {
            let equal = 1.0 / non_zero as f64;
            for (_, weight) in &mut self.entries {
                if *weight > 0.0 {
                    *weight = equal;
                }
            }
            return;
        }

        let scale = 1.0 / sum;
        for (_, weight) in &mut self.entries {
            *weight = (*weight * scale).max(0.0);
        }
    }

    pub fn get(&self, provider: &ProviderId) -> Option<f64> {
        self.entries
            .iter()
            .find(|(p, _)| p == provider)
            .map(|(_, w)| *w)
    }

    /// Position of a provider in configuration order
    pub fn position(&self, provider: &ProviderId) -> Option<usize> {
        self.entries.iter().position(|(p, _)| p == provider)
    }

    /// All entries in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&ProviderId, f64)> {
        self.entries.iter().map(|(p, w)| (p, *w))
    }

    /// Entries with a weight above zero, in configuration order
    pub fn active(&self) -> impl Iterator<Item = (&ProviderId, f64)> {
        self.iter().filter(|(_, w)| *w > 0.0)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(ProviderId, f64)> for WeightTable {
    fn from_iter<I: IntoIterator<Item = (ProviderId, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.set(iter);
        table
    }
}
