use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::ops::Index;
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::model::{BinderMeasure, BindingPrediction};

/// Percentile-rank cutoff conventionally taken to mean "strong binder"
/// when no measure-specific threshold is in play.
pub const DEFAULT_MAX_RANK: f64 = 2.0;

// ---------------------------------------------------------------------------
// RankedCollection – the query surface, closed under transformation
// ---------------------------------------------------------------------------

/// A ranked, deduplicated sequence of binding predictions.
///
/// Every transform (`filter`, `strong_binders`, `groupby`, ...) constructs
/// its result through `Self::from_records`, so types wrapping or extending
/// [`EpitopeCollection`] stay themselves through a whole chain of
/// transforms instead of decaying to the base type. Implementors provide
/// the constructor and raw access; everything else is derived.
pub trait RankedCollection: Clone + Sized {
    /// Build a collection from any iterable of predictions. Duplicates
    /// (by value equality) collapse; the result is sorted ascending by
    /// `percentile_rank` (lower rank = stronger binder, first). The
    /// relative order of equal-rank elements is not guaranteed.
    fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = BindingPrediction>;

    /// The stored predictions, rank-ascending.
    fn records(&self) -> &[BindingPrediction];

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Iterate in stored (rank-ascending) order. Restartable: call as
    /// often as needed.
    fn iter(&self) -> std::slice::Iter<'_, BindingPrediction> {
        self.records().iter()
    }

    /// Element at `idx`, or `None` when out of range. Panicking access is
    /// available via `Index` on the concrete type.
    fn get(&self, idx: usize) -> Option<&BindingPrediction> {
        self.records().get(idx)
    }

    /// Keep only predictions satisfying `pred`, preserving order. Panics
    /// raised by the predicate propagate to the caller.
    fn filter<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&BindingPrediction) -> bool,
    {
        Self::from_records(self.iter().filter(|p| pred(p)).cloned())
    }

    /// Predictions whose measure classifies them as binders. With no
    /// `threshold` each prediction's measure applies its own default; the
    /// default is measure-relative because no single cutoff makes sense
    /// across affinity and stability scales at once.
    ///
    /// An empty collection is returned as-is without consulting any
    /// measure.
    fn strong_binders(&self, threshold: Option<f64>) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        self.filter(|p| p.measure.is_binder(p.value, threshold))
    }

    /// Measure-agnostic notion of "strong": keep predictions with
    /// `percentile_rank <= max_rank`. See [`DEFAULT_MAX_RANK`].
    fn strong_binders_by_rank(&self, max_rank: f64) -> Self {
        self.filter(|p| p.percentile_rank <= max_rank)
    }

    /// Partition by `key_fn`. Every element lands in exactly one group;
    /// each group keeps its relative rank order and has the same concrete
    /// type as the receiver. Key iteration order is unspecified.
    fn groupby<K, F>(&self, mut key_fn: F) -> HashMap<K, Self>
    where
        K: Eq + Hash,
        F: FnMut(&BindingPrediction) -> K,
    {
        let mut groups: HashMap<K, Vec<BindingPrediction>> = HashMap::new();
        for p in self.iter() {
            groups.entry(key_fn(p)).or_default().push(p.clone());
        }
        groups
            .into_iter()
            .map(|(key, members)| (key, Self::from_records(members)))
            .collect()
    }

    fn groupby_allele(&self) -> HashMap<String, Self> {
        self.groupby(|p| p.allele.clone())
    }

    fn groupby_peptide(&self) -> HashMap<String, Self> {
        self.groupby(|p| p.peptide.clone())
    }

    fn groupby_allele_and_peptide(&self) -> HashMap<(String, String), Self> {
        self.groupby(|p| (p.allele.clone(), p.peptide.clone()))
    }

    /// Project the collection into an Arrow [`RecordBatch`]: one column
    /// per [`BindingPrediction`] field, named and ordered exactly per
    /// [`BindingPrediction::FIELD_NAMES`], one row per element in stored
    /// order. The `measure` column holds the measure's display name.
    ///
    /// This is the sole bridge to tabular/analysis tooling.
    fn dataframe(&self) -> Result<RecordBatch, ArrowError> {
        let peptides: StringArray = self.iter().map(|p| Some(p.peptide.as_str())).collect();
        let alleles: StringArray = self.iter().map(|p| Some(p.allele.as_str())).collect();
        let measures: StringArray = self.iter().map(|p| Some(p.measure.name())).collect();
        let values: Float64Array = self.iter().map(|p| Some(p.value)).collect();
        let ranks: Float64Array = self.iter().map(|p| Some(p.percentile_rank)).collect();

        let [peptide, allele, measure, value, percentile_rank] = BindingPrediction::FIELD_NAMES;
        let schema = Arc::new(Schema::new(vec![
            Field::new(peptide, DataType::Utf8, false),
            Field::new(allele, DataType::Utf8, false),
            Field::new(measure, DataType::Utf8, false),
            Field::new(value, DataType::Float64, false),
            Field::new(percentile_rank, DataType::Float64, false),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(peptides),
                Arc::new(alleles),
                Arc::new(measures),
                Arc::new(values),
                Arc::new(ranks),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// EpitopeCollection – the concrete collection
// ---------------------------------------------------------------------------

/// The standard ranked collection of binding predictions. Logically
/// immutable after construction: every transform returns a new instance,
/// so a constructed collection can be shared read-only freely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpitopeCollection {
    predictions: Vec<BindingPrediction>,
}

impl RankedCollection for EpitopeCollection {
    fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = BindingPrediction>,
    {
        let mut seen = HashSet::new();
        let mut predictions: Vec<BindingPrediction> = records
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        // Stable sort: equal ranks keep first-seen input order. Callers
        // must not rely on the tie order.
        predictions.sort_by(|a, b| a.percentile_rank.total_cmp(&b.percentile_rank));
        Self { predictions }
    }

    fn records(&self) -> &[BindingPrediction] {
        &self.predictions
    }
}

impl FromIterator<BindingPrediction> for EpitopeCollection {
    fn from_iter<I: IntoIterator<Item = BindingPrediction>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

/// Panics when `idx >= len`, like slice indexing.
impl Index<usize> for EpitopeCollection {
    type Output = BindingPrediction;

    fn index(&self, idx: usize) -> &BindingPrediction {
        &self.predictions[idx]
    }
}

impl<'a> IntoIterator for &'a EpitopeCollection {
    type Item = &'a BindingPrediction;
    type IntoIter = std::slice::Iter<'a, BindingPrediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.predictions.iter()
    }
}

impl IntoIterator for EpitopeCollection {
    type Item = BindingPrediction;
    type IntoIter = std::vec::IntoIter<BindingPrediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.predictions.into_iter()
    }
}

impl fmt::Display for EpitopeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<EpitopeCollection with {} elements>", self.len())
    }
}
