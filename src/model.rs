use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Measure – how a prediction value is classified as binder / non-binder
// ---------------------------------------------------------------------------

/// Classification of a raw prediction value. The scale (and direction!) of
/// "binding" depends on what was measured: IC50 affinities bind when *low*,
/// stability half-lives bind when *high*. Selected at record construction
/// time, so the collection never hard-codes a threshold semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// IC50 binding affinity in nM. Lower is stronger.
    Affinity,
    /// Peptide-MHC complex half-life in hours. Higher is stronger.
    Stability,
}

/// Binder classification with an optional caller-supplied threshold.
/// There is no universal default: 500 nM is conventional for IC50 but
/// meaningless for a stability scale, so each measure carries its own.
pub trait BinderMeasure {
    fn is_binder(&self, value: f64, threshold: Option<f64>) -> bool;
}

impl Measure {
    /// Conventional cutoff for this scale, used when the caller passes no
    /// threshold of their own.
    pub fn default_threshold(&self) -> f64 {
        match self {
            Measure::Affinity => 500.0,
            Measure::Stability => 1.0,
        }
    }

    /// Unit the prediction value is expressed in.
    pub fn units(&self) -> &'static str {
        match self {
            Measure::Affinity => "nM",
            Measure::Stability => "hours",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Measure::Affinity => "affinity",
            Measure::Stability => "stability",
        }
    }
}

impl BinderMeasure for Measure {
    fn is_binder(&self, value: f64, threshold: Option<f64>) -> bool {
        let threshold = threshold.unwrap_or_else(|| self.default_threshold());
        match self {
            Measure::Affinity => value <= threshold,
            Measure::Stability => value >= threshold,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown measure '{0}', expected 'affinity' or 'stability'")]
pub struct ParseMeasureError(String);

impl FromStr for Measure {
    type Err = ParseMeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "affinity" => Ok(Measure::Affinity),
            "stability" => Ok(Measure::Stability),
            other => Err(ParseMeasureError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BindingPrediction – one predicted peptide/allele interaction
// ---------------------------------------------------------------------------

/// A single measured or predicted binding of a peptide to an MHC allele.
/// Immutable value object; field declaration order is the canonical column
/// order for tabular export (see [`BindingPrediction::FIELD_NAMES`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingPrediction {
    /// Peptide sequence, e.g. "SIINFEKL".
    pub peptide: String,
    /// MHC allele name, e.g. "HLA-A*02:01".
    pub allele: String,
    /// Scale the prediction value lives on.
    pub measure: Measure,
    /// Raw prediction value, in `measure.units()`.
    pub value: f64,
    /// Percentile rank among a reference peptide set; lower = stronger.
    pub percentile_rank: f64,
}

// -- Manual Eq/Hash so predictions can be deduplicated in a HashSet --
//
// Floats compare bitwise: two predictions are "the same" only when every
// field matches exactly as produced, which is what duplicate-row collapse
// wants. This keeps Eq and Hash consistent even for NaN.

impl PartialEq for BindingPrediction {
    fn eq(&self, other: &Self) -> bool {
        self.peptide == other.peptide
            && self.allele == other.allele
            && self.measure == other.measure
            && self.value.to_bits() == other.value.to_bits()
            && self.percentile_rank.to_bits() == other.percentile_rank.to_bits()
    }
}

impl Eq for BindingPrediction {}

impl Hash for BindingPrediction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peptide.hash(state);
        self.allele.hash(state);
        self.measure.hash(state);
        self.value.to_bits().hash(state);
        self.percentile_rank.to_bits().hash(state);
    }
}

impl BindingPrediction {
    /// Canonical field names, in declaration order. Tabular export columns
    /// are named and ordered exactly like this.
    pub const FIELD_NAMES: [&'static str; 5] =
        ["peptide", "allele", "measure", "value", "percentile_rank"];
}

impl fmt::Display for BindingPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: {} {} (rank {})",
            self.peptide,
            self.allele,
            self.value,
            self.measure.units(),
            self.percentile_rank
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pred(peptide: &str, allele: &str, value: f64, rank: f64) -> BindingPrediction {
        BindingPrediction {
            peptide: peptide.to_string(),
            allele: allele.to_string(),
            measure: Measure::Affinity,
            value,
            percentile_rank: rank,
        }
    }

    #[test]
    fn affinity_binder_uses_at_most_semantics() {
        let m = Measure::Affinity;
        assert!(m.is_binder(499.0, None));
        assert!(m.is_binder(500.0, None));
        assert!(!m.is_binder(501.0, None));
        // Explicit threshold overrides the 500 nM default
        assert!(m.is_binder(45.0, Some(50.0)));
        assert!(!m.is_binder(45.0, Some(40.0)));
    }

    #[test]
    fn stability_binder_uses_at_least_semantics() {
        let m = Measure::Stability;
        assert!(m.is_binder(2.5, None));
        assert!(!m.is_binder(0.4, None));
        assert!(m.is_binder(0.4, Some(0.25)));
    }

    #[test]
    fn measure_parses_its_own_display() {
        for m in [Measure::Affinity, Measure::Stability] {
            assert_eq!(m.to_string().parse::<Measure>(), Ok(m));
        }
        assert!("ic50".parse::<Measure>().is_err());
    }

    #[test]
    fn equal_predictions_collapse_in_a_set() {
        let a = pred("SIINFEKL", "H-2-Kb", 20.0, 0.3);
        let b = pred("SIINFEKL", "H-2-Kb", 20.0, 0.3);
        let c = pred("SIINFEKL", "H-2-Kb", 20.0, 0.4);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn nan_valued_predictions_are_self_equal() {
        let a = pred("PEP", "A", f64::NAN, 1.0);
        let b = pred("PEP", "A", f64::NAN, 1.0);
        assert_eq!(a, b);
    }
}
