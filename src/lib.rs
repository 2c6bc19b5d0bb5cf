//! Ranked collections of MHC binding predictions.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌────────┐
//!   │ loader  │  parse file → EpitopeCollection
//!   └────────┘
//!        │
//!        ▼
//!   ┌───────────────────┐
//!   │ EpitopeCollection  │  deduplicated, rank-sorted predictions
//!   └───────────────────┘
//!        │
//!        ▼
//!   filter / strong_binders / groupby → new collections
//!   dataframe → Arrow RecordBatch (analysis tooling)
//! ```
//!
//! Collections are logically immutable: every query returns a new
//! collection of the receiver's concrete type (see
//! [`RankedCollection`]), so derived collection types survive whole
//! transform chains.

pub mod collection;
pub mod loader;
pub mod model;

pub use collection::{DEFAULT_MAX_RANK, EpitopeCollection, RankedCollection};
pub use model::{BinderMeasure, BindingPrediction, Measure, ParseMeasureError};
