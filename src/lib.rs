//! A multi-level constraint-system compiler for arithmetization of tabular
//! computations over a large prime field.
//!
//! User-authored constraints and a legacy JSON constraint dump are compiled
//! through three progressively lower term universes — HIR, MIR, AIR — via
//! the passes in [`lower`]. The schema data model ([`schema`]), the term
//! algebra ([`term`]), the symbolic analyses ([`analysis`]) and the
//! simplifier ([`simplify`]) are shared across all three levels; [`encode`]
//! persists a fully lowered schema and [`legacy`] ingests the external JSON
//! dump format.
//!
//! No proving, no trace generation, no circuit-level optimizations beyond
//! the symbolic ones in [`simplify`] — the downstream prover, trace
//! container and field-arithmetic primitive are external collaborators.

pub mod analysis;
pub mod bounds;
pub mod context;
pub mod encode;
pub mod error;
pub mod field;
pub mod handle;
pub mod ids;
pub mod interval;
pub mod legacy;
pub mod lower;
pub mod schema;
pub mod simplify;
pub mod term;
pub mod types;

pub use error::{Error, Result};
pub use field::FieldElement;
pub use handle::Handle;
pub use schema::{AirSchema, HirSchema, MirSchema};
