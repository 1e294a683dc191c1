//! CSV ingestion for Tessera (boundary adapter).
//!
//! This crate sits at the **interop boundary**:
//!
//! - It parses delimited text (untrusted, arbitrary shape).
//! - It emits a validated, de-duplicated graph bundle ready for bulk
//!   insertion.
//! - It does *not* define the graph model; it consumes schema lookups
//!   through the [`tessera_schema::SchemaRegistry`] capability.
//!
//! The flow, leaf to root:
//!
//! ```text
//! raw bytes ──► row parser ──► mapping engine ──► wire conversion ──► bundle
//!                   │               │
//!                   │         column resolver,
//!              one row at a    schema lookups,
//!              time, bounded   deterministic ids
//!              memory
//! ```
//!
//! Single-threaded, single-pass, cooperative: each row is fully mapped
//! before the next one is read, so memory stays bounded by one row plus the
//! per-row resolution scope. Nothing here is safe to share across
//! concurrent runs; give each run its own mapper, builder and parser.

pub mod bundle;
pub mod columns;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod reader;

pub use bundle::{Bundle, BundleBuilder};
pub use columns::column_index;
pub use engine::{map_row, CandidateRecord};
pub use error::IngestError;
pub use mapper::{
    AttributeMapping, AttributeSource, BasedOnRef, ColumnConfiguration, ColumnFilter, ColumnRef,
    FilterOperator, MapperDefinition, Representation, RepresentationKind, Target,
};
pub use pipeline::{bundle_process, bundle_process_from_path};
pub use reader::{parse_rows, parse_rows_from_path};
