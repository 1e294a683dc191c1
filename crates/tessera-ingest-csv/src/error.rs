//! Ingestion error taxonomy.
//!
//! Granularity matters more than the variants themselves:
//!
//! - [`IngestError::MalformedInput`] and [`IngestError::Io`] abort the whole
//!   run; no partial bundle is returned.
//! - Every other variant is scoped to one representation of one row. The
//!   pipeline logs it and moves on; the corresponding record is simply
//!   absent from the bundle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid column label `{0}`")]
    InvalidColumnLabel(String),

    #[error("malformed input: {0}")]
    MalformedInput(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),

    #[error("unknown relationship type `{0}`")]
    UnknownRelationshipType(String),

    #[error("unknown attribute `{key}` for type `{entity_type}`")]
    UnknownAttribute { entity_type: String, key: String },

    #[error("unresolved reference `{0}`")]
    UnresolvedReference(String),

    #[error("cardinality mismatch on attribute `{key}` for type `{entity_type}`")]
    Cardinality { entity_type: String, key: String },

    #[error("a date pattern is required for date attribute `{0}`")]
    MissingDatePattern(String),

    #[error("value `{value}` does not match date pattern `{pattern}`")]
    DateParse { value: String, pattern: String },
}
