//! Declarative mapper definitions.
//!
//! A mapper is authored once by an operator and loaded read-only per run.
//! Each representation describes how to build one candidate record from a
//! row: the target graph type, an optional discriminator column gate, and
//! an ordered list of attribute mappings.
//!
//! Attribute sources are a closed sum type — a mapping either pulls from a
//! row column or from other representations' results on the same row.
//! Exhaustive matching keeps new variants from being silently ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapperDefinition {
    pub id: String,
    pub has_header: bool,
    pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentationKind {
    Entity,
    Relationship,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Representation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RepresentationKind,
    pub target: Target,
    #[serde(default)]
    pub attributes: Vec<AttributeMapping>,
}

impl Representation {
    /// Number of attributes sourced from other representations. Drives the
    /// entity processing order within a row.
    pub fn based_on_count(&self) -> usize {
        self.attributes
            .iter()
            .filter(|attr| matches!(attr.source, AttributeSource::BasedOn(_)))
            .count()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Target {
    pub entity_type: String,
    #[serde(default)]
    pub column_based: Option<ColumnFilter>,
}

/// Gates whether a representation applies to a given row, by comparing one
/// raw cell against a literal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnFilter {
    pub column_reference: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributeMapping {
    pub key: String,
    #[serde(flatten)]
    pub source: AttributeSource,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSource {
    /// Scalar or multi-value pulled from one row column.
    Column(ColumnRef),
    /// Record(s) built earlier in the same row by other representations.
    BasedOn(BasedOnRef),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnRef {
    pub column_name: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub configuration: Option<ColumnConfiguration>,
}

impl ColumnRef {
    pub fn separator(&self) -> Option<&str> {
        self.configuration
            .as_ref()
            .and_then(|c| c.separator.as_deref())
    }

    pub fn pattern_date(&self) -> Option<&str> {
        self.configuration
            .as_ref()
            .and_then(|c| c.pattern_date.as_deref())
    }

    pub fn timezone(&self) -> Option<&str> {
        self.configuration
            .as_ref()
            .and_then(|c| c.timezone.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ColumnConfiguration {
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub pattern_date: Option<String>,
    /// Fixed UTC offset (`+02:00`) applied when parsing dates.
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasedOnRef {
    pub representations: Vec<String>,
    #[serde(default)]
    pub multiple: bool,
}
