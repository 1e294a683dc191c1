//! Per-row record builder (the mapping engine).
//!
//! `map_row` turns one raw row into zero or more candidate records, one per
//! successfully resolved representation. Resolution runs against a
//! row-scoped table so representations can reference each other's results
//! within the same row; the table is created here and dropped on return,
//! never shared across rows.
//!
//! Processing order: entities first, relationships second, so a
//! relationship can reference an entity built from the same row but not
//! vice versa. Within entities, representations with fewer cross-references
//! go first. That heuristic approximates a dependency order for the shallow
//! reference chains mappers actually declare; it is not a topological sort,
//! and a tie between two entities where one references the other can still
//! fail to resolve.
//!
//! Failure granularity is per representation: a failed gate or attribute
//! error drops that one candidate (logged), never the row or the run.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use tessera_schema::{
    deterministic_id, is_empty_value, AttrKind, AttributeDefinition, SchemaRegistry,
    ATTR_ENTITY_TYPE, ATTR_FROM, ATTR_FROM_TYPE, ATTR_RELATIONSHIP_TYPE, ATTR_STANDARD_ID,
    ATTR_TO, ATTR_TO_TYPE,
};

use crate::columns::column_index;
use crate::error::IngestError;
use crate::mapper::{
    AttributeSource, BasedOnRef, ColumnRef, FilterOperator, MapperDefinition, Representation,
    RepresentationKind,
};

/// A candidate graph record: attribute name → value, plus reserved keys.
pub type CandidateRecord = Map<String, Value>;

/// Resolution table for one row. Insertion order is preserved so the row's
/// output keeps the processing order.
#[derive(Default)]
struct RowScope {
    entries: Vec<(String, CandidateRecord)>,
}

impl RowScope {
    fn get(&self, id: &str) -> Option<&CandidateRecord> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, record)| record)
    }

    fn insert(&mut self, id: &str, record: CandidateRecord) {
        self.entries.push((id.to_string(), record));
    }

    fn into_records(self) -> Vec<CandidateRecord> {
        self.entries.into_iter().map(|(_, record)| record).collect()
    }
}

/// Build all candidate records for one row.
///
/// Inline/meta representation outputs are included; excluding them from the
/// externally visible result is the pipeline's job, they must stay
/// referenceable here.
pub fn map_row(
    mapper: &MapperDefinition,
    schema: &dyn SchemaRegistry,
    row: &[String],
) -> Vec<CandidateRecord> {
    let mut scope = RowScope::default();

    let mut entities: Vec<&Representation> = mapper
        .representations
        .iter()
        .filter(|rep| rep.kind == RepresentationKind::Entity)
        .collect();
    entities.sort_by_key(|rep| rep.based_on_count());

    let relationships = mapper
        .representations
        .iter()
        .filter(|rep| rep.kind == RepresentationKind::Relationship);

    for rep in entities.into_iter().chain(relationships) {
        match map_representation(rep, schema, row, &scope) {
            Ok(Some(record)) => scope.insert(&rep.id, record),
            Ok(None) => {}
            Err(err) => {
                warn!(representation = %rep.id, error = %err, "skipping representation");
            }
        }
    }

    scope.into_records()
}

fn map_representation(
    rep: &Representation,
    schema: &dyn SchemaRegistry,
    row: &[String],
    scope: &RowScope,
) -> Result<Option<CandidateRecord>, IngestError> {
    check_target_type(rep, schema)?;
    if !passes_column_filter(rep, row)? {
        return Ok(None);
    }

    let entity_type = rep.target.entity_type.as_str();
    let mut record = CandidateRecord::new();
    record.insert(ATTR_ENTITY_TYPE.into(), Value::from(entity_type));
    if rep.kind == RepresentationKind::Relationship {
        record.insert(ATTR_RELATIONSHIP_TYPE.into(), Value::from(entity_type));
    }
    for (key, value) in schema.inner_properties(entity_type) {
        record.insert(key, value);
    }

    for attr in &rep.attributes {
        match &attr.source {
            AttributeSource::BasedOn(based) => {
                resolve_based_on(rep, &attr.key, based, schema, scope, &mut record)?;
            }
            AttributeSource::Column(column) => {
                resolve_column(rep, &attr.key, column, schema, row, &mut record)?;
            }
        }
    }

    if !is_filled(rep, &record) {
        return Ok(None);
    }

    let id = deterministic_id(schema, entity_type, &record);
    record.insert(ATTR_STANDARD_ID.into(), Value::from(id));
    Ok(Some(record))
}

pub(crate) fn check_target_type(
    rep: &Representation,
    schema: &dyn SchemaRegistry,
) -> Result<(), IngestError> {
    let name = &rep.target.entity_type;
    match rep.kind {
        RepresentationKind::Entity if !schema.is_known_entity_type(name) => {
            Err(IngestError::UnknownEntityType(name.clone()))
        }
        RepresentationKind::Relationship if !schema.is_known_relationship_type(name) => {
            Err(IngestError::UnknownRelationshipType(name.clone()))
        }
        _ => Ok(()),
    }
}

/// The discriminator gate compares the raw cell, untrimmed. A mismatch is
/// expected branching, not an error.
fn passes_column_filter(rep: &Representation, row: &[String]) -> Result<bool, IngestError> {
    let Some(filter) = &rep.target.column_based else {
        return Ok(true);
    };
    let idx = column_index(&filter.column_reference)?;
    let cell = row.get(idx).map(String::as_str).unwrap_or("");
    Ok(match filter.operator {
        FilterOperator::Eq => cell == filter.value,
        FilterOperator::Neq => cell != filter.value,
    })
}

fn resolve_based_on(
    rep: &Representation,
    key: &str,
    based: &BasedOnRef,
    schema: &dyn SchemaRegistry,
    scope: &RowScope,
    record: &mut CandidateRecord,
) -> Result<(), IngestError> {
    let mut resolved: Vec<&CandidateRecord> = Vec::with_capacity(based.representations.len());
    for id in &based.representations {
        match scope.get(id) {
            Some(referenced) => resolved.push(referenced),
            None => {
                // One missing reference invalidates the whole list; the
                // attribute is omitted, the record goes on.
                let err = IngestError::UnresolvedReference(id.clone());
                debug!(representation = %rep.id, attribute = %key, error = %err, "attribute omitted");
                return Ok(());
            }
        }
    }
    if resolved.is_empty() {
        return Ok(());
    }

    if rep.kind == RepresentationKind::Relationship && (key == ATTR_FROM || key == ATTR_TO) {
        let endpoint = resolved[0];
        let type_key = if key == ATTR_FROM {
            ATTR_FROM_TYPE
        } else {
            ATTR_TO_TYPE
        };
        if let Some(endpoint_type) = endpoint.get(ATTR_ENTITY_TYPE) {
            record.insert(type_key.into(), endpoint_type.clone());
        }
        record.insert(key.to_string(), Value::Object(endpoint.clone()));
        return Ok(());
    }

    let entity_type = rep.target.entity_type.as_str();
    let ref_def = schema
        .relation_ref(entity_type, key)
        .ok_or_else(|| IngestError::UnknownAttribute {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        })?;
    if ref_def.multiple {
        let records = resolved
            .into_iter()
            .map(|referenced| Value::Object(referenced.clone()))
            .collect();
        record.insert(key.to_string(), Value::Array(records));
    } else {
        if resolved.len() > 1 {
            return Err(IngestError::Cardinality {
                entity_type: entity_type.to_string(),
                key: key.to_string(),
            });
        }
        record.insert(key.to_string(), Value::Object(resolved[0].clone()));
    }
    Ok(())
}

fn resolve_column(
    rep: &Representation,
    key: &str,
    column: &ColumnRef,
    schema: &dyn SchemaRegistry,
    row: &[String],
    record: &mut CandidateRecord,
) -> Result<(), IngestError> {
    let entity_type = rep.target.entity_type.as_str();

    let idx = match column_index(&column.column_name) {
        Ok(idx) => idx,
        Err(err) => {
            // Malformed label: this attribute only, the record goes on.
            debug!(representation = %rep.id, attribute = %key, error = %err, "attribute omitted");
            return Ok(());
        }
    };
    // Ragged rows make out-of-range cells ordinary empties.
    let raw = row.get(idx).map(String::as_str).unwrap_or("");
    if raw.trim().is_empty() {
        return Ok(());
    }

    let attr_def =
        schema
            .attribute(entity_type, key)
            .ok_or_else(|| IngestError::UnknownAttribute {
                entity_type: entity_type.to_string(),
                key: key.to_string(),
            })?;
    if column.multiple && !attr_def.multiple {
        return Err(IngestError::Cardinality {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        });
    }

    if let Some(value) = compute_value(raw, column, attr_def, key)? {
        record.insert(key.to_string(), value);
    }
    Ok(())
}

fn compute_value(
    raw: &str,
    column: &ColumnRef,
    attr_def: &AttributeDefinition,
    key: &str,
) -> Result<Option<Value>, IngestError> {
    if attr_def.multiple {
        // A single-configured column targeting a multi-valued attribute is
        // leniently wrapped in a one-element collection.
        let pieces: Vec<&str> = match (column.multiple, column.separator()) {
            (true, Some(separator)) => raw.split(separator).collect(),
            _ => vec![raw],
        };
        let mut values = Vec::new();
        for piece in pieces {
            if piece.trim().is_empty() {
                continue;
            }
            if let Some(value) = format_value(piece, attr_def.kind, column, key)? {
                values.push(value);
            }
        }
        if values.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Value::Array(values)))
        }
    } else {
        format_value(raw, attr_def.kind, column, key)
    }
}

fn format_value(
    raw: &str,
    kind: AttrKind,
    column: &ColumnRef,
    key: &str,
) -> Result<Option<Value>, IngestError> {
    match kind {
        AttrKind::String => Ok(Some(Value::from(raw.trim()))),
        // Best-effort numerics: an unparseable value yields no value, never
        // an error. Dates below are the strict counterpart.
        AttrKind::Numeric => Ok(parse_number(raw)),
        AttrKind::Date => {
            let pattern = column
                .pattern_date()
                .ok_or_else(|| IngestError::MissingDatePattern(key.to_string()))?;
            parse_date(raw.trim(), pattern, column.timezone()).map(|iso| Some(Value::from(iso)))
        }
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Parse against the configured pattern and normalize to an RFC 3339 UTC
/// instant. Date-only patterns resolve to midnight; a configured timezone
/// (fixed UTC offset) shifts the local reading, otherwise UTC is assumed.
fn parse_date(raw: &str, pattern: &str, timezone: Option<&str>) -> Result<String, IngestError> {
    let parse_err = || IngestError::DateParse {
        value: raw.to_string(),
        pattern: pattern.to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(raw, pattern)
        .or_else(|_| NaiveDate::parse_from_str(raw, pattern).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| parse_err())?;

    let instant: DateTime<Utc> = match timezone {
        Some(offset) => {
            let offset: FixedOffset = offset.parse().map_err(|_| parse_err())?;
            match offset.from_local_datetime(&naive) {
                LocalResult::Single(dt) => dt.with_timezone(&Utc),
                _ => return Err(parse_err()),
            }
        }
        None => Utc.from_utc_datetime(&naive),
    };
    Ok(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn is_filled(rep: &Representation, record: &CandidateRecord) -> bool {
    let filled = |key: &str| {
        record
            .get(key)
            .map(|value| !is_empty_value(value))
            .unwrap_or(false)
    };
    if rep.kind == RepresentationKind::Relationship && (!filled(ATTR_FROM) || !filled(ATTR_TO)) {
        return false;
    }
    rep.attributes.iter().any(|attr| filled(&attr.key))
}
