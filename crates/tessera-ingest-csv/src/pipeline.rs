//! Pipeline orchestration: rows in, bundle out.
//!
//! Wires the row parser, mapping engine, wire conversion and bundle
//! accumulator together for one run. Per-representation failures were
//! already handled (logged and skipped) inside the engine; only parser
//! structural failures surface here, and they abort the run with no
//! partial bundle.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use tessera_schema::{to_wire, SchemaRegistry, ATTR_ENTITY_TYPE};

use crate::bundle::{Bundle, BundleBuilder};
use crate::engine::map_row;
use crate::error::IngestError;
use crate::mapper::MapperDefinition;
use crate::reader::parse_rows;

/// Run the whole pipeline over a byte source.
pub fn bundle_process<R: Read>(
    source: R,
    mapper: &MapperDefinition,
    delimiter: u8,
    schema: &dyn SchemaRegistry,
) -> Result<Bundle, IngestError> {
    validate_mapper(mapper, schema)?;

    let mut builder = BundleBuilder::new();
    let mut skip_header = mapper.has_header;
    let mut row_count = 0usize;

    parse_rows(source, delimiter, |row| {
        if skip_header {
            skip_header = false;
            return;
        }
        row_count += 1;
        let records = map_row(mapper, schema, row);
        let objects = records
            .iter()
            .filter(|record| {
                // Inline/meta records were only built to enrich others.
                let inline = record
                    .get(ATTR_ENTITY_TYPE)
                    .and_then(serde_json::Value::as_str)
                    .map(|entity_type| schema.is_inline_type(entity_type))
                    .unwrap_or(false);
                !inline
            })
            .filter_map(|record| to_wire(schema, record))
            .collect();
        builder.add_objects(objects);
    })?;

    let bundle = builder.build();
    debug!(
        rows = row_count,
        objects = bundle.objects.len(),
        bundle = %bundle.id,
        "ingestion run complete"
    );
    Ok(bundle)
}

/// Config defects detectable before any row is read abort the run: a
/// mapper whose representations all target unknown types has no fallback
/// and can only produce an empty bundle. A mapper with *some* unknown
/// targets still runs; those representations are skipped per row.
fn validate_mapper(
    mapper: &MapperDefinition,
    schema: &dyn SchemaRegistry,
) -> Result<(), IngestError> {
    let mut first_err = None;
    for rep in &mapper.representations {
        match crate::engine::check_target_type(rep, schema) {
            Ok(()) => return Ok(()),
            Err(err) => first_err = first_err.or(Some(err)),
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// File-backed variant of [`bundle_process`].
pub fn bundle_process_from_path<P: AsRef<Path>>(
    path: P,
    mapper: &MapperDefinition,
    delimiter: u8,
    schema: &dyn SchemaRegistry,
) -> Result<Bundle, IngestError> {
    let file = File::open(path)?;
    bundle_process(BufReader::new(file), mapper, delimiter, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{
        AttributeMapping, AttributeSource, ColumnRef, Representation, RepresentationKind, Target,
    };
    use tessera_schema::registry::{BuiltinSchema, ENTITY_THREAT_ACTOR};

    fn name_mapper(has_header: bool) -> MapperDefinition {
        MapperDefinition {
            id: "names".into(),
            has_header,
            representations: vec![Representation {
                id: "actor".into(),
                kind: RepresentationKind::Entity,
                target: Target {
                    entity_type: ENTITY_THREAT_ACTOR.into(),
                    column_based: None,
                },
                attributes: vec![AttributeMapping {
                    key: "name".into(),
                    source: AttributeSource::Column(ColumnRef {
                        column_name: "A".into(),
                        multiple: false,
                        configuration: None,
                    }),
                }],
            }],
        }
    }

    #[test]
    fn header_row_is_skipped() {
        let schema = BuiltinSchema::new();
        let csv = b"name\nAPT-X\nAPT-Y\n";
        let bundle = bundle_process(&csv[..], &name_mapper(true), b',', &schema).unwrap();
        assert_eq!(bundle.objects.len(), 2);
        assert!(bundle
            .objects
            .iter()
            .all(|o| o["name"] != "name"));
    }

    #[test]
    fn without_header_every_row_maps() {
        let schema = BuiltinSchema::new();
        let csv = b"APT-X\nAPT-Y\n";
        let bundle = bundle_process(&csv[..], &name_mapper(false), b',', &schema).unwrap();
        assert_eq!(bundle.objects.len(), 2);
    }

    #[test]
    fn duplicate_rows_collapse_to_one_object() {
        let schema = BuiltinSchema::new();
        let csv = b"APT-X\nAPT-X\nAPT-X\n";
        let bundle = bundle_process(&csv[..], &name_mapper(false), b',', &schema).unwrap();
        assert_eq!(bundle.objects.len(), 1);
    }

    #[test]
    fn wholly_unknown_mapper_aborts_before_reading_rows() {
        let schema = BuiltinSchema::new();
        let mut mapper = name_mapper(false);
        mapper.representations[0].target.entity_type = "Flying-Saucer".into();
        let err = bundle_process(&b"APT-X\n"[..], &mapper, b',', &schema).unwrap_err();
        assert!(matches!(err, IngestError::UnknownEntityType(_)));
    }

    #[test]
    fn partially_unknown_mapper_still_runs() {
        let schema = BuiltinSchema::new();
        let mut mapper = name_mapper(false);
        let mut ufo = mapper.representations[0].clone();
        ufo.id = "ufo".into();
        ufo.target.entity_type = "Flying-Saucer".into();
        mapper.representations.push(ufo);

        let bundle = bundle_process(&b"APT-X\n"[..], &mapper, b',', &schema).unwrap();
        assert_eq!(bundle.objects.len(), 1);
    }

    #[test]
    fn malformed_source_returns_no_partial_bundle() {
        let schema = BuiltinSchema::new();
        let csv = b"APT-X\n\xff\xfe\n";
        let err = bundle_process(&csv[..], &name_mapper(false), b',', &schema).unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput(_)));
    }
}
