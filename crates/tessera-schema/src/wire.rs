//! Store record → interchange object conversion.
//!
//! Finalized candidate records carry internal plumbing (reserved keys,
//! embedded endpoint records, resolved reference records). The wire shape is
//! the flat interchange object downstream consumers expect:
//!
//! - `type` is the wire type name, `id` the deterministic identifier;
//! - relationship endpoints flatten to `source_ref` / `target_ref` ids;
//! - reference attributes render per their declared [`RefShape`]: referenced
//!   id(s), embedded copies with identity stripped, or a referenced scalar;
//! - everything else copies through unchanged.

use serde_json::{Map, Value};

use crate::registry::{RefShape, SchemaRegistry};
use crate::{
    is_reserved_key, ATTR_ENTITY_TYPE, ATTR_FROM, ATTR_RELATIONSHIP_TYPE, ATTR_STANDARD_ID,
    ATTR_TO,
};

pub const SPEC_VERSION: &str = "2.1";

/// Convert one finalized record into its wire object. Returns `None` when
/// the record has no graph type or the type is unregistered, which cannot
/// happen for records produced by the mapping engine.
pub fn to_wire(schema: &dyn SchemaRegistry, record: &Map<String, Value>) -> Option<Value> {
    let entity_type = record.get(ATTR_ENTITY_TYPE)?.as_str()?;
    let wire_type = schema.wire_type(entity_type)?;

    let mut out = Map::new();
    if let Some(id) = record.get(ATTR_STANDARD_ID) {
        out.insert("id".into(), id.clone());
    }
    out.insert("type".into(), Value::from(wire_type));
    out.insert("spec_version".into(), Value::from(SPEC_VERSION));

    if schema.is_known_relationship_type(entity_type) {
        if let Some(rel_type) = record.get(ATTR_RELATIONSHIP_TYPE) {
            out.insert(ATTR_RELATIONSHIP_TYPE.into(), rel_type.clone());
        }
        for (endpoint, wire_key) in [(ATTR_FROM, "source_ref"), (ATTR_TO, "target_ref")] {
            if let Some(id) = record
                .get(endpoint)
                .and_then(|v| v.get(ATTR_STANDARD_ID))
            {
                out.insert(wire_key.into(), id.clone());
            }
        }
    }

    for (key, value) in record {
        if is_reserved_key(key) {
            continue;
        }
        match schema.relation_ref(entity_type, key) {
            Some(ref_def) => {
                if let Some(rendered) = render_ref(&ref_def.shape, ref_def.multiple, value) {
                    out.insert(ref_def.wire_name.clone(), rendered);
                }
            }
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    Some(Value::Object(out))
}

fn render_ref(shape: &RefShape, multiple: bool, value: &Value) -> Option<Value> {
    let records: Vec<&Map<String, Value>> = match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => return None,
    };
    if records.is_empty() {
        return None;
    }

    let rendered: Vec<Value> = records
        .iter()
        .filter_map(|rec| match shape {
            RefShape::Id => rec.get(ATTR_STANDARD_ID).cloned(),
            RefShape::Value(attr) => rec.get(attr).cloned(),
            RefShape::Inline => Some(Value::Object(
                rec.iter()
                    .filter(|(k, _)| !is_reserved_key(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
        })
        .collect();
    if rendered.is_empty() {
        return None;
    }

    if multiple {
        Some(Value::Array(rendered))
    } else {
        rendered.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        BuiltinSchema, ENTITY_EXTERNAL_REFERENCE, ENTITY_THREAT_ACTOR, RELATION_PART_OF,
    };
    use serde_json::json;

    fn store_record(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn entity_flattens_to_wire_shape() {
        let schema = BuiltinSchema::new();
        let record = store_record(&[
            ("entity_type", json!(ENTITY_THREAT_ACTOR)),
            ("standard_id", json!("threat-actor--abc")),
            ("name", json!("APT-X")),
            ("threat_actor_types", json!(["crime", "espionage"])),
        ]);
        let wire = to_wire(&schema, &record).unwrap();
        assert_eq!(wire["type"], "threat-actor");
        assert_eq!(wire["id"], "threat-actor--abc");
        assert_eq!(wire["name"], "APT-X");
        assert_eq!(wire["spec_version"], SPEC_VERSION);
        assert!(wire.get("entity_type").is_none());
        assert!(wire.get("standard_id").is_none());
    }

    #[test]
    fn relationship_endpoints_become_refs() {
        let schema = BuiltinSchema::new();
        let record = store_record(&[
            ("entity_type", json!(RELATION_PART_OF)),
            ("relationship_type", json!(RELATION_PART_OF)),
            ("standard_id", json!("relationship--abc")),
            (
                "from",
                json!({ "standard_id": "identity--1", "entity_type": "Organization" }),
            ),
            (
                "to",
                json!({ "standard_id": "identity--2", "entity_type": "Sector" }),
            ),
        ]);
        let wire = to_wire(&schema, &record).unwrap();
        assert_eq!(wire["type"], "relationship");
        assert_eq!(wire["relationship_type"], RELATION_PART_OF);
        assert_eq!(wire["source_ref"], "identity--1");
        assert_eq!(wire["target_ref"], "identity--2");
        assert!(wire.get("from").is_none());
        assert!(wire.get("to").is_none());
    }

    #[test]
    fn label_refs_render_their_values() {
        let schema = BuiltinSchema::new();
        let record = store_record(&[
            ("entity_type", json!(ENTITY_THREAT_ACTOR)),
            ("standard_id", json!("threat-actor--abc")),
            ("name", json!("APT-X")),
            (
                "objectLabel",
                json!({ "entity_type": "Label", "standard_id": "label--1", "value": "crimeware" }),
            ),
        ]);
        let wire = to_wire(&schema, &record).unwrap();
        assert_eq!(wire["labels"], json!(["crimeware"]));
        assert!(wire.get("objectLabel").is_none());
    }

    #[test]
    fn created_by_renders_the_referenced_id() {
        let schema = BuiltinSchema::new();
        let record = store_record(&[
            ("entity_type", json!(ENTITY_THREAT_ACTOR)),
            ("standard_id", json!("threat-actor--abc")),
            ("name", json!("APT-X")),
            (
                "createdBy",
                json!({ "entity_type": "Individual", "standard_id": "identity--9", "name": "R. Doe" }),
            ),
        ]);
        let wire = to_wire(&schema, &record).unwrap();
        assert_eq!(wire["created_by_ref"], "identity--9");
    }

    #[test]
    fn inline_refs_embed_without_identity() {
        let schema = BuiltinSchema::new();
        let record = store_record(&[
            ("entity_type", json!("Incident")),
            ("standard_id", json!("incident--abc")),
            ("name", json!("Breach")),
            (
                "externalReferences",
                json!([{
                    "entity_type": ENTITY_EXTERNAL_REFERENCE,
                    "standard_id": "external-reference--1",
                    "source_name": "report",
                    "url": "https://example.org/report"
                }]),
            ),
        ]);
        let wire = to_wire(&schema, &record).unwrap();
        let refs = wire["external_references"].as_array().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0]["source_name"], "report");
        assert!(refs[0].get("standard_id").is_none());
        assert!(refs[0].get("entity_type").is_none());
    }
}
