//! Deterministic record identifiers.
//!
//! Two semantically identical records must collapse to the same identifier,
//! whichever row or run produced them. Identifiers are name-based UUIDs
//! (v5) over a canonical JSON serialization of the identity-contributing
//! values, prefixed with the wire type:
//!
//! - entities hash their registered identity keys (`name`,
//!   `value`, `source_name` + `url`, ...) plus the graph type;
//! - relationships hash the relationship type plus both endpoint ids.
//!
//! An entity whose identity keys are all absent falls back to hashing every
//! non-reserved attribute, so distinct records still get distinct ids.
//!
//! Bundle ids are the one intentional exception: every run gets a fresh
//! random (v4) id.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::registry::SchemaRegistry;
use crate::{is_empty_value, is_reserved_key, ATTR_FROM, ATTR_STANDARD_ID, ATTR_TO};

/// Namespace for name-based record ids. Fixed forever: changing it changes
/// every identifier in every existing bundle.
const IDENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x00ab_edb4_aa42_466c_9c01_fed2_3315_a9b7);

/// Compute the deterministic identifier for a finalized record.
pub fn deterministic_id(
    schema: &dyn SchemaRegistry,
    entity_type: &str,
    record: &Map<String, Value>,
) -> String {
    let wire_type = schema.wire_type(entity_type).unwrap_or("object");

    // BTreeMap gives a canonical key order in the serialized seed.
    let mut contributing: BTreeMap<String, Value> = BTreeMap::new();

    if schema.is_known_relationship_type(entity_type) {
        contributing.insert("relationship_type".into(), Value::from(entity_type));
        for (endpoint, seed_key) in [(ATTR_FROM, "source_ref"), (ATTR_TO, "target_ref")] {
            if let Some(id) = record
                .get(endpoint)
                .and_then(|v| v.get(ATTR_STANDARD_ID))
                .and_then(Value::as_str)
            {
                contributing.insert(seed_key.into(), Value::from(id));
            }
        }
    } else {
        contributing.insert("entity_type".into(), Value::from(entity_type));
        for key in schema.identity_keys(entity_type) {
            if let Some(value) = record.get(&key) {
                if !is_empty_value(value) {
                    contributing.insert(key, value.clone());
                }
            }
        }
        // Only the type made it in: identity keys are absent from this
        // record, so hash everything that was actually mapped.
        if contributing.len() == 1 {
            for (key, value) in record {
                if !is_reserved_key(key) && !is_empty_value(value) {
                    contributing.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let seed = serde_json::to_string(&contributing).unwrap_or_default();
    let uuid = Uuid::new_v5(&IDENTITY_NAMESPACE, seed.as_bytes());
    format!("{wire_type}--{uuid}")
}

/// Fresh synthetic identifier for one ingestion run's bundle.
pub fn bundle_id() -> String {
    format!("bundle--{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BuiltinSchema, ENTITY_COUNTRY, ENTITY_THREAT_ACTOR, RELATION_PART_OF};
    use serde_json::json;

    fn record(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn same_identity_input_same_id() {
        let schema = BuiltinSchema::new();
        let a = record(&[("name", json!("APT-X")), ("confidence", json!(10))]);
        let b = record(&[("name", json!("APT-X")), ("confidence", json!(90))]);
        // confidence is not an identity key for threat actors
        assert_eq!(
            deterministic_id(&schema, ENTITY_THREAT_ACTOR, &a),
            deterministic_id(&schema, ENTITY_THREAT_ACTOR, &b)
        );
    }

    #[test]
    fn ids_differ_by_type_and_name() {
        let schema = BuiltinSchema::new();
        let a = record(&[("name", json!("France"))]);
        let b = record(&[("name", json!("Italy"))]);
        assert_ne!(
            deterministic_id(&schema, ENTITY_COUNTRY, &a),
            deterministic_id(&schema, ENTITY_COUNTRY, &b)
        );
        assert_ne!(
            deterministic_id(&schema, ENTITY_COUNTRY, &a),
            deterministic_id(&schema, ENTITY_THREAT_ACTOR, &a)
        );
    }

    #[test]
    fn id_carries_wire_type_prefix() {
        let schema = BuiltinSchema::new();
        let rec = record(&[("name", json!("APT-X"))]);
        let id = deterministic_id(&schema, ENTITY_THREAT_ACTOR, &rec);
        assert!(id.starts_with("threat-actor--"), "{id}");
    }

    #[test]
    fn relationship_id_hashes_both_endpoints() {
        let schema = BuiltinSchema::new();
        let rel = |from: &str, to: &str| {
            record(&[
                ("relationship_type", json!(RELATION_PART_OF)),
                ("from", json!({ "standard_id": from })),
                ("to", json!({ "standard_id": to })),
            ])
        };
        let a = deterministic_id(&schema, RELATION_PART_OF, &rel("x--1", "x--2"));
        let b = deterministic_id(&schema, RELATION_PART_OF, &rel("x--1", "x--2"));
        let c = deterministic_id(&schema, RELATION_PART_OF, &rel("x--1", "x--3"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("relationship--"));
    }

    #[test]
    fn fallback_hashes_mapped_attributes_when_identity_keys_absent() {
        let schema = BuiltinSchema::new();
        let a = record(&[("description", json!("first"))]);
        let b = record(&[("description", json!("second"))]);
        assert_ne!(
            deterministic_id(&schema, "Incident", &a),
            deterministic_id(&schema, "Incident", &b)
        );
    }

    #[test]
    fn bundle_ids_are_unique_per_run() {
        assert_ne!(bundle_id(), bundle_id());
        assert!(bundle_id().starts_with("bundle--"));
    }
}
