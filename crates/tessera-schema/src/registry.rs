//! Type, attribute and reference lookups backing the mapping engine.
//!
//! The engine only ever asks five questions:
//!
//! - is this a known entity / relationship type?
//! - how is attribute `key` typed for type `T` (and is it multi-valued)?
//! - is attribute `key` a reference to other records, and how does it render?
//! - which derived properties does type `T` stamp on every record?
//! - which attributes identify a record of type `T`?
//!
//! All of it is answered through the [`SchemaRegistry`] trait so tests can
//! substitute a minimal fake. [`BuiltinSchema`] is the production answer: a
//! table-driven registry of the threat-intelligence model.

use std::collections::HashMap;

use serde_json::Value;

// ============================================================================
// Entity and relationship type names
// ============================================================================

pub const ENTITY_THREAT_ACTOR: &str = "Threat-Actor";
pub const ENTITY_ORGANIZATION: &str = "Organization";
pub const ENTITY_INDIVIDUAL: &str = "Individual";
pub const ENTITY_SECTOR: &str = "Sector";
pub const ENTITY_COUNTRY: &str = "Country";
pub const ENTITY_CITY: &str = "City";
pub const ENTITY_REGION: &str = "Region";
pub const ENTITY_INCIDENT: &str = "Incident";
pub const ENTITY_MALWARE: &str = "Malware";
pub const ENTITY_LABEL: &str = "Label";
pub const ENTITY_EXTERNAL_REFERENCE: &str = "External-Reference";

pub const RELATION_PART_OF: &str = "part-of";
pub const RELATION_LOCATED_AT: &str = "located-at";
pub const RELATION_TARGETS: &str = "targets";
pub const RELATION_USES: &str = "uses";
pub const RELATION_SIGHTING_OF: &str = "sighting-of";

// ============================================================================
// Definitions
// ============================================================================

/// Primitive type of a mapped attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    String,
    Numeric,
    Date,
}

#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    pub kind: AttrKind,
    pub multiple: bool,
}

impl AttributeDefinition {
    pub fn single(kind: AttrKind) -> Self {
        Self {
            kind,
            multiple: false,
        }
    }

    pub fn multiple(kind: AttrKind) -> Self {
        Self {
            kind,
            multiple: true,
        }
    }
}

/// How a resolved reference renders in the wire object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefShape {
    /// Referenced record id(s).
    Id,
    /// Embedded copy of the referenced record, identity stripped.
    Inline,
    /// A single scalar attribute of the referenced record (labels).
    Value(String),
}

#[derive(Debug, Clone)]
pub struct RelationRefDefinition {
    pub wire_name: String,
    pub multiple: bool,
    pub shape: RefShape,
}

/// One registered entity type.
#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    pub wire_type: String,
    /// Attribute keys whose values identify a record of this type.
    pub identity_keys: Vec<String>,
    /// Derived properties stamped on every record of this type.
    pub inner_properties: Vec<(String, Value)>,
    /// Inline/meta types enrich other records but never appear standalone.
    pub inline: bool,
    pub attributes: HashMap<String, AttributeDefinition>,
}

/// One registered relationship type.
#[derive(Debug, Clone)]
pub struct RelationshipTypeDef {
    pub wire_type: String,
    pub attributes: HashMap<String, AttributeDefinition>,
}

// ============================================================================
// Registry capability
// ============================================================================

pub trait SchemaRegistry {
    fn is_known_entity_type(&self, entity_type: &str) -> bool;
    fn is_known_relationship_type(&self, entity_type: &str) -> bool;

    /// Attribute definition for `key` on `entity_type` (entity or
    /// relationship type).
    fn attribute(&self, entity_type: &str, key: &str) -> Option<&AttributeDefinition>;

    /// Reference definition for `key` on `entity_type`, if `key` is a
    /// record-to-record reference rather than a plain attribute.
    fn relation_ref(&self, entity_type: &str, key: &str) -> Option<&RelationRefDefinition>;

    /// Derived properties stamped on every record of `entity_type`.
    fn inner_properties(&self, entity_type: &str) -> Vec<(String, Value)>;

    /// Attribute keys contributing to the deterministic identifier.
    fn identity_keys(&self, entity_type: &str) -> Vec<String>;

    /// Interchange type name, for entities and relationships alike.
    fn wire_type(&self, entity_type: &str) -> Option<&str>;

    /// Inline/meta types are excluded from externally visible output.
    fn is_inline_type(&self, entity_type: &str) -> bool;
}

// ============================================================================
// Built-in threat-intelligence registry
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BuiltinSchema {
    entities: HashMap<String, EntityTypeDef>,
    relationships: HashMap<String, RelationshipTypeDef>,
    relation_refs: HashMap<String, RelationRefDefinition>,
}

impl BuiltinSchema {
    pub fn new() -> Self {
        let mut schema = Self::default();
        schema.register_entities();
        schema.register_relationships();
        schema.register_relation_refs();
        schema
    }

    pub fn register_entity(&mut self, name: &str, def: EntityTypeDef) {
        self.entities.insert(name.to_string(), def);
    }

    pub fn register_relationship(&mut self, name: &str, def: RelationshipTypeDef) {
        self.relationships.insert(name.to_string(), def);
    }

    fn register_entities(&mut self) {
        use AttrKind::{Date, Numeric, String as Str};

        self.register_entity(
            ENTITY_THREAT_ACTOR,
            EntityTypeDef {
                wire_type: "threat-actor".into(),
                identity_keys: vec!["name".into()],
                inner_properties: vec![],
                inline: false,
                attributes: attrs(&[
                    ("name", AttributeDefinition::single(Str)),
                    ("description", AttributeDefinition::single(Str)),
                    ("confidence", AttributeDefinition::single(Numeric)),
                    ("aliases", AttributeDefinition::multiple(Str)),
                    ("threat_actor_types", AttributeDefinition::multiple(Str)),
                    ("primary_motivation", AttributeDefinition::single(Str)),
                    ("first_seen", AttributeDefinition::single(Date)),
                    ("last_seen", AttributeDefinition::single(Date)),
                ]),
            },
        );

        for (name, class) in [
            (ENTITY_ORGANIZATION, "organization"),
            (ENTITY_INDIVIDUAL, "individual"),
            (ENTITY_SECTOR, "class"),
        ] {
            self.register_entity(
                name,
                EntityTypeDef {
                    wire_type: "identity".into(),
                    identity_keys: vec!["name".into(), "identity_class".into()],
                    inner_properties: vec![("identity_class".into(), Value::from(class))],
                    inline: false,
                    attributes: attrs(&[
                        ("name", AttributeDefinition::single(Str)),
                        ("description", AttributeDefinition::single(Str)),
                        ("confidence", AttributeDefinition::single(Numeric)),
                        ("contact_information", AttributeDefinition::single(Str)),
                        ("roles", AttributeDefinition::multiple(Str)),
                    ]),
                },
            );
        }

        for name in [ENTITY_COUNTRY, ENTITY_CITY, ENTITY_REGION] {
            self.register_entity(
                name,
                EntityTypeDef {
                    wire_type: "location".into(),
                    identity_keys: vec!["name".into(), "location_type".into()],
                    inner_properties: vec![("location_type".into(), Value::from(name))],
                    inline: false,
                    attributes: attrs(&[
                        ("name", AttributeDefinition::single(Str)),
                        ("description", AttributeDefinition::single(Str)),
                        ("confidence", AttributeDefinition::single(Numeric)),
                        ("latitude", AttributeDefinition::single(Numeric)),
                        ("longitude", AttributeDefinition::single(Numeric)),
                    ]),
                },
            );
        }

        self.register_entity(
            ENTITY_INCIDENT,
            EntityTypeDef {
                wire_type: "incident".into(),
                identity_keys: vec!["name".into()],
                inner_properties: vec![],
                inline: false,
                attributes: attrs(&[
                    ("name", AttributeDefinition::single(Str)),
                    ("description", AttributeDefinition::single(Str)),
                    ("confidence", AttributeDefinition::single(Numeric)),
                    ("incident_type", AttributeDefinition::single(Str)),
                    ("severity", AttributeDefinition::single(Str)),
                    ("source", AttributeDefinition::single(Str)),
                    ("first_seen", AttributeDefinition::single(Date)),
                    ("last_seen", AttributeDefinition::single(Date)),
                ]),
            },
        );

        self.register_entity(
            ENTITY_MALWARE,
            EntityTypeDef {
                wire_type: "malware".into(),
                identity_keys: vec!["name".into()],
                inner_properties: vec![],
                inline: false,
                attributes: attrs(&[
                    ("name", AttributeDefinition::single(Str)),
                    ("description", AttributeDefinition::single(Str)),
                    ("confidence", AttributeDefinition::single(Numeric)),
                    ("malware_types", AttributeDefinition::multiple(Str)),
                ]),
            },
        );

        self.register_entity(
            ENTITY_LABEL,
            EntityTypeDef {
                wire_type: "label".into(),
                identity_keys: vec!["value".into()],
                inner_properties: vec![],
                inline: false,
                attributes: attrs(&[
                    ("value", AttributeDefinition::single(Str)),
                    ("color", AttributeDefinition::single(Str)),
                ]),
            },
        );

        self.register_entity(
            ENTITY_EXTERNAL_REFERENCE,
            EntityTypeDef {
                wire_type: "external-reference".into(),
                identity_keys: vec!["source_name".into(), "url".into()],
                inner_properties: vec![],
                inline: true,
                attributes: attrs(&[
                    ("source_name", AttributeDefinition::single(Str)),
                    ("description", AttributeDefinition::single(Str)),
                    ("url", AttributeDefinition::single(Str)),
                    ("external_id", AttributeDefinition::single(Str)),
                ]),
            },
        );
    }

    fn register_relationships(&mut self) {
        use AttrKind::{Date, Numeric, String as Str};

        let core = |wire: &str| RelationshipTypeDef {
            wire_type: wire.into(),
            attributes: attrs(&[
                ("description", AttributeDefinition::single(Str)),
                ("confidence", AttributeDefinition::single(Numeric)),
                ("start_time", AttributeDefinition::single(Date)),
                ("stop_time", AttributeDefinition::single(Date)),
            ]),
        };

        for name in [
            RELATION_PART_OF,
            RELATION_LOCATED_AT,
            RELATION_TARGETS,
            RELATION_USES,
        ] {
            self.register_relationship(name, core("relationship"));
        }

        self.register_relationship(
            RELATION_SIGHTING_OF,
            RelationshipTypeDef {
                wire_type: "sighting".into(),
                attributes: attrs(&[
                    ("description", AttributeDefinition::single(Str)),
                    ("confidence", AttributeDefinition::single(Numeric)),
                    ("count", AttributeDefinition::single(Numeric)),
                    ("first_seen", AttributeDefinition::single(Date)),
                    ("last_seen", AttributeDefinition::single(Date)),
                ]),
            },
        );
    }

    fn register_relation_refs(&mut self) {
        self.relation_refs.insert(
            "createdBy".into(),
            RelationRefDefinition {
                wire_name: "created_by_ref".into(),
                multiple: false,
                shape: RefShape::Id,
            },
        );
        self.relation_refs.insert(
            "objectLabel".into(),
            RelationRefDefinition {
                wire_name: "labels".into(),
                multiple: true,
                shape: RefShape::Value("value".into()),
            },
        );
        self.relation_refs.insert(
            "externalReferences".into(),
            RelationRefDefinition {
                wire_name: "external_references".into(),
                multiple: true,
                shape: RefShape::Inline,
            },
        );
        self.relation_refs.insert(
            "objectMarking".into(),
            RelationRefDefinition {
                wire_name: "object_marking_refs".into(),
                multiple: true,
                shape: RefShape::Id,
            },
        );
    }
}

fn attrs(defs: &[(&str, AttributeDefinition)]) -> HashMap<String, AttributeDefinition> {
    defs.iter()
        .map(|(key, def)| (key.to_string(), def.clone()))
        .collect()
}

impl SchemaRegistry for BuiltinSchema {
    fn is_known_entity_type(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }

    fn is_known_relationship_type(&self, entity_type: &str) -> bool {
        self.relationships.contains_key(entity_type)
    }

    fn attribute(&self, entity_type: &str, key: &str) -> Option<&AttributeDefinition> {
        if let Some(def) = self.entities.get(entity_type) {
            return def.attributes.get(key);
        }
        self.relationships
            .get(entity_type)
            .and_then(|def| def.attributes.get(key))
    }

    fn relation_ref(&self, entity_type: &str, key: &str) -> Option<&RelationRefDefinition> {
        // Reference attributes are shared across the model; the type argument
        // is kept so a registry can narrow them per type.
        let _ = entity_type;
        self.relation_refs.get(key)
    }

    fn inner_properties(&self, entity_type: &str) -> Vec<(String, Value)> {
        self.entities
            .get(entity_type)
            .map(|def| def.inner_properties.clone())
            .unwrap_or_default()
    }

    fn identity_keys(&self, entity_type: &str) -> Vec<String> {
        self.entities
            .get(entity_type)
            .map(|def| def.identity_keys.clone())
            .unwrap_or_default()
    }

    fn wire_type(&self, entity_type: &str) -> Option<&str> {
        if let Some(def) = self.entities.get(entity_type) {
            return Some(&def.wire_type);
        }
        self.relationships
            .get(entity_type)
            .map(|def| def.wire_type.as_str())
    }

    fn is_inline_type(&self, entity_type: &str) -> bool {
        self.entities
            .get(entity_type)
            .map(|def| def.inline)
            .unwrap_or(false)
    }
}
