//! # Schema Catalog
//!
//! The catalog holds one candidate design's collection layouts: for every collection,
//! the ordered list of fields and their types. It is the "what does a document look
//! like" half of the estimator's input; the other half is the shared
//! [`StatisticsSnapshot`](crate::stats::StatisticsSnapshot).
//!
//! ## Field Tree
//!
//! A field's type is a [`FieldSpec`], a recursive enum over the seven kinds found in
//! schema descriptions. Two kinds carry children:
//!
//! - **`Object`**: an ordered list of named sub-fields.
//! - **`Array`**: a single item template (usually an `Object`).
//!
//! Any other type name decodes to [`FieldSpec::Other`] instead of failing. The size
//! model charges it like a short string; the catalog remembers where it appeared so
//! the caller can report it (see [`SchemaCatalog::unknown_field_types`]).
//!
//! ## Input Shape
//!
//! ```text
//! [
//!   { "collection": "Product",
//!     "properties": {
//!       "IDP":    { "type": "integer" },
//!       "price":  { "type": "number" },
//!       "supplier": { "type": "object", "properties": { "name": { "type": "string" } } },
//!       "stocks": { "type": "array", "items": { "properties": { "IDW": { "type": "integer" } } } }
//!     } }
//! ]
//! ```
//!
//! Field order is declaration order, which is why the workspace enables serde_json's
//! `preserve_order` feature.

use crate::error::LoadError;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Type of a single field, possibly with nested structure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Integer,
    Number,
    String,
    Date,
    Longstring,
    Object { properties: Vec<(String, FieldSpec)> },
    Array { items: Box<FieldSpec> },
    /// A type name outside the fixed table; sized like a string.
    Other { name: String },
}

impl FieldSpec {
    /// Name of the kind as it appears in schema descriptions.
    pub fn type_name(&self) -> &str {
        match self {
            FieldSpec::Integer => "integer",
            FieldSpec::Number => "number",
            FieldSpec::String => "string",
            FieldSpec::Date => "date",
            FieldSpec::Longstring => "longstring",
            FieldSpec::Object { .. } => "object",
            FieldSpec::Array { .. } => "array",
            FieldSpec::Other { name } => name.as_str(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldSpec::Object { .. } | FieldSpec::Array { .. })
    }

    /// Decode one field description. `path` is used for error messages only.
    pub fn from_json(value: &Value, path: &str) -> Result<Self, LoadError> {
        let obj = value.as_object().ok_or_else(|| LoadError::InvalidField {
            path: path.to_string(),
            reason: "field description must be an object".to_string(),
        })?;
        let type_name = match obj.get("type") {
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(LoadError::InvalidField {
                    path: path.to_string(),
                    reason: "`type` must be a string".to_string(),
                })
            }
            None => {
                return Err(LoadError::MissingField {
                    path: path.to_string(),
                    field: "type",
                })
            }
        };

        let spec = match type_name {
            "integer" => FieldSpec::Integer,
            "number" => FieldSpec::Number,
            "string" => FieldSpec::String,
            "date" => FieldSpec::Date,
            "longstring" => FieldSpec::Longstring,
            "object" => FieldSpec::Object {
                properties: decode_properties(obj, path)?,
            },
            "array" => {
                let items = obj.get("items").ok_or_else(|| LoadError::MissingField {
                    path: path.to_string(),
                    field: "items",
                })?;
                FieldSpec::Array {
                    items: Box::new(decode_item_template(items, &format!("{path}[]"))?),
                }
            }
            other => FieldSpec::Other {
                name: other.to_string(),
            },
        };
        Ok(spec)
    }
}

/// Item templates are usually written without a `type`, as a bare
/// `{properties: {...}}`; that form is read as an object.
fn decode_item_template(value: &Value, path: &str) -> Result<FieldSpec, LoadError> {
    match value.as_object() {
        Some(obj) if !obj.contains_key("type") => Ok(FieldSpec::Object {
            properties: decode_properties(obj, path)?,
        }),
        _ => FieldSpec::from_json(value, path),
    }
}

fn decode_properties(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Vec<(String, FieldSpec)>, LoadError> {
    let props = obj
        .get("properties")
        .ok_or_else(|| LoadError::MissingField {
            path: path.to_string(),
            field: "properties",
        })?
        .as_object()
        .ok_or_else(|| LoadError::InvalidField {
            path: path.to_string(),
            reason: "`properties` must be an object".to_string(),
        })?;

    props
        .iter()
        .map(|(name, spec)| {
            let child_path = format!("{path}.{name}");
            Ok((name.clone(), FieldSpec::from_json(spec, &child_path)?))
        })
        .collect()
}

/// One collection's layout.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<(String, FieldSpec)>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>, fields: Vec<(String, FieldSpec)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
}

/// All collections of one candidate design, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaCatalog {
    collections: Vec<CollectionSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-constructed collections. Names must be unique.
    pub fn from_collections(collections: Vec<CollectionSchema>) -> Result<Self, LoadError> {
        let mut seen = HashSet::new();
        for c in &collections {
            if !seen.insert(c.name.as_str()) {
                return Err(LoadError::DuplicateCollection(c.name.clone()));
            }
        }
        Ok(Self { collections })
    }

    /// Decode a schema description (see the module docs for the shape).
    pub fn from_json(value: &Value) -> Result<Self, LoadError> {
        let entries = value.as_array().ok_or(LoadError::NotAList)?;
        let mut collections = Vec::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            let path = format!("[{idx}]");
            let obj = entry.as_object().ok_or_else(|| LoadError::InvalidField {
                path: path.clone(),
                reason: "collection entry must be an object".to_string(),
            })?;
            let name = obj
                .get("collection")
                .ok_or_else(|| LoadError::MissingField {
                    path: path.clone(),
                    field: "collection",
                })?
                .as_str()
                .ok_or_else(|| LoadError::InvalidField {
                    path: path.clone(),
                    reason: "`collection` must be a string".to_string(),
                })?;
            let fields = decode_properties(obj, name)?;
            collections.push(CollectionSchema::new(name, fields));
        }

        Self::from_collections(collections)
    }

    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collection(name).is_some()
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionSchema> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Every field whose type fell back to [`FieldSpec::Other`], as
    /// `(dotted path, type name)` pairs.
    pub fn unknown_field_types(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for c in &self.collections {
            for (name, spec) in &c.fields {
                collect_unknown(spec, &format!("{}.{}", c.name, name), &mut out);
            }
        }
        out
    }
}

fn collect_unknown(spec: &FieldSpec, path: &str, out: &mut Vec<(String, String)>) {
    match spec {
        FieldSpec::Other { name } => out.push((path.to_string(), name.clone())),
        FieldSpec::Object { properties } => {
            for (name, child) in properties {
                collect_unknown(child, &format!("{path}.{name}"), out);
            }
        }
        FieldSpec::Array { items } => collect_unknown(items, &format!("{path}[]"), out),
        _ => {}
    }
}
