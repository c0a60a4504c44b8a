//! # Document Size Model
//!
//! Estimates how many bytes a candidate design occupies on disk. The model is a
//! closed-form walk over each collection's field tree:
//!
//! ```text
//! doc_size   = Σ over fields (KEY_OVERHEAD + payload(field))
//! payload    = scalar:  TYPE_COST[kind]           (unknown kinds cost as a string)
//!              object:  Σ over sub-fields (KEY_OVERHEAD + payload(sub))
//!              array:   KEY_OVERHEAD + avg_len * item_size
//! item_size  = object template: Σ over sub-fields (KEY_OVERHEAD + payload(sub))
//!              other template:  payload(template)
//! ```
//!
//! Every field at every nesting level pays the 12-byte key charge. An array pays it
//! twice: once as a field, once for the array header.
//!
//! `avg_len` comes from the shared [`StatisticsSnapshot`], keyed by the array's
//! dotted path inside the document; the fractional product is rounded to the
//! nearest byte.
//!
//! Collection and database sizes are exact integer products (`u128`); conversion to
//! GiB is provided for reporting but the byte values are the source of truth.
//! Document sizes saturate at `u64::MAX` when an absurd average array length would
//! push them past it.

use crate::catalog::{CollectionSchema, FieldSpec, SchemaCatalog};
use crate::stats::StatisticsSnapshot;
use serde::Serialize;

/// Per-field key/overhead charge in bytes.
pub const KEY_OVERHEAD: u64 = 12;

/// Byte cost charged for type names outside the fixed table.
pub const DEFAULT_TYPE_COST: u64 = 80;

pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Payload size of a scalar kind. Structured kinds and unknown names get the
/// string-like default.
pub fn scalar_cost(spec: &FieldSpec) -> u64 {
    match spec {
        FieldSpec::Integer | FieldSpec::Number => 8,
        FieldSpec::String => 80,
        FieldSpec::Date => 20,
        FieldSpec::Longstring => 200,
        _ => DEFAULT_TYPE_COST,
    }
}

pub fn bytes_to_gib(bytes: u128) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

/// Sizes computed for one collection of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSize {
    pub collection: String,
    pub document_bytes: u64,
    pub documents: u64,
    pub total_bytes: u128,
}

impl CollectionSize {
    pub fn total_gib(&self) -> f64 {
        bytes_to_gib(self.total_bytes)
    }
}

/// Document and collection sizes for every collection a candidate declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSizeReport {
    pub collections: Vec<CollectionSize>,
    pub total_bytes: u128,
    pub total_gib: f64,
}

/// Size estimator for one candidate against the shared statistics.
pub struct SizeModel<'a> {
    catalog: &'a SchemaCatalog,
    stats: &'a StatisticsSnapshot,
}

impl<'a> SizeModel<'a> {
    pub fn new(catalog: &'a SchemaCatalog, stats: &'a StatisticsSnapshot) -> Self {
        Self { catalog, stats }
    }

    /// Bytes per document; 0 if the candidate does not declare the collection.
    pub fn document_size(&self, collection: &str) -> u64 {
        self.catalog
            .collection(collection)
            .map(|schema| self.schema_size(schema))
            .unwrap_or(0)
    }

    fn schema_size(&self, schema: &CollectionSchema) -> u64 {
        schema
            .fields
            .iter()
            .map(|(name, spec)| {
                KEY_OVERHEAD.saturating_add(self.payload(&schema.name, name, spec))
            })
            .fold(0, u64::saturating_add)
    }

    fn payload(&self, collection: &str, path: &str, spec: &FieldSpec) -> u64 {
        match spec {
            FieldSpec::Object { properties } => self.members_size(collection, path, properties),
            FieldSpec::Array { items } => {
                let avg_len = self.stats.avg_len(collection, path);
                let item_size = match items.as_ref() {
                    FieldSpec::Object { properties } => {
                        self.members_size(collection, path, properties)
                    }
                    other => self.payload(collection, path, other),
                };
                // Float-to-int `as` saturates; the sum must too.
                KEY_OVERHEAD.saturating_add((avg_len * item_size as f64).round() as u64)
            }
            scalar => scalar_cost(scalar),
        }
    }

    fn members_size(&self, collection: &str, path: &str, members: &[(String, FieldSpec)]) -> u64 {
        members
            .iter()
            .map(|(name, spec)| {
                let child = format!("{path}.{name}");
                KEY_OVERHEAD.saturating_add(self.payload(collection, &child, spec))
            })
            .fold(0, u64::saturating_add)
    }

    /// `cardinality * document_size`, exact.
    pub fn collection_size_bytes(&self, collection: &str) -> u128 {
        self.stats.cardinality(collection) as u128 * self.document_size(collection) as u128
    }

    pub fn collection_size_gib(&self, collection: &str) -> f64 {
        bytes_to_gib(self.collection_size_bytes(collection))
    }

    /// Sum over the collections this candidate declares (not over every
    /// collection in the statistics).
    pub fn database_size_bytes(&self) -> u128 {
        self.catalog
            .collections()
            .map(|c| self.collection_size_bytes(&c.name))
            .fold(0, u128::saturating_add)
    }

    pub fn database_size_gib(&self) -> f64 {
        bytes_to_gib(self.database_size_bytes())
    }

    pub fn report(&self) -> DatabaseSizeReport {
        let collections: Vec<CollectionSize> = self
            .catalog
            .collections()
            .map(|c| {
                let document_bytes = self.schema_size(c);
                let documents = self.stats.cardinality(&c.name);
                CollectionSize {
                    collection: c.name.clone(),
                    document_bytes,
                    documents,
                    total_bytes: documents as u128 * document_bytes as u128,
                }
            })
            .collect();
        let total_bytes = collections
            .iter()
            .map(|c| c.total_bytes)
            .fold(0, u128::saturating_add);
        DatabaseSizeReport {
            collections,
            total_bytes,
            total_gib: bytes_to_gib(total_bytes),
        }
    }
}
