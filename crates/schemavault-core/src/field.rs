//! Placeholder fields and schemas
//!
//! A [`PlaceholderField`] is a named, typed slot to be filled in a generated
//! document. A [`PlaceholderSchema`] is an order-irrelevant set of fields
//! indexed by their [`FieldKey`].

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern every well-formed field key must match.
pub const FIELD_KEY_PATTERN: &str = "^[a-z0-9_]{2,64}$";

static FIELD_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(FIELD_KEY_PATTERN).expect("field key pattern is a valid regex")
});

/// Stable identifier of a placeholder field within a schema
///
/// Construction is unchecked because keys arrive from untrusted wire data;
/// well-formedness is enforced by [`crate::validate_fields`] before any
/// schema is persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    /// Wrap a raw key string
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the key against the required `[a-z0-9_]{2,64}` pattern
    #[inline]
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        FIELD_KEY_RE.is_match(&self.0)
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Value type of a placeholder field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free-form text
    String,
    /// Numeric value
    Number,
    /// Calendar date
    Date,
    /// True/false flag
    Boolean,
    /// One of a fixed set of options
    Enum,
    /// Postal address
    Address,
    /// Phone number
    Phone,
    /// Email address
    Email,
}

impl FieldType {
    /// Whether this type requires an `options` list
    #[inline]
    #[must_use]
    pub fn requires_options(self) -> bool {
        matches!(self, Self::Enum)
    }
}

/// A named, typed slot in a document template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderField {
    /// Stable identifier, unique within a schema
    pub field_key: FieldKey,
    /// Human-readable label
    pub label: String,
    /// Value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Structural hints where the field appears in the source document
    #[serde(default)]
    pub locations: Vec<String>,
    /// Whether the field must be filled
    #[serde(default)]
    pub required: bool,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Options for enum fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Free-form validation hint (e.g. a format string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    /// Extraction confidence, when the field came from automated analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl PlaceholderField {
    /// Create a minimal field with the given key, label and type
    #[must_use]
    pub fn new(key: impl Into<FieldKey>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_key: key.into(),
            label: label.into(),
            field_type,
            locations: Vec::new(),
            required: false,
            description: None,
            options: None,
            validation: None,
            confidence: None,
        }
    }

    /// With structural locations
    #[must_use]
    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    /// Mark the field required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// With enum options
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Canonical, order-independent signature of this field's locations
    ///
    /// Two fields occupying the same physical locations produce the same
    /// signature regardless of location order. Returns `None` when the field
    /// has no locations, so location-less fields never alias each other.
    #[must_use]
    pub fn location_signature(&self) -> Option<String> {
        if self.locations.is_empty() {
            return None;
        }
        let mut parts: Vec<String> = self
            .locations
            .iter()
            .map(|loc| loc.trim().to_lowercase())
            .collect();
        parts.sort();
        parts.dedup();
        Some(parts.join("|"))
    }
}

/// An order-irrelevant set of placeholder fields, indexed by key
///
/// Serialized as a plain field list; indexing is an in-memory concern.
/// Insertion is first-writer-wins: a later field with an existing key never
/// displaces the one already present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "Vec<PlaceholderField>", from = "Vec<PlaceholderField>")]
pub struct PlaceholderSchema {
    fields: IndexMap<FieldKey, PlaceholderField>,
}

impl PlaceholderSchema {
    /// Create an empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a field list, first-writer-wins on duplicate keys
    #[must_use]
    pub fn from_fields(fields: impl IntoIterator<Item = PlaceholderField>) -> Self {
        let mut schema = Self::new();
        for field in fields {
            schema.insert(field);
        }
        schema
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a field with this key exists
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Look up a field by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&PlaceholderField> {
        self.fields.get(key)
    }

    /// Insert a field unless its key is already present
    ///
    /// Returns `true` if the field was inserted.
    pub fn insert(&mut self, field: PlaceholderField) -> bool {
        match self.fields.entry(field.field_key.clone()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(field);
                true
            }
        }
    }

    /// Replace the field with the same key, if present
    ///
    /// Returns `true` if a field was replaced. A replace against an absent
    /// key is a no-op.
    pub fn replace(&mut self, field: PlaceholderField) -> bool {
        match self.fields.entry(field.field_key.clone()) {
            indexmap::map::Entry::Occupied(mut entry) => {
                entry.insert(field);
                true
            }
            indexmap::map::Entry::Vacant(_) => false,
        }
    }

    /// Remove a field by key
    ///
    /// Returns the removed field, if any.
    pub fn remove(&mut self, key: &FieldKey) -> Option<PlaceholderField> {
        self.fields.shift_remove(key)
    }

    /// Iterate fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &PlaceholderField> {
        self.fields.values()
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.keys()
    }
}

impl From<PlaceholderSchema> for Vec<PlaceholderField> {
    fn from(schema: PlaceholderSchema) -> Self {
        schema.fields.into_values().collect()
    }
}

impl From<Vec<PlaceholderField>> for PlaceholderSchema {
    fn from(fields: Vec<PlaceholderField>) -> Self {
        Self::from_fields(fields)
    }
}

impl FromIterator<PlaceholderField> for PlaceholderSchema {
    fn from_iter<I: IntoIterator<Item = PlaceholderField>>(iter: I) -> Self {
        Self::from_fields(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_well_formed() {
        assert!(FieldKey::new("client_name").is_well_formed());
        assert!(FieldKey::new("a2").is_well_formed());
        assert!(!FieldKey::new("A").is_well_formed());
        assert!(!FieldKey::new("x").is_well_formed());
        assert!(!FieldKey::new("has-dash").is_well_formed());
        assert!(!FieldKey::new("has space").is_well_formed());
        assert!(!FieldKey::new("k".repeat(65)).is_well_formed());
    }

    #[test]
    fn schema_insert_first_writer_wins() {
        let mut schema = PlaceholderSchema::new();
        let first = PlaceholderField::new("client_name", "Client", FieldType::String);
        let second = PlaceholderField::new("client_name", "Renamed", FieldType::String);

        assert!(schema.insert(first));
        assert!(!schema.insert(second));
        assert_eq!(
            schema.get(&FieldKey::new("client_name")).map(|f| f.label.as_str()),
            Some("Client")
        );
    }

    #[test]
    fn schema_replace_requires_presence() {
        let mut schema = PlaceholderSchema::from_fields([PlaceholderField::new(
            "client_name",
            "Client",
            FieldType::String,
        )]);

        let updated = PlaceholderField::new("client_name", "Full name", FieldType::String);
        assert!(schema.replace(updated));
        assert_eq!(
            schema.get(&FieldKey::new("client_name")).map(|f| f.label.as_str()),
            Some("Full name")
        );

        let absent = PlaceholderField::new("missing", "Missing", FieldType::String);
        assert!(!schema.replace(absent));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn location_signature_is_order_independent() {
        let a = PlaceholderField::new("a1", "A", FieldType::String)
            .with_locations(vec!["Header".into(), "page 2".into()]);
        let b = PlaceholderField::new("b1", "B", FieldType::String)
            .with_locations(vec!["page 2".into(), " header ".into()]);

        assert_eq!(a.location_signature(), b.location_signature());
    }

    #[test]
    fn location_signature_absent_for_no_locations() {
        let field = PlaceholderField::new("a1", "A", FieldType::String);
        assert!(field.location_signature().is_none());
    }

    #[test]
    fn schema_round_trips_as_field_list() {
        let schema = PlaceholderSchema::from_fields([
            PlaceholderField::new("first", "First", FieldType::String),
            PlaceholderField::new("second", "Second", FieldType::Date).required(),
        ]);

        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.is_array());

        let back: PlaceholderSchema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }
}
