//! Structural schema validation
//!
//! Validation outcomes are data, not errors: callers decide whether a
//! non-empty error list blocks persistence. Warnings never do.

use crate::field::{FieldKey, PlaceholderField};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Key does not match `[a-z0-9_]{2,64}`
    MalformedKey {
        /// The offending key
        key: FieldKey,
    },
    /// The same key appears more than once in the candidate field list
    DuplicateKey {
        /// The duplicated key
        key: FieldKey,
    },
    /// An enum field without an options list cannot be filled
    EnumWithoutOptions {
        /// The offending key
        key: FieldKey,
    },
    /// Field carries no structural locations; it may be unused in the document
    NoLocations {
        /// The offending key
        key: FieldKey,
    },
    /// Options supplied on a field type that ignores them
    OptionsOnNonEnum {
        /// The offending key
        key: FieldKey,
    },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedKey { key } => write!(f, "malformed field key: {key}"),
            Self::DuplicateKey { key } => write!(f, "duplicate field key: {key}"),
            Self::EnumWithoutOptions { key } => write!(f, "enum field without options: {key}"),
            Self::NoLocations { key } => write!(f, "field has no locations: {key}"),
            Self::OptionsOnNonEnum { key } => write!(f, "options on non-enum field: {key}"),
        }
    }
}

/// Outcome of validating a candidate field list
///
/// Errors block persistence; warnings are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaValidation {
    /// Findings that block persistence
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings
    pub warnings: Vec<ValidationIssue>,
}

impl SchemaValidation {
    /// Whether the candidate may be persisted
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for SchemaValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid ({} warnings)", self.warnings.len());
        }
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Validate a candidate field list for structural correctness
///
/// Checks key well-formedness, duplicate keys, and enum/options coherence.
/// Location-less fields and stray options are reported as warnings only.
#[must_use]
pub fn validate_fields(fields: &[PlaceholderField]) -> SchemaValidation {
    let mut validation = SchemaValidation::default();
    let mut seen: HashSet<&FieldKey> = HashSet::with_capacity(fields.len());

    for field in fields {
        let key = &field.field_key;

        if !key.is_well_formed() {
            validation.errors.push(ValidationIssue::MalformedKey { key: key.clone() });
        }
        if !seen.insert(key) {
            validation.errors.push(ValidationIssue::DuplicateKey { key: key.clone() });
        }

        let has_options = field.options.as_ref().is_some_and(|opts| !opts.is_empty());
        if field.field_type.requires_options() && !has_options {
            validation
                .errors
                .push(ValidationIssue::EnumWithoutOptions { key: key.clone() });
        } else if !field.field_type.requires_options() && field.options.is_some() {
            validation
                .warnings
                .push(ValidationIssue::OptionsOnNonEnum { key: key.clone() });
        }

        if field.locations.is_empty() {
            validation.warnings.push(ValidationIssue::NoLocations { key: key.clone() });
        }
    }

    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn field(key: &str) -> PlaceholderField {
        PlaceholderField::new(key, key.to_uppercase(), FieldType::String)
            .with_locations(vec!["body".into()])
    }

    #[test]
    fn clean_fields_validate() {
        let fields = vec![field("client_name"), field("due_date")];
        let validation = validate_fields(&fields);
        assert!(validation.is_valid());
        assert!(validation.warnings.is_empty());
    }

    #[test]
    fn malformed_key_is_an_error() {
        let fields = vec![field("Bad-Key")];
        let validation = validate_fields(&fields);
        assert!(!validation.is_valid());
        assert!(matches!(
            validation.errors.as_slice(),
            [ValidationIssue::MalformedKey { .. }]
        ));
    }

    #[test]
    fn duplicate_key_is_an_error() {
        let fields = vec![field("client_name"), field("client_name")];
        let validation = validate_fields(&fields);
        assert_eq!(
            validation.errors,
            vec![ValidationIssue::DuplicateKey {
                key: FieldKey::new("client_name")
            }]
        );
    }

    #[test]
    fn enum_without_options_is_an_error() {
        let fields = vec![
            PlaceholderField::new("state", "State", FieldType::Enum)
                .with_locations(vec!["body".into()]),
        ];
        let validation = validate_fields(&fields);
        assert!(matches!(
            validation.errors.as_slice(),
            [ValidationIssue::EnumWithoutOptions { .. }]
        ));
    }

    #[test]
    fn orphan_and_stray_options_are_warnings() {
        let fields = vec![
            PlaceholderField::new("client_name", "Client", FieldType::String)
                .with_options(vec!["x".into()]),
        ];
        let validation = validate_fields(&fields);
        assert!(validation.is_valid());
        assert_eq!(validation.warnings.len(), 2);
    }
}
