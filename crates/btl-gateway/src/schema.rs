//! Result schemas that generated output must satisfy.
//!
//! A [`ResultSchema`] describes a flat JSON object: named fields, each with
//! a kind and a `required` flag. It is deliberately small so it can be
//! restated verbatim in a prompt and checked without a schema engine.
//!
//! ```json
//! {
//!   "fields": {
//!     "title": { "type": "string" },
//!     "mood":  { "type": "enum", "values": ["calm", "tense"] },
//!     "score": { "type": "integer", "required": false }
//!   },
//!   "additionalFields": false
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of value a field must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Any JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number with no fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// Any JSON array.
    Array,
    /// Any JSON object.
    Object,
    /// One of a fixed set of strings.
    Enum {
        /// Allowed values.
        values: Vec<String>,
    },
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Enum { values } => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Integer => f.write_str("integer"),
            Self::Boolean => f.write_str("boolean"),
            Self::Array => f.write_str("array"),
            Self::Object => f.write_str("object"),
            Self::Enum { values } => {
                f.write_str("one of ")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                Ok(())
            },
        }
    }
}

const fn default_true() -> bool {
    true
}

/// One named field of a result schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Kind of value.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the field must be present. Defaults to `true`.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Optional hint passed to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    /// A required field of the given kind.
    #[must_use]
    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            description: None,
        }
    }

    /// An optional field of the given kind.
    #[must_use]
    pub fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Why a value does not conform to a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation(pub String);

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schema for a generated JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSchema {
    /// Named fields, in stable order.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
    /// Whether fields not listed are tolerated. Defaults to `true`.
    #[serde(default = "default_true")]
    pub additional_fields: bool,
}

impl ResultSchema {
    /// An empty schema that tolerates extra fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            additional_fields: true,
        }
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Forbid fields not listed in the schema.
    #[must_use]
    pub fn deny_additional_fields(mut self) -> Self {
        self.additional_fields = false;
        self
    }

    /// Check that the schema itself is usable.
    ///
    /// # Errors
    ///
    /// Returns a violation for an empty field name or an enum with no values.
    pub fn check_well_formed(&self) -> Result<(), SchemaViolation> {
        for (name, field) in &self.fields {
            if name.is_empty() {
                return Err(SchemaViolation("field names must not be empty".into()));
            }
            if let FieldKind::Enum { values } = &field.kind
                && values.is_empty()
            {
                return Err(SchemaViolation(format!(
                    "enum field {name:?} has no allowed values"
                )));
            }
        }
        Ok(())
    }

    /// Check `value` against the schema.
    ///
    /// Optional fields may be absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let Some(object) = value.as_object() else {
            return Err(SchemaViolation("expected a JSON object".into()));
        };

        for (name, field) in &self.fields {
            match object.get(name) {
                None | Some(Value::Null) if !field.required => {},
                None => {
                    return Err(SchemaViolation(format!("missing required field {name:?}")));
                },
                Some(v) if !field.kind.accepts(v) => {
                    return Err(SchemaViolation(format!(
                        "field {name:?} must be {}",
                        field.kind
                    )));
                },
                Some(_) => {},
            }
        }

        if !self.additional_fields
            && let Some(extra) = object.keys().find(|k| !self.fields.contains_key(*k))
        {
            return Err(SchemaViolation(format!("unexpected field {extra:?}")));
        }

        Ok(())
    }

    /// Render the schema as a bullet list for inclusion in a prompt.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (name, field) in &self.fields {
            let presence = if field.required { "required" } else { "optional" };
            let _ = write!(out, "- {name:?}: {} ({presence})", field.kind);
            if let Some(desc) = &field.description {
                let _ = write!(out, " - {desc}");
            }
            out.push('\n');
        }
        if !self.additional_fields {
            out.push_str("No other fields are allowed.\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story_schema() -> ResultSchema {
        ResultSchema::new()
            .field("title", FieldSchema::required(FieldKind::String))
            .field(
                "mood",
                FieldSchema::required(FieldKind::Enum {
                    values: vec!["calm".into(), "tense".into()],
                }),
            )
            .field("score", FieldSchema::optional(FieldKind::Integer))
    }

    #[test]
    fn test_accepts_conforming_value() {
        let schema = story_schema();
        assert!(schema.validate(&json!({"title": "t", "mood": "calm"})).is_ok());
        assert!(
            schema
                .validate(&json!({"title": "t", "mood": "tense", "score": 3, "x": 1}))
                .is_ok()
        );
        assert!(
            schema
                .validate(&json!({"title": "t", "mood": "calm", "score": null}))
                .is_ok()
        );
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(story_schema().validate(&json!(["title"])).is_err());
        assert!(story_schema().validate(&json!("x")).is_err());
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = story_schema().validate(&json!({"title": "t"})).unwrap_err();
        assert!(err.0.contains("mood"));
    }

    #[test]
    fn test_rejects_wrong_kinds() {
        let schema = story_schema();
        assert!(schema.validate(&json!({"title": 1, "mood": "calm"})).is_err());
        assert!(schema.validate(&json!({"title": "t", "mood": "happy"})).is_err());
        assert!(
            schema
                .validate(&json!({"title": "t", "mood": "calm", "score": 1.5}))
                .is_err()
        );
    }

    #[test]
    fn test_additional_fields_denied() {
        let schema = story_schema().deny_additional_fields();
        let err = schema
            .validate(&json!({"title": "t", "mood": "calm", "extra": true}))
            .unwrap_err();
        assert!(err.0.contains("extra"));
    }

    #[test]
    fn test_well_formed() {
        assert!(story_schema().check_well_formed().is_ok());
        let bad = ResultSchema::new().field(
            "e",
            FieldSchema::required(FieldKind::Enum { values: vec![] }),
        );
        assert!(bad.check_well_formed().is_err());
    }

    #[test]
    fn test_describe_lists_fields_and_enum_values() {
        let text = story_schema().deny_additional_fields().describe();
        assert!(text.contains("- \"mood\": one of \"calm\", \"tense\" (required)"));
        assert!(text.contains("- \"score\": integer (optional)"));
        assert!(text.contains("No other fields are allowed."));
    }

    #[test]
    fn test_deserialize_wire_form() {
        let schema: ResultSchema = serde_json::from_value(json!({
            "fields": {
                "title": {"type": "string"},
                "mood": {"type": "enum", "values": ["calm", "tense"]},
                "score": {"type": "integer", "required": false},
            },
            "additionalFields": false,
        }))
        .unwrap();
        assert_eq!(schema, story_schema().deny_additional_fields());
    }
}
