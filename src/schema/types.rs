//! Schema type definitions
//!
//! A schema is a read-only catalog of types. Each type has an ordered list
//! of fields, exactly one of which is the identifier. A field's base type is
//! a scalar, an enum, or a reference to another type in the catalog.
//!
//! On disk the field type is a single `type` string:
//! - `ID`, `String`, `Int`, `Float`, `Boolean`, `DateTime`: scalars
//! - any other name with a non-empty `values` list: an enum
//! - any other name: a reference to the type of that name

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};

/// Scalar base types, with the coercion table used for mutation input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    #[serde(rename = "ID")]
    Id,
    String,
    Int,
    Float,
    Boolean,
    DateTime,
}

impl ScalarKind {
    /// Parses a schema type name into a scalar kind
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "ID" => Some(ScalarKind::Id),
            "String" => Some(ScalarKind::String),
            "Int" => Some(ScalarKind::Int),
            "Float" => Some(ScalarKind::Float),
            "Boolean" => Some(ScalarKind::Boolean),
            "DateTime" => Some(ScalarKind::DateTime),
            _ => None,
        }
    }

    /// Returns the schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Id => "ID",
            ScalarKind::String => "String",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::DateTime => "DateTime",
        }
    }

    /// Coerces a raw input value into this kind.
    ///
    /// Strings are accepted for every kind (form-style input); numbers and
    /// booleans only where they make sense. `DateTime` is normalized to
    /// RFC 3339 UTC with millisecond precision.
    pub fn coerce(&self, raw: &Value) -> Result<Value, String> {
        match (self, raw) {
            (_, Value::Null) => Ok(Value::Null),

            (ScalarKind::Id, Value::String(_)) => Ok(raw.clone()),
            (ScalarKind::Id, Value::Number(n)) => Ok(Value::String(n.to_string())),

            (ScalarKind::String, Value::String(_)) => Ok(raw.clone()),
            (ScalarKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ScalarKind::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (ScalarKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
            (ScalarKind::Int, Value::Number(n)) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err(format!("expected Int, got {}", n)),
            },
            (ScalarKind::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected Int, got \"{}\"", s)),

            (ScalarKind::Float, Value::Number(_)) => Ok(raw.clone()),
            (ScalarKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| format!("expected Float, got \"{}\"", s)),

            (ScalarKind::Boolean, Value::Bool(_)) => Ok(raw.clone()),
            (ScalarKind::Boolean, Value::String(s)) => match s.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("expected Boolean, got \"{}\"", other)),
            },
            (ScalarKind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(format!("expected Boolean, got {}", n)),
            },

            (ScalarKind::DateTime, Value::String(s)) => parse_timestamp(s)
                .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(|| format!("expected DateTime, got \"{}\"", s)),
            (ScalarKind::DateTime, Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(|| format!("expected DateTime, got {}", n)),

            (kind, other) => Err(format!(
                "expected {}, got {}",
                kind.type_name(),
                json_type_name(other)
            )),
        }
    }
}

/// Parses RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC)
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s.trim()) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// JSON type name for error messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Base type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar value
    Scalar(ScalarKind),
    /// Enumerated string value
    Enum { name: String, values: Vec<String> },
    /// Reference to a document of another type
    Reference(String),
}

impl FieldKind {
    /// Name as written in the schema file
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Scalar(kind) => kind.type_name(),
            FieldKind::Enum { name, .. } => name,
            FieldKind::Reference(target) => target,
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldDef", into = "RawFieldDef")]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Whether the field may be absent or null
    pub nullable: bool,
    /// Whether the field holds a list of its base type
    pub list: bool,
    /// Whether this field identifies documents of its type
    pub identifier: bool,
    /// For references: store the full referenced document instead of a pointer
    pub inline: bool,
}

impl FieldDef {
    /// Create a nullable scalar field
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar(kind),
            nullable: true,
            list: false,
            identifier: false,
            inline: false,
        }
    }

    /// Create the identifier field
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            identifier: true,
            nullable: false,
            ..Self::scalar(name, ScalarKind::Id)
        }
    }

    /// Create a nullable reference field
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Reference(target.into()),
            ..Self::scalar(name, ScalarKind::Id)
        }
    }

    /// Create a nullable enum field
    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            kind: FieldKind::Enum {
                name: enum_name.into(),
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            ..Self::scalar(name, ScalarKind::String)
        }
    }

    /// Mark the field as non-nullable
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the field as a list
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Mark a reference field as stored inline
    pub fn inlined(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Target type name when this field is a reference
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// Key under which a non-inline reference is persisted
    pub fn pointer_key(&self) -> String {
        format!("{}_id", self.name)
    }
}

/// On-disk shape of a field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldDef {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
    #[serde(default = "default_true")]
    nullable: bool,
    #[serde(default)]
    list: bool,
    #[serde(default)]
    identifier: bool,
    #[serde(default)]
    inline: bool,
}

fn default_true() -> bool {
    true
}

impl From<RawFieldDef> for FieldDef {
    fn from(raw: RawFieldDef) -> Self {
        let kind = if !raw.values.is_empty() {
            FieldKind::Enum {
                name: raw.type_name,
                values: raw.values,
            }
        } else if let Some(scalar) = ScalarKind::from_type_name(&raw.type_name) {
            FieldKind::Scalar(scalar)
        } else {
            FieldKind::Reference(raw.type_name)
        };

        Self {
            name: raw.name,
            kind,
            nullable: raw.nullable && !raw.identifier,
            list: raw.list,
            identifier: raw.identifier,
            inline: raw.inline,
        }
    }
}

impl From<FieldDef> for RawFieldDef {
    fn from(field: FieldDef) -> Self {
        let (type_name, values) = match field.kind {
            FieldKind::Scalar(kind) => (kind.type_name().to_string(), Vec::new()),
            FieldKind::Enum { name, values } => (name, values),
            FieldKind::Reference(target) => (target, Vec::new()),
        };
        Self {
            name: field.name,
            type_name,
            values,
            nullable: field.nullable,
            list: field.list,
            identifier: field.identifier,
            inline: field.inline,
        }
    }
}

/// Type-level mutation annotation
///
/// `operations` holds extra operation descriptors, one string each:
/// `name: assign = [a, b], set = { k: v }, context = "modify"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAnnotation {
    #[serde(default = "default_true")]
    pub create: bool,
    #[serde(default = "default_true")]
    pub update: bool,
    #[serde(default = "default_true")]
    pub delete: bool,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl Default for MutationAnnotation {
    fn default() -> Self {
        Self {
            create: true,
            update: true,
            delete: true,
            operations: Vec::new(),
        }
    }
}

/// Type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Root accessor returning a list (default: singular + "s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    /// Root accessor returning one document (default: lower-first name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,
    #[serde(default)]
    pub mutations: MutationAnnotation,
}

impl TypeDef {
    /// Create a type with the given fields and default annotations
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            plural: None,
            singular: None,
            mutations: MutationAnnotation::default(),
        }
    }

    /// Override the plural accessor
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    /// Replace the mutation annotation
    pub fn with_mutations(mut self, mutations: MutationAnnotation) -> Self {
        self.mutations = mutations;
        self
    }

    /// Looks up a field by exact name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field comparing the first letter case-insensitively
    pub fn field_loose(&self, name: &str) -> Option<&FieldDef> {
        self.field(name)
            .or_else(|| self.fields.iter().find(|f| eq_first_letter_insensitive(&f.name, name)))
    }

    /// The identifier field
    pub fn identifier(&self) -> SchemaResult<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.identifier)
            .ok_or_else(|| SchemaError::MissingIdentifier(self.name.clone()))
    }

    /// Name of the identifier field, `"id"` if none is declared
    pub fn identifier_name(&self) -> &str {
        self.fields
            .iter()
            .find(|f| f.identifier)
            .map(|f| f.name.as_str())
            .unwrap_or("id")
    }

    /// Singular root accessor
    pub fn singular_name(&self) -> String {
        self.singular
            .clone()
            .unwrap_or_else(|| lower_first(&self.name))
    }

    /// Plural root accessor
    pub fn plural_name(&self) -> String {
        self.plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.singular_name()))
    }
}

/// Complete schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub types: Vec<TypeDef>,
}

impl Schema {
    /// Create a schema from type definitions
    pub fn new(types: Vec<TypeDef>) -> Self {
        Self { types }
    }

    /// Looks up a type by name
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Looks up a type, failing with `UnknownType`
    pub fn require_type(&self, name: &str) -> SchemaResult<&TypeDef> {
        self.get_type(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Validates the catalog itself (not documents).
    ///
    /// - every type has exactly one identifier field
    /// - field names are unique per type
    /// - reference targets exist
    /// - root accessors do not collide
    pub fn validate_structure(&self) -> SchemaResult<()> {
        let mut accessors: Vec<String> = Vec::new();

        for type_def in &self.types {
            let identifiers = type_def.fields.iter().filter(|f| f.identifier).count();
            match identifiers {
                0 => return Err(SchemaError::MissingIdentifier(type_def.name.clone())),
                1 => {}
                _ => return Err(SchemaError::MultipleIdentifiers(type_def.name.clone())),
            }

            for (i, field) in type_def.fields.iter().enumerate() {
                if type_def.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(SchemaError::DuplicateField {
                        type_name: type_def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if let Some(target) = field.reference_target() {
                    if self.get_type(target).is_none() {
                        return Err(SchemaError::UnknownReference {
                            type_name: type_def.name.clone(),
                            field: field.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }

            for accessor in [type_def.singular_name(), type_def.plural_name()] {
                if accessors.contains(&accessor) {
                    return Err(SchemaError::DuplicateAccessor(accessor));
                }
                accessors.push(accessor);
            }
        }

        Ok(())
    }
}

/// Lower-cases the first character
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-cases the first character
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn eq_first_letter_insensitive(a: &str, b: &str) -> bool {
    lower_first(a) == lower_first(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            TypeDef::new(
                "Empleado",
                vec![
                    FieldDef::identifier("id"),
                    FieldDef::scalar("name", ScalarKind::String).required(),
                    FieldDef::reference("provincia", "Provincia"),
                ],
            ),
            TypeDef::new(
                "Provincia",
                vec![FieldDef::identifier("id"), FieldDef::scalar("nombre", ScalarKind::String)],
            )
            .with_plural("provincias"),
        ])
    }

    #[test]
    fn test_schema_structure_valid() {
        assert!(sample_schema().validate_structure().is_ok());
    }

    #[test]
    fn test_schema_missing_identifier() {
        let schema = Schema::new(vec![TypeDef::new(
            "Empleado",
            vec![FieldDef::scalar("name", ScalarKind::String)],
        )]);
        assert!(matches!(
            schema.validate_structure(),
            Err(SchemaError::MissingIdentifier(t)) if t == "Empleado"
        ));
    }

    #[test]
    fn test_schema_unknown_reference() {
        let schema = Schema::new(vec![TypeDef::new(
            "Empleado",
            vec![FieldDef::identifier("id"), FieldDef::reference("oficina", "Oficina")],
        )]);
        assert!(matches!(
            schema.validate_structure(),
            Err(SchemaError::UnknownReference { target, .. }) if target == "Oficina"
        ));
    }

    #[test]
    fn test_accessor_defaults() {
        let schema = sample_schema();
        let empleado = schema.get_type("Empleado").unwrap();
        assert_eq!(empleado.singular_name(), "empleado");
        assert_eq!(empleado.plural_name(), "empleados");
        assert_eq!(schema.get_type("Provincia").unwrap().plural_name(), "provincias");
    }

    #[test]
    fn test_field_loose_lookup() {
        let schema = sample_schema();
        let empleado = schema.get_type("Empleado").unwrap();
        assert_eq!(empleado.field_loose("Provincia").unwrap().name, "provincia");
        assert!(empleado.field_loose("Oficina").is_none());
    }

    #[test]
    fn test_field_def_from_json() {
        let field: FieldDef = serde_json::from_value(json!({
            "name": "provincia", "type": "Provincia", "nullable": false
        }))
        .unwrap();
        assert_eq!(field.kind, FieldKind::Reference("Provincia".into()));
        assert!(!field.nullable);

        let field: FieldDef = serde_json::from_value(json!({
            "name": "estado", "type": "Estado", "values": ["ACTIVO", "BAJA"]
        }))
        .unwrap();
        assert!(matches!(field.kind, FieldKind::Enum { ref values, .. } if values.len() == 2));

        let field: FieldDef =
            serde_json::from_value(json!({"name": "id", "type": "ID", "identifier": true})).unwrap();
        assert!(field.identifier);
        assert!(!field.nullable);
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(ScalarKind::Int.coerce(&json!("42")).unwrap(), json!(42));
        assert_eq!(ScalarKind::Float.coerce(&json!("1.5")).unwrap(), json!(1.5));
        assert_eq!(ScalarKind::Boolean.coerce(&json!("true")).unwrap(), json!(true));
        assert_eq!(ScalarKind::Id.coerce(&json!(7)).unwrap(), json!("7"));
        assert_eq!(
            ScalarKind::DateTime.coerce(&json!("2024-01-01")).unwrap(),
            json!("2024-01-01T00:00:00.000Z")
        );
        assert!(ScalarKind::Int.coerce(&json!("abc")).is_err());
        assert!(ScalarKind::Boolean.coerce(&json!([true])).is_err());
    }
}
