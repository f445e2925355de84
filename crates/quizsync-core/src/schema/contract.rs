//! Declarative record contracts
//!
//! A contract lists the fields a record kind is expected to carry, their
//! primitive types, enumerated value sets, and whether they are required.

use std::fmt;

/// The type a field's value must have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// Whole number; floats with no fractional part are coerced
    Integer,
    /// Any JSON number
    Number,
    Boolean,
    /// A string drawn from a fixed set
    Enum(Vec<String>),
    /// Array whose elements all have the inner type
    Array(Box<FieldType>),
    /// Any JSON object
    Object,
}

impl FieldType {
    /// Enumerated string set
    pub fn one_of(values: &[&str]) -> Self {
        FieldType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Homogeneous array
    pub fn array_of(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Number => f.write_str("number"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
            FieldType::Array(inner) => write!(f, "array of {}", inner),
            FieldType::Object => f.write_str("object"),
        }
    }
}

/// One field of a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    /// Optional fields may be absent or null
    pub required: bool,
}

/// Declarative description of a record kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    name: String,
    fields: Vec<FieldSpec>,
    strict: bool,
}

impl SchemaContract {
    /// Start an empty contract
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            strict: false,
        }
    }

    /// Add a required field
    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    /// Add an optional field
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            required: false,
        });
        self
    }

    /// Reject fields the contract does not declare
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let contract = SchemaContract::new("thing")
            .required("id", FieldType::String)
            .optional("tags", FieldType::array_of(FieldType::String));

        assert_eq!(contract.name(), "thing");
        assert_eq!(contract.fields().len(), 2);
        assert!(contract.field("id").unwrap().required);
        assert!(!contract.field("tags").unwrap().required);
        assert!(contract.field("missing").is_none());
        assert!(!contract.is_strict());
        assert!(contract.strict().is_strict());
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(
            FieldType::one_of(&["easy", "hard"]).to_string(),
            "one of [easy, hard]"
        );
        assert_eq!(
            FieldType::array_of(FieldType::Integer).to_string(),
            "array of integer"
        );
    }
}
