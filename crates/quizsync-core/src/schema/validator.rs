//! Contract validation
//!
//! [`check`] walks an untyped value against a [`SchemaContract`], collecting
//! every field error and producing a coerced copy of the record.
//! [`validate`] additionally decodes the coerced record into a typed value,
//! and [`check_as`] confirms it would decode while keeping it untyped.

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use super::contract::{FieldType, SchemaContract};
use super::error::{FieldError, Problem, ValidationError};
use crate::document::{json_kind, Record, ID_FIELD};

/// Validate and decode a candidate into its typed shape
pub fn validate<T: DeserializeOwned>(
    candidate: &Value,
    contract: &SchemaContract,
) -> Result<T, ValidationError> {
    let record = check(candidate, contract)?;
    decode(candidate, contract, record)
}

/// Check a candidate and confirm the coerced record decodes as `T`
///
/// Returns the untyped record, so undeclared fields survive.
pub fn check_as<T: DeserializeOwned>(
    candidate: &Value,
    contract: &SchemaContract,
) -> Result<Record, ValidationError> {
    let record = check(candidate, contract)?;
    decode::<T>(candidate, contract, record.clone())?;
    Ok(record)
}

fn decode<T: DeserializeOwned>(
    candidate: &Value,
    contract: &SchemaContract,
    record: Record,
) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| ValidationError {
        contract: contract.name().to_string(),
        record_id: record_id(candidate),
        errors: vec![FieldError::new("", Problem::Decode(e.to_string()))],
    })
}

/// Check a candidate against a contract without decoding it
///
/// On success returns the record with coercions applied. Undeclared fields
/// are kept unless the contract is strict.
pub fn check(candidate: &Value, contract: &SchemaContract) -> Result<Record, ValidationError> {
    let Value::Object(input) = candidate else {
        return Err(ValidationError {
            contract: contract.name().to_string(),
            record_id: None,
            errors: vec![FieldError::new(
                "",
                Problem::NotAnObject {
                    found: json_kind(candidate),
                },
            )],
        });
    };

    let mut errors = Vec::new();
    let mut output = input.clone();

    for spec in contract.fields() {
        match input.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    errors.push(FieldError::new(spec.name.clone(), Problem::Missing));
                }
            }
            Some(value) => {
                if let Some(coerced) = check_value(value, &spec.ty, &spec.name, &mut errors) {
                    output.insert(spec.name.clone(), coerced);
                }
            }
        }
    }

    if contract.is_strict() {
        for key in input.keys() {
            if contract.field(key).is_none() {
                errors.push(FieldError::new(key.clone(), Problem::Unexpected));
            }
        }
    }

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(ValidationError {
            contract: contract.name().to_string(),
            record_id: record_id(candidate),
            errors,
        })
    }
}

/// Check one value; returns the coerced value when it conforms
fn check_value(
    value: &Value,
    ty: &FieldType,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let wrong_type = |errors: &mut Vec<FieldError>| -> Option<Value> {
        errors.push(FieldError::new(
            path,
            Problem::WrongType {
                expected: ty.to_string(),
                found: json_kind(value),
            },
        ));
        None
    };

    match ty {
        FieldType::String => match value {
            Value::String(_) => Some(value.clone()),
            _ => wrong_type(errors),
        },
        FieldType::Integer => match coerce_integer(value) {
            Some(n) => Some(Value::Number(n)),
            None => wrong_type(errors),
        },
        FieldType::Number => match value {
            Value::Number(_) => Some(value.clone()),
            _ => wrong_type(errors),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => wrong_type(errors),
        },
        FieldType::Object => match value {
            Value::Object(_) => Some(value.clone()),
            _ => wrong_type(errors),
        },
        FieldType::Enum(allowed) => match value {
            Value::String(s) if allowed.iter().any(|a| a == s) => Some(value.clone()),
            Value::String(s) => {
                errors.push(FieldError::new(
                    path,
                    Problem::NotInSet {
                        allowed: allowed.clone(),
                        found: s.clone(),
                    },
                ));
                None
            }
            _ => wrong_type(errors),
        },
        FieldType::Array(inner) => {
            let Value::Array(items) = value else {
                return wrong_type(errors);
            };
            let before = errors.len();
            let coerced: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    check_value(item, inner, &format!("{}[{}]", path, i), errors)
                })
                .collect();
            (errors.len() == before).then_some(Value::Array(coerced))
        }
    }
}

/// Integers pass through; floats with no fractional part become integers
fn coerce_integer(value: &Value) -> Option<Number> {
    let Value::Number(n) = value else {
        return None;
    };
    if n.is_i64() || n.is_u64() {
        return Some(n.clone());
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Number::from(f as i64))
    } else {
        None
    }
}

fn record_id(candidate: &Value) -> Option<String> {
    candidate
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}
