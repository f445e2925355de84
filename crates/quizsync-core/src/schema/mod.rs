//! Schema validation
//!
//! Remote documents arrive untyped. Before a document is trusted as a typed
//! entity it is checked against a declarative [`SchemaContract`]:
//!
//! - `check` collects every field error and returns the coerced record
//! - `validate` also decodes it into the typed model
//! - `SchemaRegistry` looks contracts up by name
//!
//! Validation never panics; failures come back as [`ValidationError`].

mod contract;
pub mod contracts;
mod error;
mod registry;
mod validator;

pub use contract::{FieldSpec, FieldType, SchemaContract};
pub use error::{FieldError, Problem, SchemaError, ValidationError};
pub use registry::SchemaRegistry;
pub use validator::{check, check_as, validate};
