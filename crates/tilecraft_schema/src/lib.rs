//! Entity field schema for tilecraft
//!
//! Entity definitions declare an ordered list of typed fields. This crate
//! holds the field declarations, the tagged value type stored on instances,
//! and the validation that keeps the two in agreement.

mod types;

pub use types::{is_hex_color, EntityField, FieldError, FieldType, FieldValue, Point};
