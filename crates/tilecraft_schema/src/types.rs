//! Schema type definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field types supported by entity definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Color,
    Enum,
    Point,
    File,
}

impl FieldType {
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Int => "Integer",
            FieldType::Float => "Float",
            FieldType::Bool => "Boolean",
            FieldType::Color => "Color",
            FieldType::Enum => "Enum",
            FieldType::Point => "Point",
            FieldType::File => "File",
        }
    }

    /// All field types, in the order the schema editor lists them
    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::String,
            FieldType::Int,
            FieldType::Float,
            FieldType::Bool,
            FieldType::Color,
            FieldType::Enum,
            FieldType::Point,
            FieldType::File,
        ]
    }

    /// Whether values of this type are text that can be left empty
    fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Color | FieldType::Enum | FieldType::File
        )
    }
}

/// A 2D point value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A typed field value, one variant per [`FieldType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Color(String),
    Enum(String),
    Point(Point),
    File(String),
}

impl FieldValue {
    /// The schema type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Color(_) => FieldType::Color,
            FieldValue::Enum(_) => FieldType::Enum,
            FieldValue::Point(_) => FieldType::Point,
            FieldValue::File(_) => FieldType::File,
        }
    }

    /// Text payload of string-like values (string, color, enum, file)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s)
            | FieldValue::Color(s)
            | FieldValue::Enum(s)
            | FieldValue::File(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            FieldValue::Point(p) => Some(*p),
            _ => None,
        }
    }
}

/// Validation failures for a field value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("field '{field}' expects {expected:?}, got {found:?}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },
    #[error("field '{field}' value {value} is outside [{min:?}, {max:?}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("field '{field}' does not allow enum value '{value}'")]
    NotInEnum { field: String, value: String },
    #[error("field '{field}' has invalid color '{value}'")]
    InvalidColor { field: String, value: String },
    #[error("field '{field}' is required")]
    Required { field: String },
    #[error("field '{field}' is declared more than once")]
    DuplicateField { field: String },
}

/// Declaration of a single field on an entity definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl EntityField {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            default_value: None,
            min: None,
            max: None,
            enum_values: Vec::new(),
            required: false,
        }
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The value a freshly placed instance starts with.
    ///
    /// Uses the declared default when present, otherwise the zero value of
    /// the field type pulled into the declared range.
    pub fn initial_value(&self) -> FieldValue {
        if let Some(value) = &self.default_value {
            return value.clone();
        }
        match self.field_type {
            FieldType::String => FieldValue::String(String::new()),
            FieldType::Int => FieldValue::Int(self.clamp_to_range(0.0).round() as i64),
            FieldType::Float => FieldValue::Float(self.clamp_to_range(0.0)),
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::Color => FieldValue::Color("#ffffff".to_string()),
            FieldType::Enum => {
                FieldValue::Enum(self.enum_values.first().cloned().unwrap_or_default())
            }
            FieldType::Point => FieldValue::Point(Point::default()),
            FieldType::File => FieldValue::File(String::new()),
        }
    }

    fn clamp_to_range(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }

    fn check_range(&self, value: f64) -> Result<(), FieldError> {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(FieldError::OutOfRange {
                field: self.id.clone(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Check a value against this field's type, range, enum and required rules
    pub fn validate(&self, value: &FieldValue) -> Result<(), FieldError> {
        if value.field_type() != self.field_type {
            return Err(FieldError::TypeMismatch {
                field: self.id.clone(),
                expected: self.field_type,
                found: value.field_type(),
            });
        }

        if self.required && self.field_type.is_textual() {
            if value.as_str().is_some_and(str::is_empty) {
                return Err(FieldError::Required {
                    field: self.id.clone(),
                });
            }
        }

        match value {
            FieldValue::Int(i) => self.check_range(*i as f64),
            FieldValue::Float(f) => self.check_range(*f),
            FieldValue::Color(c) if !is_hex_color(c) => Err(FieldError::InvalidColor {
                field: self.id.clone(),
                value: c.clone(),
            }),
            FieldValue::Enum(e) if !self.enum_values.iter().any(|v| v == e) => {
                // An empty optional enum is allowed to stay unset
                if e.is_empty() && !self.required {
                    return Ok(());
                }
                Err(FieldError::NotInEnum {
                    field: self.id.clone(),
                    value: e.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Check for `#rgb`, `#rrggbb` or `#rrggbbaa` hex colors
pub fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}
