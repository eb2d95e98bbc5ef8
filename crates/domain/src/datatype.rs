//! Homie property datatypes and their `$format` rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Declared datatype of a property, published as `$datatype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Enum,
    Color,
    #[serde(rename = "datetime")]
    DateTime,
    Duration,
}

impl DataType {
    /// Wire name used in `$datatype`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Color => "color",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
        }
    }

    /// Check that `format` is meaningful for this datatype.
    ///
    /// `enum` needs a non-empty comma-separated list, `color` needs `rgb` or
    /// `hsv`, numeric types accept an optional `min:max` range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`] when the format is unusable.
    pub fn validate_format(self, format: Option<&str>) -> Result<(), ValidationError> {
        let invalid = |format: &str| ValidationError::InvalidFormat {
            datatype: self,
            format: format.to_string(),
        };
        match (self, format) {
            (Self::Enum, None) => Err(invalid("")),
            (Self::Enum, Some(f)) if f.split(',').any(str::is_empty) => Err(invalid(f)),
            (Self::Color, None) => Err(invalid("")),
            (Self::Color, Some(f)) if f != "rgb" && f != "hsv" => Err(invalid(f)),
            (Self::Integer, Some(f)) if Range::<i64>::parse(f).is_none() => Err(invalid(f)),
            (Self::Float, Some(f)) if Range::<f64>::parse(f).is_none() => Err(invalid(f)),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "enum" => Ok(Self::Enum),
            "color" => Ok(Self::Color),
            "datetime" => Ok(Self::DateTime),
            "duration" => Ok(Self::Duration),
            other => Err(ValidationError::InvalidFormat {
                datatype: Self::String,
                format: other.to_string(),
            }),
        }
    }
}

/// Inclusive numeric range parsed from a `min:max` format.
///
/// Either bound may be omitted (`:100`, `0:`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: FromStr + PartialOrd + Copy> Range<T> {
    /// Parse a `min:max` format string.
    #[must_use]
    pub fn parse(format: &str) -> Option<Self> {
        let (min, max) = format.split_once(':')?;
        let bound = |s: &str| -> Option<Option<T>> {
            if s.is_empty() {
                Some(None)
            } else {
                s.parse().ok().map(Some)
            }
        };
        let range = Self {
            min: bound(min)?,
            max: bound(max)?,
        };
        match (range.min, range.max) {
            (Some(min), Some(max)) if min > max => None,
            _ => Some(range),
        }
    }

    /// Whether `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_wire_names() {
        assert_eq!(DataType::Float.to_string(), "float");
        assert_eq!(DataType::DateTime.to_string(), "datetime");
        assert_eq!(DataType::Enum.to_string(), "enum");
    }

    #[test]
    fn should_parse_every_wire_name() {
        for dt in [
            DataType::String,
            DataType::Integer,
            DataType::Float,
            DataType::Boolean,
            DataType::Enum,
            DataType::Color,
            DataType::DateTime,
            DataType::Duration,
        ] {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
    }

    #[test]
    fn should_require_format_for_enum_and_color() {
        assert!(DataType::Enum.validate_format(None).is_err());
        assert!(DataType::Color.validate_format(None).is_err());
        assert!(DataType::Color.validate_format(Some("cmyk")).is_err());
        assert!(DataType::Color.validate_format(Some("hsv")).is_ok());
        assert!(DataType::Enum.validate_format(Some("low,high")).is_ok());
    }

    #[test]
    fn should_reject_enum_format_with_empty_entry() {
        assert!(DataType::Enum.validate_format(Some("a,,b")).is_err());
    }

    #[test]
    fn should_validate_numeric_ranges() {
        assert!(DataType::Integer.validate_format(Some("0:100")).is_ok());
        assert!(DataType::Integer.validate_format(Some("100:0")).is_err());
        assert!(DataType::Float.validate_format(Some("-20.5:60")).is_ok());
        assert!(DataType::Float.validate_format(Some("abc")).is_err());
        assert!(DataType::String.validate_format(Some("anything")).is_ok());
    }

    #[test]
    fn should_check_open_ranges() {
        let range = Range::<i64>::parse(":10").unwrap();
        assert!(range.contains(-5));
        assert!(!range.contains(11));
    }

    #[test]
    fn should_deserialize_lowercase_names() {
        let dt: DataType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(dt, DataType::DateTime);
    }
}
