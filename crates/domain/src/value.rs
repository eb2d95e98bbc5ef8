//! Typed property values and their canonical Homie text encoding.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::datatype::{DataType, Range};
use crate::error::{InvalidPayloadError, TypeMismatchError};

/// A color value, interpreted according to the property's `rgb`/`hsv` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red, green, blue in `0..=255`.
    Rgb(u8, u8, u8),
    /// Hue in `0..=360`, saturation and value in `0..=100`.
    Hsv(u16, u8, u8),
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
    Color(Color),
    DateTime(DateTime<Utc>),
    Duration(Duration),
}

impl PropertyValue {
    /// Datatype this value belongs to.
    #[must_use]
    pub fn datatype(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Boolean(_) => DataType::Boolean,
            Self::Enum(_) => DataType::Enum,
            Self::Color(_) => DataType::Color,
            Self::DateTime(_) => DataType::DateTime,
            Self::Duration(_) => DataType::Duration,
        }
    }

    /// Encode for the wire after checking it against a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] when the value is of another datatype or
    /// violates `format` (out of range, unknown enum entry, wrong color model).
    pub fn encode_checked(
        &self,
        datatype: DataType,
        format: Option<&str>,
    ) -> Result<String, TypeMismatchError> {
        if self.datatype() != datatype {
            return Err(TypeMismatchError {
                expected: datatype,
                actual: self.datatype().to_string(),
            });
        }
        if !self.fits_format(format) {
            return Err(TypeMismatchError {
                expected: datatype,
                actual: self.to_string(),
            });
        }
        Ok(self.to_string())
    }

    /// Decode a wire payload for a declared datatype and format.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPayloadError`] when the payload is not a canonical
    /// encoding of `datatype` or lies outside `format`.
    pub fn decode(
        datatype: DataType,
        format: Option<&str>,
        payload: &str,
    ) -> Result<Self, InvalidPayloadError> {
        let invalid = || InvalidPayloadError {
            datatype,
            payload: payload.to_string(),
        };
        let value = match datatype {
            DataType::String => Self::String(payload.to_string()),
            DataType::Integer => Self::Integer(payload.parse().map_err(|_| invalid())?),
            DataType::Float => {
                let v: f64 = payload.parse().map_err(|_| invalid())?;
                if !v.is_finite() {
                    return Err(invalid());
                }
                Self::Float(v)
            }
            DataType::Boolean => match payload {
                "true" => Self::Boolean(true),
                "false" => Self::Boolean(false),
                _ => return Err(invalid()),
            },
            DataType::Enum => {
                if payload.is_empty() {
                    return Err(invalid());
                }
                Self::Enum(payload.to_string())
            }
            DataType::Color => Self::Color(decode_color(format, payload).ok_or_else(invalid)?),
            DataType::DateTime => Self::DateTime(
                DateTime::parse_from_rfc3339(payload)
                    .map_err(|_| invalid())?
                    .with_timezone(&Utc),
            ),
            DataType::Duration => Self::Duration(decode_duration(payload).ok_or_else(invalid)?),
        };
        if value.fits_format(format) {
            Ok(value)
        } else {
            Err(invalid())
        }
    }

    fn fits_format(&self, format: Option<&str>) -> bool {
        match (self, format) {
            (Self::Integer(v), Some(f)) => Range::<i64>::parse(f).is_some_and(|r| r.contains(*v)),
            (Self::Float(v), Some(f)) => {
                v.is_finite() && Range::<f64>::parse(f).is_some_and(|r| r.contains(*v))
            }
            (Self::Float(v), None) => v.is_finite(),
            (Self::Enum(v), Some(f)) => f.split(',').any(|entry| entry == v),
            (Self::Color(Color::Rgb(..)), Some(f)) => f == "rgb",
            (Self::Color(Color::Hsv(h, s, v)), Some(f)) => {
                f == "hsv" && *h <= 360 && *s <= 100 && *v <= 100
            }
            _ => true,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) | Self::Enum(v) => f.write_str(v),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Color(Color::Rgb(r, g, b)) => write!(f, "{r},{g},{b}"),
            Self::Color(Color::Hsv(h, s, v)) => write!(f, "{h},{s},{v}"),
            Self::DateTime(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Duration(v) => f.write_str(&encode_duration(*v)),
        }
    }
}

fn decode_color(format: Option<&str>, payload: &str) -> Option<Color> {
    let mut parts = payload.split(',');
    let (a, b, c) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    match format {
        Some("hsv") => Some(Color::Hsv(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)),
        _ => Some(Color::Rgb(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)),
    }
}

/// Encode whole seconds as an ISO 8601 `PT#H#M#S` duration.
fn encode_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || total == 0 {
        out.push_str(&format!("{seconds}S"));
    }
    out
}

fn decode_duration(payload: &str) -> Option<Duration> {
    let mut rest = payload.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }
    let mut total: u64 = 0;
    let mut last_rank = 0;
    while !rest.is_empty() {
        let split = rest.find(|c: char| !c.is_ascii_digit())?;
        if split == 0 {
            return None;
        }
        let amount: u64 = rest[..split].parse().ok()?;
        let (rank, factor) = match rest[split..].chars().next()? {
            'H' => (1, 3600),
            'M' => (2, 60),
            'S' => (3, 1),
            _ => return None,
        };
        if rank <= last_rank {
            return None;
        }
        last_rank = rank;
        total = total.checked_add(amount.checked_mul(factor)?)?;
        rest = &rest[split + 1..];
    }
    Some(Duration::from_secs(total))
}
