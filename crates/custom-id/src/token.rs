//! Token variants of a format definition.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::definition::FormatError;

/// Widest zero-padding a `seq` token may request.
pub const MAX_PAD: u32 = 32;

/// Longest run a `random_digits` / `random_hex` token may request.
pub const MAX_RANDOM_LENGTH: u32 = 64;

/// One independently rendered unit of an identifier.
///
/// The wire form is a JSON object whose `type` field is the discriminant:
///
/// | variant | wire form |
/// |---|---|
/// | `Fixed` | `{"type":"fixed","value":"ITEM-"}` |
/// | `Sequence` | `{"type":"seq","pad":4}` |
/// | `RandomDigits` | `{"type":"random_digits","length":6}` |
/// | `RandomHex` | `{"type":"random_hex","length":8}` |
/// | `DateComponent` | `{"type":"date","format":"yyyy"}` |
/// | `GuidSegment` | `{"type":"guid"}` |
///
/// Only `fixed` and `seq` appear in the default definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type")]
pub enum FormatToken {
    /// Literal text, rendered unconditionally.
    #[serde(rename = "fixed")]
    Fixed {
        #[serde(rename = "value")]
        text: String,
    },

    /// The item ordinal in decimal, left-padded with `0` to at least `pad` digits.
    #[serde(rename = "seq")]
    Sequence { pad: u32 },

    /// `length` random decimal digits.
    #[serde(rename = "random_digits")]
    RandomDigits { length: u32 },

    /// `length` random upper-case hexadecimal digits.
    #[serde(rename = "random_hex")]
    RandomHex { length: u32 },

    /// A field of the render timestamp (UTC).
    #[serde(rename = "date")]
    DateComponent { format: DateFieldSpec },

    /// First group (8 hex digits) of a random v4 UUID.
    #[serde(rename = "guid")]
    GuidSegment,
}

impl FormatToken {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::Fixed { text: text.into() }
    }

    pub fn sequence(pad: u32) -> Self {
        Self::Sequence { pad }
    }

    /// Whether rendering this token consumes randomness.
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            FormatToken::RandomDigits { .. } | FormatToken::RandomHex { .. } | FormatToken::GuidSegment
        )
    }

    /// Check the numeric bounds of a token built in code (parsed tokens are
    /// checked while reading).
    pub(crate) fn validate(&self, index: usize) -> Result<(), FormatError> {
        match self {
            FormatToken::Sequence { pad } if *pad > MAX_PAD => Err(FormatError::InvalidPad {
                index,
                value: pad.to_string(),
            }),
            FormatToken::RandomDigits { length } | FormatToken::RandomHex { length }
                if *length == 0 || *length > MAX_RANDOM_LENGTH =>
            {
                Err(FormatError::InvalidLength {
                    index,
                    value: length.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Read one token descriptor.
    pub(crate) fn from_json(index: usize, value: &JsonValue) -> Result<Self, FormatError> {
        let obj = value
            .as_object()
            .ok_or(FormatError::NotAnObject { index })?;

        let token_type = match obj.get("type") {
            None | Some(JsonValue::Null) => {
                return Err(FormatError::MissingField {
                    index,
                    token_type: String::new(),
                    field: "type",
                });
            }
            Some(JsonValue::String(s)) => s.as_str(),
            Some(_) => {
                return Err(FormatError::InvalidField {
                    index,
                    field: "type",
                    expected: "a string",
                });
            }
        };

        let token = match token_type {
            "fixed" => {
                let text = match required(obj, index, token_type, "value")? {
                    JsonValue::String(s) => s.clone(),
                    _ => {
                        return Err(FormatError::InvalidField {
                            index,
                            field: "value",
                            expected: "a string",
                        });
                    }
                };
                FormatToken::Fixed { text }
            }
            "seq" => {
                let raw = required(obj, index, token_type, "pad")?;
                let pad = bounded_u32(raw, 0, MAX_PAD).ok_or_else(|| FormatError::InvalidPad {
                    index,
                    value: raw.to_string(),
                })?;
                FormatToken::Sequence { pad }
            }
            "random_digits" | "random_hex" => {
                let raw = required(obj, index, token_type, "length")?;
                let length = bounded_u32(raw, 1, MAX_RANDOM_LENGTH).ok_or_else(|| {
                    FormatError::InvalidLength {
                        index,
                        value: raw.to_string(),
                    }
                })?;
                if token_type == "random_digits" {
                    FormatToken::RandomDigits { length }
                } else {
                    FormatToken::RandomHex { length }
                }
            }
            "date" => {
                let raw = required(obj, index, token_type, "format")?;
                let format = raw
                    .as_str()
                    .and_then(DateFieldSpec::from_code)
                    .ok_or_else(|| FormatError::InvalidDateFormat {
                        index,
                        value: raw.to_string(),
                    })?;
                FormatToken::DateComponent { format }
            }
            "guid" => FormatToken::GuidSegment,
            other => {
                return Err(FormatError::UnknownTokenType {
                    index,
                    token_type: other.to_string(),
                });
            }
        };

        Ok(token)
    }
}

fn required<'a>(
    obj: &'a Map<String, JsonValue>,
    index: usize,
    token_type: &str,
    field: &'static str,
) -> Result<&'a JsonValue, FormatError> {
    match obj.get(field) {
        None | Some(JsonValue::Null) => Err(FormatError::MissingField {
            index,
            token_type: token_type.to_string(),
            field,
        }),
        Some(v) => Ok(v),
    }
}

// Strings, floats and negatives are all rejected; `4.0` is not an integer here.
fn bounded_u32(value: &JsonValue, min: u32, max: u32) -> Option<u32> {
    let n = value.as_u64()?;
    let n = u32::try_from(n).ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Which part of the render timestamp a `date` token emits.
///
/// Codes follow the familiar `yyyy-MM-dd HH:mm:ss` spelling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DateFieldSpec {
    #[serde(rename = "yyyy")]
    Year,
    #[serde(rename = "yy")]
    YearShort,
    #[serde(rename = "MM")]
    Month,
    #[serde(rename = "dd")]
    Day,
    /// Day of the year, 001–366.
    #[serde(rename = "ddd")]
    DayOfYear,
    #[serde(rename = "HH")]
    Hour,
    #[serde(rename = "mm")]
    Minute,
    #[serde(rename = "ss")]
    Second,
    #[serde(rename = "yyyyMMdd")]
    CompactDate,
}

impl DateFieldSpec {
    pub const ALL: [DateFieldSpec; 9] = [
        DateFieldSpec::Year,
        DateFieldSpec::YearShort,
        DateFieldSpec::Month,
        DateFieldSpec::Day,
        DateFieldSpec::DayOfYear,
        DateFieldSpec::Hour,
        DateFieldSpec::Minute,
        DateFieldSpec::Second,
        DateFieldSpec::CompactDate,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|spec| spec.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            DateFieldSpec::Year => "yyyy",
            DateFieldSpec::YearShort => "yy",
            DateFieldSpec::Month => "MM",
            DateFieldSpec::Day => "dd",
            DateFieldSpec::DayOfYear => "ddd",
            DateFieldSpec::Hour => "HH",
            DateFieldSpec::Minute => "mm",
            DateFieldSpec::Second => "ss",
            DateFieldSpec::CompactDate => "yyyyMMdd",
        }
    }

    /// `chrono` strftime pattern producing this field.
    pub(crate) fn strftime(self) -> &'static str {
        match self {
            DateFieldSpec::Year => "%Y",
            DateFieldSpec::YearShort => "%y",
            DateFieldSpec::Month => "%m",
            DateFieldSpec::Day => "%d",
            DateFieldSpec::DayOfYear => "%j",
            DateFieldSpec::Hour => "%H",
            DateFieldSpec::Minute => "%M",
            DateFieldSpec::Second => "%S",
            DateFieldSpec::CompactDate => "%Y%m%d",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_serializes_with_value_field() {
        let json = serde_json::to_value(FormatToken::fixed("ITEM-")).unwrap();
        assert_eq!(json, json!({"type": "fixed", "value": "ITEM-"}));
    }

    #[test]
    fn unit_variant_serializes_as_bare_tag() {
        let json = serde_json::to_value(FormatToken::GuidSegment).unwrap();
        assert_eq!(json, json!({"type": "guid"}));
    }

    #[test]
    fn every_date_code_round_trips() {
        for spec in DateFieldSpec::ALL {
            assert_eq!(DateFieldSpec::from_code(spec.code()), Some(spec));
            let json = serde_json::to_value(spec).unwrap();
            assert_eq!(json, JsonValue::String(spec.code().to_string()));
        }
        assert_eq!(DateFieldSpec::from_code("YYYY"), None);
    }

    #[test]
    fn pad_bounds() {
        assert_eq!(bounded_u32(&json!(0), 0, MAX_PAD), Some(0));
        assert_eq!(bounded_u32(&json!(MAX_PAD), 0, MAX_PAD), Some(MAX_PAD));
        assert_eq!(bounded_u32(&json!(MAX_PAD + 1), 0, MAX_PAD), None);
        assert_eq!(bounded_u32(&json!(-1), 0, MAX_PAD), None);
        assert_eq!(bounded_u32(&json!(4.0), 0, MAX_PAD), None);
        assert_eq!(bounded_u32(&json!("4"), 0, MAX_PAD), None);
    }

    #[test]
    fn only_random_tokens_report_randomness() {
        assert!(!FormatToken::fixed("A").is_random());
        assert!(!FormatToken::sequence(2).is_random());
        assert!(
            !FormatToken::DateComponent {
                format: DateFieldSpec::Year
            }
            .is_random()
        );
        assert!(FormatToken::RandomDigits { length: 3 }.is_random());
        assert!(FormatToken::RandomHex { length: 3 }.is_random());
        assert!(FormatToken::GuidSegment.is_random());
    }
}
