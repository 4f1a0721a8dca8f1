//! Format definitions: parsing, validation and the stored text form.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;

use invtrack_core::{DomainError, ValueObject};

use crate::token::{FormatToken, MAX_PAD, MAX_RANDOM_LENGTH};

/// Why a format definition was rejected.
///
/// `index` is the zero-based position of the offending token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("format definition is not valid JSON: {0}")]
    Malformed(String),

    #[error("format definition must be a JSON array of token objects")]
    NotAList,

    #[error("format definition must contain at least one token")]
    Empty,

    /// Every token is an empty `fixed` literal, so every identifier would be "".
    #[error("format definition always renders an empty identifier")]
    RendersEmpty,

    #[error("token {index}: expected a JSON object")]
    NotAnObject { index: usize },

    #[error("token {index}: unknown token type '{token_type}'")]
    UnknownTokenType { index: usize, token_type: String },

    #[error("token {index}: missing required field '{field}'")]
    MissingField {
        index: usize,
        /// Empty when the `type` discriminant itself is missing.
        token_type: String,
        field: &'static str,
    },

    #[error("token {index}: field '{field}' must be {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("token {index}: pad must be an integer between 0 and {max}, got {value}", max = MAX_PAD)]
    InvalidPad { index: usize, value: String },

    #[error(
        "token {index}: length must be an integer between 1 and {max}, got {value}",
        max = MAX_RANDOM_LENGTH
    )]
    InvalidLength { index: usize, value: String },

    #[error("token {index}: unsupported date format {value}")]
    InvalidDateFormat { index: usize, value: String },
}

impl From<FormatError> for DomainError {
    fn from(value: FormatError) -> Self {
        DomainError::validation(format!("invalid id format: {value}"))
    }
}

/// Validated, immutable token sequence owned by one inventory.
///
/// There is no way to edit a single token in place: a changed format is a new
/// definition that replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatDefinition {
    tokens: Vec<FormatToken>,
}

impl ValueObject for FormatDefinition {}

impl FormatDefinition {
    /// Build a definition from tokens constructed in code.
    pub fn new(tokens: Vec<FormatToken>) -> Result<Self, FormatError> {
        if tokens.is_empty() {
            return Err(FormatError::Empty);
        }
        for (index, token) in tokens.iter().enumerate() {
            token.validate(index)?;
        }
        Self::checked(tokens)
    }

    fn checked(tokens: Vec<FormatToken>) -> Result<Self, FormatError> {
        let renders_empty = tokens
            .iter()
            .all(|t| matches!(t, FormatToken::Fixed { text } if text.is_empty()));
        if renders_empty {
            return Err(FormatError::RendersEmpty);
        }
        Ok(Self { tokens })
    }

    /// The definition every new inventory gets unless told otherwise:
    /// `ITEM-` followed by the ordinal padded to four digits.
    pub fn default_item() -> Self {
        Self {
            tokens: vec![FormatToken::fixed("ITEM-"), FormatToken::sequence(4)],
        }
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    pub fn sequence_token_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, FormatToken::Sequence { .. }))
            .count()
    }

    /// True when rendering depends only on (ordinal, timestamp): no random tokens.
    pub fn is_deterministic(&self) -> bool {
        !self.tokens.iter().any(FormatToken::is_random)
    }

    /// Parse an already-decoded JSON document.
    pub fn from_json(value: &JsonValue) -> Result<Self, FormatError> {
        let items = value.as_array().ok_or(FormatError::NotAList)?;
        if items.is_empty() {
            return Err(FormatError::Empty);
        }

        let tokens = items
            .iter()
            .enumerate()
            .map(|(index, item)| FormatToken::from_json(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Self::checked(tokens)
    }
}

/// Parse stored format text into a validated definition.
///
/// Pure and idempotent: the same text always yields the same result.
pub fn parse(raw: &str) -> Result<FormatDefinition, FormatError> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| FormatError::Malformed(e.to_string()))?;
    FormatDefinition::from_json(&value)
}

/// Stored text form of a definition (compact JSON). Inverse of [`parse`].
///
/// Written straight from the tokens so `type` stays the first key of every object.
pub fn serialize(definition: &FormatDefinition) -> String {
    serde_json::to_string(&definition.tokens).unwrap_or_default()
}

impl FromStr for FormatDefinition {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl core::fmt::Display for FormatDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&serialize(self))
    }
}

impl Serialize for FormatDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tokens.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FormatDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        FormatDefinition::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::DateFieldSpec;
    use proptest::prelude::*;

    const DEFAULT_TEXT: &str = r#"[{"type":"fixed","value":"ITEM-"},{"type":"seq","pad":4}]"#;

    #[test]
    fn parses_the_default_format() {
        let parsed = parse(DEFAULT_TEXT).unwrap();
        assert_eq!(parsed, FormatDefinition::default_item());
        assert_eq!(parsed.sequence_token_count(), 1);
        assert!(parsed.is_deterministic());
    }

    #[test]
    fn default_format_serializes_to_stored_text() {
        assert_eq!(serialize(&FormatDefinition::default_item()), DEFAULT_TEXT);
    }

    #[test]
    fn parses_every_token_type() {
        let raw = r#"[
            {"type":"fixed","value":"INV"},
            {"type":"date","format":"yyyyMMdd"},
            {"type":"random_digits","length":3},
            {"type":"random_hex","length":4},
            {"type":"guid"},
            {"type":"seq","pad":0}
        ]"#;
        let parsed = parse(raw).unwrap();
        assert_eq!(
            parsed.tokens(),
            &[
                FormatToken::fixed("INV"),
                FormatToken::DateComponent {
                    format: DateFieldSpec::CompactDate
                },
                FormatToken::RandomDigits { length: 3 },
                FormatToken::RandomHex { length: 4 },
                FormatToken::GuidSegment,
                FormatToken::sequence(0),
            ]
        );
        assert!(!parsed.is_deterministic());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let parsed = parse(r#"[{"type":"seq","pad":2,"label":"counter"}]"#).unwrap();
        assert_eq!(parsed.tokens(), &[FormatToken::sequence(2)]);
    }

    #[test]
    fn unknown_token_type_is_rejected() {
        let err = parse(r#"[{"type":"bogus"}]"#).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownTokenType {
                index: 0,
                token_type: "bogus".to_string()
            }
        );
    }

    #[test]
    fn missing_fields_are_reported_per_token() {
        let err = parse(r#"[{"type":"fixed","value":"A"},{"type":"seq"}]"#).unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingField {
                index: 1,
                token_type: "seq".to_string(),
                field: "pad"
            }
        );

        let err = parse(r#"[{"type":"fixed"}]"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingField { field: "value", .. }));

        let err = parse(r#"[{"value":"A"}]"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingField { field: "type", .. }));

        let err = parse(r#"[{"type":"fixed","value":null}]"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingField { field: "value", .. }));
    }

    #[test]
    fn bad_pad_values_are_rejected() {
        for raw in [
            r#"[{"type":"seq","pad":-1}]"#,
            r#"[{"type":"seq","pad":"4"}]"#,
            r#"[{"type":"seq","pad":2.5}]"#,
            r#"[{"type":"seq","pad":true}]"#,
            r#"[{"type":"seq","pad":33}]"#,
        ] {
            let err = parse(raw).unwrap_err();
            assert!(
                matches!(err, FormatError::InvalidPad { index: 0, .. }),
                "{raw} -> {err:?}"
            );
        }
    }

    #[test]
    fn bad_lengths_and_date_formats_are_rejected() {
        let err = parse(r#"[{"type":"random_digits","length":0}]"#).unwrap_err();
        assert!(matches!(err, FormatError::InvalidLength { .. }));

        let err = parse(r#"[{"type":"random_hex","length":65}]"#).unwrap_err();
        assert!(matches!(err, FormatError::InvalidLength { .. }));

        let err = parse(r#"[{"type":"date","format":"YYYY"}]"#).unwrap_err();
        assert!(matches!(err, FormatError::InvalidDateFormat { .. }));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(parse("not json"), Err(FormatError::Malformed(_))));
        assert_eq!(parse(r#"{"type":"seq"}"#), Err(FormatError::NotAList));
        assert_eq!(parse("[]"), Err(FormatError::Empty));
        assert_eq!(
            parse(r#"[{"type":"seq","pad":1}, 7]"#),
            Err(FormatError::NotAnObject { index: 1 })
        );
        assert_eq!(
            parse(r#"[{"type":4}]"#),
            Err(FormatError::InvalidField {
                index: 0,
                field: "type",
                expected: "a string"
            })
        );
        assert_eq!(
            parse(r#"[{"type":"fixed","value":12}]"#),
            Err(FormatError::InvalidField {
                index: 0,
                field: "value",
                expected: "a string"
            })
        );
    }

    #[test]
    fn definitions_that_render_nothing_are_rejected() {
        for raw in [
            r#"[{"type":"fixed","value":""}]"#,
            r#"[{"type":"fixed","value":""},{"type":"fixed","value":""}]"#,
        ] {
            assert_eq!(parse(raw), Err(FormatError::RendersEmpty), "{raw}");
        }
        assert_eq!(
            FormatDefinition::new(vec![FormatToken::fixed("")]),
            Err(FormatError::RendersEmpty)
        );

        // An empty literal next to anything that renders text is fine.
        let def = parse(r#"[{"type":"fixed","value":""},{"type":"seq","pad":0}]"#).unwrap();
        assert_eq!(def.tokens().len(), 2);
    }

    #[test]
    fn parse_is_idempotent() {
        let a = parse(DEFAULT_TEXT);
        let b = parse(DEFAULT_TEXT);
        assert_eq!(a, b);
    }

    #[test]
    fn new_validates_code_built_tokens() {
        assert_eq!(FormatDefinition::new(vec![]), Err(FormatError::Empty));
        assert!(matches!(
            FormatDefinition::new(vec![FormatToken::fixed("A"), FormatToken::sequence(99)]),
            Err(FormatError::InvalidPad { index: 1, .. })
        ));
        assert!(FormatDefinition::new(vec![FormatToken::sequence(MAX_PAD)]).is_ok());
    }

    #[test]
    fn serde_embedding_uses_the_same_rules() {
        let def: FormatDefinition = serde_json::from_str(DEFAULT_TEXT).unwrap();
        assert_eq!(def, FormatDefinition::default_item());

        let err = serde_json::from_str::<FormatDefinition>(r#"[{"type":"bogus"}]"#).unwrap_err();
        assert!(err.to_string().contains("unknown token type 'bogus'"));
    }

    #[test]
    fn format_error_becomes_validation_error() {
        let err: DomainError = FormatError::Empty.into();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    fn token_strategy() -> impl Strategy<Value = FormatToken> {
        prop_oneof![
            any::<String>().prop_map(|text| FormatToken::Fixed { text }),
            (0..=MAX_PAD).prop_map(|pad| FormatToken::Sequence { pad }),
            (1..=MAX_RANDOM_LENGTH).prop_map(|length| FormatToken::RandomDigits { length }),
            (1..=MAX_RANDOM_LENGTH).prop_map(|length| FormatToken::RandomHex { length }),
            prop::sample::select(DateFieldSpec::ALL.to_vec())
                .prop_map(|format| FormatToken::DateComponent { format }),
            Just(FormatToken::GuidSegment),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: serialize then parse returns the same definition.
        #[test]
        fn serialize_parse_round_trip(tokens in prop::collection::vec(token_strategy(), 1..12)) {
            prop_assume!(
                !tokens
                    .iter()
                    .all(|t| matches!(t, FormatToken::Fixed { text } if text.is_empty()))
            );
            let def = FormatDefinition::new(tokens).unwrap();
            let text = serialize(&def);
            prop_assert_eq!(parse(&text), Ok(def));
        }
    }
}
