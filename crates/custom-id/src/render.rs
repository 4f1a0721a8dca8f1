//! Identifier rendering.
//!
//! Rendering never fails: everything that can be wrong with a format is rejected
//! when the definition is parsed. The only inputs besides the definition and the
//! ordinal are the timestamp and random source carried by [`RenderContext`].

use core::fmt::Write as _;

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use uuid::Builder as UuidBuilder;

use crate::definition::FormatDefinition;
use crate::token::FormatToken;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Source of "now" for rendering date tokens.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that never moves. Used by tests and previews.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Per-render inputs that are not part of the definition.
pub struct RenderContext<'a> {
    now: DateTime<Utc>,
    rng: &'a mut dyn RngCore,
}

impl<'a> RenderContext<'a> {
    pub fn new(now: DateTime<Utc>, rng: &'a mut dyn RngCore) -> Self {
        Self { now, rng }
    }

    pub fn from_clock(clock: &dyn Clock, rng: &'a mut dyn RngCore) -> Self {
        Self::new(clock.now(), rng)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl core::fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderContext")
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Render `definition` for the item with the given ordinal.
///
/// Tokens are rendered left to right and concatenated with no separator. Every
/// `seq` token renders the same ordinal.
pub fn render(definition: &FormatDefinition, ordinal: u64, ctx: &mut RenderContext<'_>) -> String {
    let mut out = String::new();
    for token in definition.tokens() {
        render_token(&mut out, token, ordinal, ctx);
    }
    out
}

impl FormatDefinition {
    pub fn render(&self, ordinal: u64, ctx: &mut RenderContext<'_>) -> String {
        render(self, ordinal, ctx)
    }
}

fn render_token(out: &mut String, token: &FormatToken, ordinal: u64, ctx: &mut RenderContext<'_>) {
    match token {
        FormatToken::Fixed { text } => out.push_str(text),
        FormatToken::Sequence { pad } => {
            // Width is a minimum; wider ordinals are never truncated.
            let _ = write!(out, "{ordinal:0>width$}", width = *pad as usize);
        }
        FormatToken::RandomDigits { length } => {
            for _ in 0..*length {
                out.push(char::from(b'0' + ctx.rng.random_range(0..10u8)));
            }
        }
        FormatToken::RandomHex { length } => {
            for _ in 0..*length {
                let nibble = ctx.rng.random_range(0..16usize);
                out.push(char::from(HEX_DIGITS[nibble]));
            }
        }
        FormatToken::DateComponent { format } => {
            let _ = write!(out, "{}", ctx.now.format(format.strftime()));
        }
        FormatToken::GuidSegment => {
            let mut bytes = [0u8; 16];
            ctx.rng.fill_bytes(&mut bytes);
            let guid = UuidBuilder::from_random_bytes(bytes).into_uuid();
            let simple = guid.simple().to_string();
            out.push_str(&simple[..8]);
        }
    }
}
