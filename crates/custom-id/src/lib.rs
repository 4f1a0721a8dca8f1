//! `invtrack-custom-id`: human-readable item identifiers.
//!
//! Every inventory owns a [`FormatDefinition`]: an ordered list of typed tokens
//! stored as JSON text, e.g.
//!
//! ```text
//! [{"type":"fixed","value":"ITEM-"},{"type":"seq","pad":4}]
//! ```
//!
//! The definition is validated once by [`parse`]; afterwards [`render`] turns it plus
//! an ordinal into the identifier (`ITEM-0007`) and cannot fail. Wall-clock time and
//! randomness reach the renderer only through [`RenderContext`].

pub mod definition;
pub mod render;
pub mod token;

pub use definition::{FormatDefinition, FormatError, parse, serialize};
pub use render::{Clock, FixedClock, RenderContext, SystemClock, render};
pub use token::{DateFieldSpec, FormatToken, MAX_PAD, MAX_RANDOM_LENGTH};
