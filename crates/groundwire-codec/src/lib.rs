//! Codec primitives shared by the Groundwire protocol crates.
//!
//! The flight telemetry this harness decodes is bit-packed with field widths
//! from 1 to 64 bits that are not byte-aligned, so the single reusable
//! primitive here is a lazy little-endian bit cursor ([`BitReader`]). The
//! experiment-file and frame parsers sit on top of a byte [`Cursor`] with a
//! small set of backtracking parser combinators ([`combinators`]).
//!
//! Two error disciplines coexist on purpose:
//!
//! - Byte-cursor reads fail with a [`ParseFailure`] value carrying the byte
//!   position and what was expected. Failures terminate the current parse
//!   branch only; [`combinators::alternative`] restores the cursor and tries
//!   the next branch.
//! - Bit-reader reads never fail. Running off the end of the stream yields
//!   `None` (the "empty field" sentinel) and latches the reader as ended, so
//!   a truncated telemetry block decodes to a well-formed tree with empty
//!   trailing fields instead of an error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bits;
pub mod combinators;
pub mod cursor;

pub use bits::{BitReader, BitWriter};
pub use combinators::{Labeled, alternative, count, label_as, repeat, sequence};
pub use cursor::{Cursor, ParseFailure, ParseResult};
