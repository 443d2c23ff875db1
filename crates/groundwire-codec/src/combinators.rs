//! Parser combinators over [`Cursor`].
//!
//! These are deliberately small: the experiment-file grammar needs an ordered
//! choice between record shapes, bounded and unbounded repetition, and named
//! results. A parser is any `Fn(&mut Cursor) -> ParseResult<T>`; combinators
//! return closures of the same shape so they compose freely.
//!
//! [`alternative`] is the only combinator that rewinds: on failure of a
//! branch it restores the cursor to the offset it started from and runs the
//! next branch. A succeeding branch commits its consumption permanently.

use crate::cursor::{Cursor, ParseResult};

/// A parsed value wrapped with the name given by [`label_as`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeled<T> {
    /// Field name.
    pub name: &'static str,
    /// Parsed value.
    pub value: T,
}

/// Ordered choice: tries `first`, and on failure re-runs `second` from the
/// same offset.
pub fn alternative<'a, T>(
    first: impl Fn(&mut Cursor<'a>) -> ParseResult<T>,
    second: impl Fn(&mut Cursor<'a>) -> ParseResult<T>,
) -> impl Fn(&mut Cursor<'a>) -> ParseResult<T> {
    move |cursor| {
        let mark = cursor.checkpoint();
        match first(cursor) {
            Ok(value) => Ok(value),
            Err(_) => {
                cursor.restore(mark);
                second(cursor)
            },
        }
    }
}

/// Runs each parser left to right, collecting the results in order.
///
/// Fails at the first failing parser, leaving the cursor where that parser
/// stopped; wrap in [`alternative`] to recover.
pub fn sequence<'a, T, P>(parsers: &[P]) -> impl Fn(&mut Cursor<'a>) -> ParseResult<Vec<T>> + '_
where
    P: Fn(&mut Cursor<'a>) -> ParseResult<T>,
{
    move |cursor| {
        let mut out = Vec::with_capacity(parsers.len());
        for parser in parsers {
            out.push(parser(cursor)?);
        }
        Ok(out)
    }
}

/// Applies `parser` exactly `n` times.
pub fn count<'a, T>(
    parser: impl Fn(&mut Cursor<'a>) -> ParseResult<T>,
    n: usize,
) -> impl Fn(&mut Cursor<'a>) -> ParseResult<Vec<T>> {
    move |cursor| {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(parser(cursor)?);
        }
        Ok(out)
    }
}

/// Applies `parser` zero or more times, stopping at the first failure.
///
/// The cursor is left after the last successful application; the failing
/// attempt is rolled back.
pub fn repeat<'a, T>(
    parser: impl Fn(&mut Cursor<'a>) -> ParseResult<T>,
) -> impl Fn(&mut Cursor<'a>) -> ParseResult<Vec<T>> {
    move |cursor| {
        let mut out = Vec::new();
        loop {
            let mark = cursor.checkpoint();
            match parser(cursor) {
                Ok(value) => out.push(value),
                Err(_) => {
                    cursor.restore(mark);
                    return Ok(out);
                },
            }
        }
    }
}

/// Wraps a parser's result as `{name: value}`.
pub fn label_as<'a, T>(
    name: &'static str,
    parser: impl Fn(&mut Cursor<'a>) -> ParseResult<T>,
) -> impl Fn(&mut Cursor<'a>) -> ParseResult<Labeled<T>> {
    move |cursor| Ok(Labeled { name, value: parser(cursor)? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ParseFailure;

    fn byte<'a>(expected: u8) -> impl Fn(&mut Cursor<'a>) -> ParseResult<u8> {
        move |cursor| cursor.expect_u8(expected, "tagged byte")
    }

    #[test]
    fn alternative_restores_offset_between_branches() {
        let input = [0x02, 0x09];
        let mut cursor = Cursor::new(&input);
        let parser = alternative(byte(0x01), byte(0x02));
        assert_eq!(parser(&mut cursor), Ok(0x02));
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn alternative_failure_reports_second_branch() {
        let input = [0x09];
        let mut cursor = Cursor::new(&input);
        let parser = alternative(byte(0x01), byte(0x02));
        assert_eq!(parser(&mut cursor), Err(ParseFailure { position: 0, expected: "tagged byte" }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn sequence_collects_in_order() {
        let input = [10, 20, 30];
        let mut cursor = Cursor::new(&input);
        let parsers = [Cursor::u8, Cursor::u8, Cursor::u8];
        assert_eq!(sequence(&parsers)(&mut cursor), Ok(vec![10, 20, 30]));
    }

    #[test]
    fn count_is_exact() {
        let input = [1, 0, 2, 0, 3, 0];
        let mut cursor = Cursor::new(&input);
        assert_eq!(count(Cursor::u16_le, 3)(&mut cursor), Ok(vec![1, 2, 3]));

        let mut cursor = Cursor::new(&input);
        assert!(count(Cursor::u16_le, 4)(&mut cursor).is_err());
    }

    #[test]
    fn repeat_stops_cleanly_at_first_failure() {
        let input = [0xFF, 0xFF, 0xFF, 0x10];
        let mut cursor = Cursor::new(&input);
        let run = repeat(byte(0xFF))(&mut cursor).unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(cursor.peek(), Some(0x10));
    }

    #[test]
    fn label_wraps_value() {
        let input = [0x2A];
        let mut cursor = Cursor::new(&input);
        let labeled = label_as("who_am_i", Cursor::u8)(&mut cursor).unwrap();
        assert_eq!(labeled, Labeled { name: "who_am_i", value: 0x2A });
    }
}
