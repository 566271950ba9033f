//! Value escaping for the query wire format.
//!
//! Space separates parameters, `|` separates rows and repeated values, and
//! line terminators end a message, so all of them travel escaped. Control
//! characters outside the table (NUL, ESC, ...) are sent verbatim.

use std::fmt::{Result as FmtResult, Write};

/// Escape a value for the wire.
pub fn escape_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '/' => f.write_str("\\/")?,
            ' ' => f.write_str("\\s")?,
            '|' => f.write_str("\\p")?,
            '\x07' => f.write_str("\\a")?,
            '\x08' => f.write_str("\\b")?,
            '\x0c' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\x0b' => f.write_str("\\v")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Escape a value into a fresh `String`.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    // Writing into a String cannot fail.
    let _ = escape_value(&mut out, value);
    out
}

/// Unescape a value from wire format.
///
/// Reverses [`escape_value`]. Unknown escapes yield the escaped character and
/// a trailing lone backslash is dropped.
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some('\\') => '\\',
                Some('/') => '/',
                Some('s') => ' ',
                Some('p') => '|',
                Some('a') => '\x07',
                Some('b') => '\x08',
                Some('f') => '\x0c',
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('v') => '\x0b',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Whether `c` must be escaped on the wire.
pub fn is_reserved(c: char) -> bool {
    matches!(
        c,
        '\\' | '/' | ' ' | '|' | '\x07' | '\x08' | '\x0c' | '\n' | '\r' | '\t' | '\x0b'
    )
}
