//! Incoming responses: data rows and the terminal status line.
//!
//! A response is zero or more data lines followed by exactly one status line:
//!
//! ```text
//! clid=1 cid=2 client_nickname=serveradmin|clid=5 cid=2 client_nickname=alice
//! error id=0 msg=ok
//! ```
//!
//! Data lines split on `|` into rows and each row splits on spaces into
//! `key=value` entries. The status line is parsed with `nom`.

use std::fmt;

use indexmap::IndexMap;
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, space0, space1},
    combinator::opt,
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

use crate::error::{CommandError, ProtocolError};

use super::escape::{escape_value, unescape};

/// One decoded result row: field name to unescaped value, in wire order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one row segment (the text between `|` separators).
    ///
    /// Entries without `=` are kept with an empty value.
    pub fn parse(segment: &str) -> Self {
        let fields = segment
            .split(' ')
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => (k.to_string(), unescape(v)),
                None => (entry.to_string(), String::new()),
            })
            .collect();
        Self { fields }
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value of a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Whether the row carries `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(key, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required text field.
    pub fn text(&self, key: &str) -> Result<&str, ProtocolError> {
        self.get(key).ok_or_else(|| ProtocolError::MissingField {
            field: key.to_string(),
        })
    }

    /// Required signed integer field.
    pub fn int(&self, key: &str) -> Result<i64, ProtocolError> {
        self.opt_int(key)?.ok_or_else(|| ProtocolError::MissingField {
            field: key.to_string(),
        })
    }

    /// Required unsigned integer field.
    pub fn uint(&self, key: &str) -> Result<u64, ProtocolError> {
        self.opt_uint(key)?.ok_or_else(|| ProtocolError::MissingField {
            field: key.to_string(),
        })
    }

    /// Optional signed integer field.
    pub fn opt_int(&self, key: &str) -> Result<Option<i64>, ProtocolError> {
        self.get(key)
            .map(|v| v.parse::<i64>().map_err(|_| invalid(key, v, "integer")))
            .transpose()
    }

    /// Optional unsigned integer field.
    pub fn opt_uint(&self, key: &str) -> Result<Option<u64>, ProtocolError> {
        self.get(key)
            .map(|v| v.parse::<u64>().map_err(|_| invalid(key, v, "unsigned integer")))
            .transpose()
    }

    /// Optional `0`/`1` field.
    pub fn opt_flag(&self, key: &str) -> Result<Option<bool>, ProtocolError> {
        self.get(key)
            .map(|v| match v {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(invalid(key, other, "0 or 1")),
            })
            .transpose()
    }

    /// Optional text field; empty values count as absent.
    pub fn opt_text(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ProtocolError {
    ProtocolError::InvalidField {
        field: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(key)?;
            f.write_str("=")?;
            escape_value(f, value)?;
        }
        Ok(())
    }
}

/// Terminal status of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    /// `0` for success, anything else is a server-side failure.
    pub id: u32,
    /// Human-readable message.
    pub message: String,
    /// Additional detail (`extra_msg`), if the server sent one.
    pub extra_message: Option<String>,
}

impl Status {
    /// Create a status with no extra detail.
    pub fn new(id: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            extra_message: None,
        }
    }

    /// The canonical success status (`error id=0 msg=ok`).
    pub fn ok() -> Self {
        Self::new(0, "ok")
    }

    /// Whether the status reports success.
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }

    /// Parse a status line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let malformed = |reason: &str| ProtocolError::MalformedStatus {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (rest, entries) =
            status_entries(line).map_err(|_| malformed("expected `error` keyword"))?;
        let (rest, _) = space0::<_, nom::error::Error<&str>>(rest)
            .map_err(|_| malformed("unparsable trailing input"))?;
        if !rest.is_empty() {
            return Err(malformed("unparsable trailing input"));
        }

        let field = |name: &str| {
            entries
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| unescape(v.unwrap_or_default()))
        };

        let id = field("id")
            .ok_or_else(|| malformed("missing id"))?
            .parse::<u32>()
            .map_err(|_| malformed("non-numeric id"))?;

        Ok(Self {
            id,
            message: field("msg").unwrap_or_default(),
            extra_message: field("extra_msg").filter(|m| !m.is_empty()),
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error id={} msg=", self.id)?;
        escape_value(f, &self.message)?;
        if let Some(extra) = &self.extra_message {
            f.write_str(" extra_msg=")?;
            escape_value(f, extra)?;
        }
        Ok(())
    }
}

fn status_entry(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        opt(preceded(char('='), take_till(|c| c == ' '))),
    )(input)
}

fn status_entries(input: &str) -> IResult<&str, Vec<(&str, Option<&str>)>> {
    preceded(tag("error"), many0(preceded(space1, status_entry)))(input)
}

/// Kind of a received line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Result rows.
    Data,
    /// Unsolicited event (`notify…`), not part of any response.
    Notification,
    /// Terminal status line.
    Status,
}

/// Classify a received line.
pub fn classify(line: &str) -> LineKind {
    if line == "error" || line.starts_with("error ") {
        LineKind::Status
    } else if line.starts_with("notify") {
        LineKind::Notification
    } else {
        LineKind::Data
    }
}

/// A complete response: rows plus terminal status.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    /// Rows in arrival order.
    pub rows: Vec<Row>,
    /// Terminal status.
    pub status: Status,
}

impl Response {
    /// Whether the status reports success.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Turn a failure status into a [`CommandError`] that keeps the rows.
    pub fn into_result(self) -> Result<Response, CommandError> {
        if self.status.is_ok() {
            Ok(self)
        } else {
            Err(CommandError {
                status: self.status,
                rows: self.rows,
            })
        }
    }

    /// Parse a complete response text (data lines then status line).
    ///
    /// Notification lines are ignored. Text after the status line is an error.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut reader = ResponseReader::new();
        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            if let Some(response) = reader.feed(line)? {
                if let Some(extra) = lines.find(|l| !l.trim().is_empty()) {
                    return Err(ProtocolError::MalformedStatus {
                        line: extra.to_string(),
                        reason: "data after status line".to_string(),
                    });
                }
                return Ok(response);
            }
        }
        Err(ProtocolError::MalformedStatus {
            line: String::new(),
            reason: "missing status line".to_string(),
        })
    }
}

/// Incremental response decoder fed one line at a time.
#[derive(Debug, Default)]
pub struct ResponseReader {
    rows: Vec<Row>,
}

impl ResponseReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows collected so far.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Feed one line (terminator optional).
    ///
    /// Returns the complete response once the status line arrives; the reader
    /// is then reset for the next response.
    pub fn feed(&mut self, line: &str) -> Result<Option<Response>, ProtocolError> {
        let line = line.trim_matches(['\r', '\n']);
        match classify(line) {
            LineKind::Status => {
                let status = Status::parse(line)?;
                Ok(Some(Response {
                    rows: std::mem::take(&mut self.rows),
                    status,
                }))
            }
            LineKind::Notification => Ok(None),
            LineKind::Data => {
                self.rows.extend(
                    line.split('|')
                        .map(Row::parse)
                        .filter(|row| !row.is_empty()),
                );
                Ok(None)
            }
        }
    }
}
