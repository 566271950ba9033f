//! Outgoing commands: typed construction, encoding and decoding.

use std::borrow::Cow;
use std::fmt;

use crate::error::{CommandBuildError, ProtocolError};
use crate::state::SessionState;

use super::escape::{escape_value, unescape};

/// A parameter value.
///
/// Values compare by their wire representation: `Int(5) == Text("5")` and a
/// one-element list equals its element, since the wire carries no type tags.
#[derive(Clone, Debug)]
pub enum Value {
    /// Free text, escaped on the wire.
    Text(String),
    /// Integer, rendered in decimal.
    Int(i64),
    /// Repeated parameter (`key=a|key=b`). Never empty once inside a [`Command`].
    List(Vec<String>),
}

impl Value {
    /// Build a list value from anything displayable.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Value::List(items.into_iter().map(|item| item.to_string()).collect())
    }

    /// Unescaped wire pieces of this value, one per repetition.
    pub fn pieces(&self) -> Vec<Cow<'_, str>> {
        match self {
            Value::Text(s) => vec![Cow::Borrowed(s.as_str())],
            Value::Int(n) => vec![Cow::Owned(n.to_string())],
            Value::List(items) => items.iter().map(|s| Cow::Borrowed(s.as_str())).collect(),
        }
    }

    /// The scalar text of this value, or `None` for multi-item lists.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        let mut pieces = self.pieces();
        if pieces.len() == 1 {
            pieces.pop()
        } else {
            None
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.pieces() == other.pieces()
    }
}

impl Eq for Value {}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(i64::from(b))
    }
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Int(i64::from(n))
            }
        })*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        }
    }
}

impl<T: ToString> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::List(items.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

/// A single request line: verb, parameters and bare flags.
///
/// Built through [`Command::builder`], which validates every token, so a
/// `Command` always encodes to exactly one well-formed line.
#[derive(Clone, Debug)]
pub struct Command {
    verb: String,
    params: Vec<(String, Value)>,
    flags: Vec<String>,
    requires: SessionState,
    secrets: Vec<String>,
}

impl Command {
    /// Start building a command. The verb is validated in [`CommandBuilder::build`].
    pub fn builder(verb: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            verb: verb.into(),
            params: Vec::new(),
            flags: Vec::new(),
            requires: SessionState::ContextSelected,
            secrets: Vec::new(),
            error: None,
        }
    }

    /// Command verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Parameters in insertion order.
    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Bare flags in insertion order.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Minimum session state required before this command may be sent.
    pub fn requires(&self) -> SessionState {
        self.requires
    }

    /// Render the wire line (without terminator).
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64);
        // Writing into a String cannot fail.
        let _ = self.write_line(&mut out, false);
        out
    }

    /// Display adapter that masks secret parameters, for logging.
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }

    fn write_line(&self, f: &mut dyn fmt::Write, redact: bool) -> fmt::Result {
        f.write_str(&self.verb)?;

        for (key, value) in &self.params {
            f.write_char(' ')?;
            if redact && self.secrets.iter().any(|s| s == key) {
                write!(f, "{key}=***")?;
                continue;
            }
            for (i, piece) in value.pieces().iter().enumerate() {
                if i > 0 {
                    f.write_char('|')?;
                }
                f.write_str(key)?;
                f.write_char('=')?;
                escape_value(f, piece)?;
            }
        }

        for flag in &self.flags {
            f.write_char(' ')?;
            f.write_str(flag)?;
        }
        Ok(())
    }

    /// Parse a wire line back into a command.
    ///
    /// Decoded values are always [`Value::Text`] or [`Value::List`]; they
    /// compare equal to the original values by wire representation.
    pub fn decode(line: &str) -> Result<Command, ProtocolError> {
        let malformed = |reason: String| ProtocolError::MalformedCommand {
            line: line.to_string(),
            reason,
        };

        let trimmed = line.trim_end_matches(['\r', '\n']);
        let mut tokens = trimmed.split(' ').filter(|t| !t.is_empty());

        let verb = tokens.next().ok_or_else(|| malformed("empty line".to_string()))?;
        if !is_valid_word(verb) {
            return Err(malformed(format!("invalid verb {verb:?}")));
        }

        let mut params: Vec<(String, Value)> = Vec::new();
        let mut flags = Vec::new();

        for token in tokens {
            if !token.contains('=') {
                if !is_valid_flag(token) {
                    return Err(malformed(format!("invalid flag {token:?}")));
                }
                flags.push(token.to_string());
                continue;
            }

            let mut key = None;
            let mut items = Vec::new();
            for piece in token.split('|') {
                let (k, v) = piece
                    .split_once('=')
                    .ok_or_else(|| malformed(format!("expected key=value in {piece:?}")))?;
                if !is_valid_word(k) {
                    return Err(malformed(format!("invalid key {k:?}")));
                }
                match key {
                    None => key = Some(k),
                    Some(first) if first != k => {
                        return Err(malformed(format!("mixed keys {first:?} and {k:?}")));
                    }
                    Some(_) => {}
                }
                items.push(unescape(v));
            }

            let key = key.unwrap_or_default().to_string();
            if params.iter().any(|(k, _)| *k == key) {
                return Err(malformed(format!("duplicate key {key:?}")));
            }
            let value = if items.len() == 1 {
                Value::Text(items.remove(0))
            } else {
                Value::List(items)
            };
            params.push((key, value));
        }

        Ok(Command {
            verb: verb.to_string(),
            params,
            flags,
            requires: SessionState::ContextSelected,
            secrets: Vec::new(),
        })
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.verb == other.verb && self.params == other.params && self.flags == other.flags
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_line(f, false)
    }
}

/// [`Command`] display adapter with secret parameters masked.
pub struct Redacted<'a>(&'a Command);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_line(f, true)
    }
}

/// Builder for [`Command`].
///
/// The first invalid token is remembered and reported by [`build`](Self::build).
#[derive(Debug)]
#[must_use]
pub struct CommandBuilder {
    verb: String,
    params: Vec<(String, Value)>,
    flags: Vec<String>,
    requires: SessionState,
    secrets: Vec<String>,
    error: Option<CommandBuildError>,
}

impl CommandBuilder {
    /// Add a `key=value` parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        self.push(key, value);
        self
    }

    /// Add a parameter only when `value` is `Some`.
    pub fn param_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Add a repeated parameter (`key=a|key=b`).
    pub fn list<I, T>(self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.param(key, Value::list(items))
    }

    /// Add a parameter whose value must never appear in logs.
    pub fn secret(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        self.secrets.push(key.clone());
        self.param(key, value)
    }

    /// Append a bare flag token (for example `-uid`).
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if self.error.is_none() && !is_valid_flag(&flag) {
            self.error = Some(CommandBuildError::InvalidFlag(flag));
            return self;
        }
        self.flags.push(flag);
        self
    }

    /// Set the minimum session state required to send the command.
    pub fn requires(mut self, state: SessionState) -> Self {
        self.requires = state;
        self
    }

    /// Validate and produce the command.
    pub fn build(self) -> Result<Command, CommandBuildError> {
        if self.verb.is_empty() {
            return Err(CommandBuildError::EmptyVerb);
        }
        if !is_valid_word(&self.verb) {
            return Err(CommandBuildError::InvalidVerb(self.verb));
        }
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Command {
            verb: self.verb,
            params: self.params,
            flags: self.flags,
            requires: self.requires,
            secrets: self.secrets,
        })
    }

    fn push(&mut self, key: String, value: Value) {
        if self.error.is_some() {
            return;
        }
        if !is_valid_word(&key) {
            self.error = Some(CommandBuildError::InvalidKey(key));
        } else if matches!(&value, Value::List(items) if items.is_empty()) {
            self.error = Some(CommandBuildError::EmptyList(key));
        } else if self.params.iter().any(|(k, _)| *k == key) {
            self.error = Some(CommandBuildError::DuplicateKey(key));
        } else {
            self.params.push((key, value));
        }
    }
}

/// Verbs and keys: one or more of `[A-Za-z0-9_]`.
pub fn is_valid_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Flags: an optional leading `-` followed by a valid word.
pub fn is_valid_flag(s: &str) -> bool {
    is_valid_word(s.strip_prefix('-').unwrap_or(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalar_params() {
        let cmd = Command::builder("channelcreate")
            .param("channel_name", "Lobby Room")
            .param("channel_flag_permanent", true)
            .build()
            .unwrap();
        assert_eq!(
            cmd.encode(),
            "channelcreate channel_name=Lobby\\sRoom channel_flag_permanent=1"
        );
    }

    #[test]
    fn test_encode_list_repeats_key() {
        let cmd = Command::builder("clientkick")
            .param("reasonid", 5)
            .list("clid", [1, 2, 3])
            .build()
            .unwrap();
        assert_eq!(cmd.encode(), "clientkick reasonid=5 clid=1|clid=2|clid=3");
    }

    #[test]
    fn test_encode_flags_last() {
        let cmd = Command::builder("clientlist")
            .flag("-uid")
            .flag("-away")
            .build()
            .unwrap();
        assert_eq!(cmd.encode(), "clientlist -uid -away");
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let cmd = Command::builder("login")
            .param("client_login_name", "serveradmin")
            .secret("client_login_password", "hunter 2")
            .requires(SessionState::Connected)
            .build()
            .unwrap();
        assert_eq!(
            cmd.redacted().to_string(),
            "login client_login_name=serveradmin client_login_password=***"
        );
        assert!(cmd.encode().contains("hunter\\s2"));
        assert_eq!(cmd.requires(), SessionState::Connected);
    }

    #[test]
    fn test_builder_rejects_bad_tokens() {
        assert_eq!(
            Command::builder("").build().unwrap_err(),
            CommandBuildError::EmptyVerb
        );
        assert_eq!(
            Command::builder("client list").build().unwrap_err(),
            CommandBuildError::InvalidVerb("client list".to_string())
        );
        assert_eq!(
            Command::builder("gm").param("m sg", "x").build().unwrap_err(),
            CommandBuildError::InvalidKey("m sg".to_string())
        );
        assert_eq!(
            Command::builder("clientkick")
                .list("clid", Vec::<u32>::new())
                .build()
                .unwrap_err(),
            CommandBuildError::EmptyList("clid".to_string())
        );
        assert_eq!(
            Command::builder("clientlist").flag("-u|d").build().unwrap_err(),
            CommandBuildError::InvalidFlag("-u|d".to_string())
        );
        assert_eq!(
            Command::builder("use")
                .param("sid", 1)
                .param("sid", 2)
                .build()
                .unwrap_err(),
            CommandBuildError::DuplicateKey("sid".to_string())
        );
    }

    #[test]
    fn test_decode_roundtrip() {
        let cmd = Command::builder("clientmove")
            .param("cid", 12)
            .list("clid", [4, 5])
            .param("cpw", "p|a ss/w\\d")
            .flag("-continueonerror")
            .build()
            .unwrap();
        let decoded = Command::decode(&cmd.encode()).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.param("cpw").unwrap().as_text().unwrap(), "p|a ss/w\\d");
        assert_eq!(decoded.param("clid"), Some(&Value::list([4, 5])));
    }

    #[test]
    fn test_decode_rejects_mixed_keys() {
        let err = Command::decode("clientkick clid=1|cid=2").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedCommand { .. }));
    }

    #[test]
    fn test_decode_empty_line() {
        assert!(Command::decode("\r\n").is_err());
    }

    #[test]
    fn test_value_equality_by_wire_form() {
        assert_eq!(Value::Int(5), Value::Text("5".to_string()));
        assert_eq!(Value::list([7]), Value::Int(7));
        assert_ne!(Value::list([1, 2]), Value::Text("1|2".to_string()));
        assert_eq!(Value::from(u64::MAX), Value::Text(u64::MAX.to_string()));
    }

    #[test]
    fn test_value_from_slice_and_vec() {
        let ids: &[u64] = &[3, 9];
        assert_eq!(Value::from(ids), Value::List(vec!["3".into(), "9".into()]));
        assert_eq!(Value::from(vec!["a", "b"]), Value::list(["a", "b"]));

        let cmd = Command::builder("clientkick")
            .param("clid", ids)
            .param("reasonid", 5)
            .build()
            .unwrap();
        assert_eq!(cmd.encode(), "clientkick clid=3|clid=9 reasonid=5");
    }
}
