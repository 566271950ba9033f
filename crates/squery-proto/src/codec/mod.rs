//! Wire codec: escaping, command encoding and response decoding.

mod command;
mod escape;
mod response;

pub use command::{is_valid_flag, is_valid_word, Command, CommandBuilder, Redacted, Value};
pub use escape::{escape, escape_value, is_reserved, unescape};
pub use response::{classify, LineKind, Response, ResponseReader, Row, Status};
