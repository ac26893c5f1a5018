pub mod del;
pub mod get;
pub mod set;

use bytes::Bytes;
use std::str::{self, FromStr};
use std::vec;
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};
use thiserror::Error as ThisError;

use del::Del;
use get::Get;
use set::Set;

/// Maximum accepted length, in bytes, of a raw command line unless configured otherwise.
pub const DEFAULT_MAX_LEN: usize = 128;

/// A validated command, ready to be executed against the storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    Set(Set),
    Get(Get),
    Del(Del),
}

impl Query {
    pub fn command(&self) -> CommandName {
        match self {
            Query::Set(_) => CommandName::Set,
            Query::Get(_) => CommandName::Get,
            Query::Del(_) => CommandName::Del,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantNames)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CommandName {
    Set,
    Get,
    Del,
}

/// Parses raw command lines into [`Query`] values.
///
/// A line is split on runs of whitespace; the first field names the command (matched
/// case-insensitively) and the remaining fields are taken verbatim as its arguments. The length
/// limit applies to the raw line, before splitting.
#[derive(Clone, Debug)]
pub struct Compute {
    max_len: usize,
}

impl Compute {
    pub fn new(max_len: usize) -> Compute {
        Compute { max_len }
    }

    pub fn parse(&self, raw: &Bytes) -> Result<Query, ParseError> {
        let parser = &mut self.parse_fields(raw)?;

        match parser.command {
            CommandName::Set => Set::try_from(parser).map(Query::Set),
            CommandName::Get => Get::try_from(parser).map(Query::Get),
            CommandName::Del => Del::try_from(parser).map(Query::Del),
        }
    }

    fn parse_fields(&self, raw: &Bytes) -> Result<QueryParser, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        if raw.len() > self.max_len {
            return Err(ParseError::InvalidLength {
                max: self.max_len,
                actual: raw.len(),
            });
        }

        let mut fields = split_fields(raw);

        if fields.is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        let len = fields.len();
        let name = fields.remove(0);
        let command = str::from_utf8(&name)
            .ok()
            .and_then(|name| CommandName::from_str(name).ok())
            .ok_or_else(|| ParseError::UnknownCommand {
                command: String::from_utf8_lossy(&name).into_owned(),
            })?;

        Ok(QueryParser {
            command,
            len,
            parts: fields.into_iter(),
        })
    }
}

impl Default for Compute {
    fn default() -> Self {
        Compute::new(DEFAULT_MAX_LEN)
    }
}

/// Splits `raw` on runs of whitespace: ASCII whitespace including `\v`, plus any UTF-8 encoded
/// Unicode whitespace such as U+0085 and U+00A0. Bytes that are not valid UTF-8 never separate
/// fields.
///
/// Fields are sliced out of `raw`, so keys and values share its allocation.
fn split_fields(raw: &Bytes) -> Vec<Bytes> {
    let mut fields = Vec::new();
    let mut start = None;
    let mut i = 0;

    while i < raw.len() {
        match whitespace_len(&raw[i..]) {
            Some(width) => {
                if let Some(start) = start.take() {
                    fields.push(raw.slice(start..i));
                }
                i += width;
            }
            None => {
                start.get_or_insert(i);
                i += 1;
            }
        }
    }

    if let Some(start) = start {
        fields.push(raw.slice(start..));
    }

    fields
}

/// Byte length of the whitespace character `bytes` starts with, if it starts with one.
fn whitespace_len(bytes: &[u8]) -> Option<usize> {
    let width = match bytes[0] {
        b'\t' | b'\n' | 0x0B | 0x0C | b'\r' | b' ' => return Some(1),
        0x00..=0x7F => return None,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return None,
    };

    let c = str::from_utf8(bytes.get(..width)?).ok()?.chars().next()?;
    c.is_whitespace().then_some(width)
}

/// Cursor over the argument fields of a single command line.
pub struct QueryParser {
    command: CommandName,
    // Field count of the whole line, command name included.
    len: usize,
    parts: vec::IntoIter<Bytes>,
}

impl QueryParser {
    /// Fails unless the line has exactly `expected` fields, the command name included.
    fn expect_len(&self, expected: usize) -> Result<(), ParseError> {
        if self.len != expected {
            return Err(ParseError::InvalidArguments {
                command: self.command,
                expected,
                actual: self.len,
            });
        }

        Ok(())
    }

    fn next_bytes(&mut self) -> Result<Bytes, ParseError> {
        self.parts.next().ok_or(ParseError::InvalidArguments {
            command: self.command,
            expected: self.len + 1,
            actual: self.len,
        })
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum ParseError {
    #[error("empty query")]
    EmptyQuery,
    #[error("invalid len: expected from 0 to {max}, got {actual}")]
    InvalidLength { max: usize, actual: usize },
    #[error("unknown command: {command:?}")]
    UnknownCommand { command: String },
    #[error("invalid arguments: {command} expects {expected} arguments, got {actual}")]
    InvalidArguments {
        command: CommandName,
        expected: usize,
        actual: usize,
    },
}
