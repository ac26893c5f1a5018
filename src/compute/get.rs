use bytes::Bytes;

use crate::compute::{ParseError, QueryParser};

/// Get the value of `key`. Reading a key that does not exist is not an error; it is reported as
/// not found.
///
/// Syntax: `GET <key>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Get {
    key: Bytes,
}

impl Get {
    const ARGS_LEN: usize = 2;

    pub fn new(key: impl Into<Bytes>) -> Get {
        Get { key: key.into() }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl TryFrom<&mut QueryParser> for Get {
    type Error = ParseError;

    fn try_from(parser: &mut QueryParser) -> Result<Self, Self::Error> {
        parser.expect_len(Self::ARGS_LEN)?;

        let key = parser.next_bytes()?;

        Ok(Self { key })
    }
}
