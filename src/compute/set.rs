use bytes::Bytes;

use crate::compute::{ParseError, QueryParser};

/// Set `key` to hold `value`. If `key` already holds a value, it is overwritten.
///
/// Syntax: `SET <key> <value>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Set {
    key: Bytes,
    value: Bytes,
}

impl Set {
    const ARGS_LEN: usize = 3;

    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Set {
        Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

impl TryFrom<&mut QueryParser> for Set {
    type Error = ParseError;

    fn try_from(parser: &mut QueryParser) -> Result<Self, Self::Error> {
        parser.expect_len(Self::ARGS_LEN)?;

        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
