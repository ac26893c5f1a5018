use bytes::Bytes;

use crate::compute::{ParseError, QueryParser};

/// Removes `key`. Removing a key that does not exist succeeds and changes nothing.
///
/// Syntax: `DEL <key>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Del {
    key: Bytes,
}

impl Del {
    const ARGS_LEN: usize = 2;

    pub fn new(key: impl Into<Bytes>) -> Del {
        Del { key: key.into() }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl TryFrom<&mut QueryParser> for Del {
    type Error = ParseError;

    fn try_from(parser: &mut QueryParser) -> Result<Self, Self::Error> {
        parser.expect_len(Self::ARGS_LEN)?;

        let key = parser.next_bytes()?;

        Ok(Self { key })
    }
}
