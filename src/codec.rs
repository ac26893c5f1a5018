use bytes::{Bytes, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Splits an input stream into raw command lines.
///
/// Lines are terminated by `\n`, with an optional `\r` before it. Unlike `LinesCodec` the lines
/// are not required to be UTF-8: they are handed to the parser as raw bytes. There is no limit on
/// the line length here; the parser enforces its own.
#[derive(Debug, Default)]
pub struct LineCodec {
    // Number of buffered bytes already known not to contain a newline, so a partial line is not
    // scanned again on every read.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> LineCodec {
        LineCodec::default()
    }
}

fn without_carriage_return(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let position = self.next_index + offset;
                self.next_index = 0;

                let mut line = src.split_to(position + 1);
                line.truncate(position);

                Ok(Some(without_carriage_return(line)))
            }
            None => {
                // Not enough data to yield a full line yet.
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }

        let line = src.split_to(src.len());
        Ok(Some(without_carriage_return(line)))
    }
}
