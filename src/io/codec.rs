//! Request line framing
//!
//! [`RequestCodec`] splits the byte stream into lines like `LinesCodec`, but
//! turns the two per-line decode failures (over-long line, invalid UTF-8)
//! into items instead of errors. `Framed` stops yielding frames after a
//! decoder error, so surfacing them as items is what lets a session answer
//! a bad line and keep reading.

use super::protocol::MAX_LINE_LENGTH;
use crate::types::CommandError;
use std::io::ErrorKind;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Line codec whose items carry per-line rejections
#[derive(Debug, Clone)]
pub struct RequestCodec {
    lines: LinesCodec,
}

impl RequestCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Map line-level decode failures onto rejections
///
/// `LinesCodec` has already consumed (or is discarding) the offending line
/// when it reports either failure, so decoding resumes at the next line.
fn recover(
    decoded: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Result<String, CommandError>>, LinesCodecError> {
    match decoded {
        Ok(line) => Ok(line.map(Ok)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Err(CommandError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }))),
        Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
            Ok(Some(Err(CommandError::InvalidEncoding)))
        }
        Err(e) => Err(e),
    }
}

impl Decoder for RequestCodec {
    type Item = Result<String, CommandError>;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        recover(self.lines.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        recover(self.lines.decode_eof(buf))
    }
}

impl Encoder<String> for RequestCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.lines.encode(line, dst)
    }
}
