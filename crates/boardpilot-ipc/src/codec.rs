//! Stream framing for the service socket
//!
//! The service writes JSON documents back to back with no length prefix or
//! delimiter, and a single socket read may hold part of a document or several
//! documents. [`JsonFrameDecoder`] buffers raw bytes and yields one complete
//! document at a time.

use serde::de::IgnoredAny;
use serde_json::Deserializer;

use crate::error::{IpcError, IpcResult};

/// Default upper bound for a single document
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Incremental splitter for concatenated JSON documents
#[derive(Debug, Clone)]
pub struct JsonFrameDecoder {
    buffer: Vec<u8>,
    max_message_size: usize,
}

impl JsonFrameDecoder {
    /// Create a new decoder with the default size limit
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a decoder with a custom size limit
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_message_size,
        }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Bytes held back waiting for the rest of a document
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append bytes read from the socket
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete document, if one is buffered.
    ///
    /// A malformed or oversized document clears the buffer and returns an
    /// error; decoding can continue with the next pushed bytes.
    pub fn next_frame(&mut self) -> IpcResult<Option<String>> {
        self.skip_padding();
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let mut stream = Deserializer::from_slice(&self.buffer).into_iter::<IgnoredAny>();
        match stream.next() {
            Some(Ok(_)) => {
                let end = stream.byte_offset();
                if end > self.max_message_size {
                    self.buffer.clear();
                    return Err(self.oversized(end));
                }
                let frame: Vec<u8> = self.buffer.drain(..end).collect();
                String::from_utf8(frame)
                    .map(Some)
                    .map_err(|e| IpcError::DecodingFailed(e.to_string()))
            }
            Some(Err(e)) if e.is_eof() => {
                if self.buffer.len() > self.max_message_size {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Err(self.oversized(len));
                }
                Ok(None)
            }
            Some(Err(e)) => {
                self.buffer.clear();
                Err(IpcError::DecodingFailed(e.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Drop everything buffered, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn skip_padding(&mut self) {
        let padding = self
            .buffer
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0))
            .count();
        if padding > 0 {
            self.buffer.drain(..padding);
        }
    }

    fn oversized(&self, len: usize) -> IpcError {
        IpcError::DecodingFailed(format!(
            "Message size {} exceeds maximum {}",
            len, self.max_message_size
        ))
    }
}

impl Default for JsonFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut JsonFrameDecoder) -> IpcResult<Vec<String>> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    #[test]
    fn test_splits_concatenated_documents() -> IpcResult<()> {
        let mut decoder = JsonFrameDecoder::new();
        decoder.push(br#"{"cmd":1,"reqid":0,"status":true}{"cmd":16,"reqid":1,"devices":[]}"#);

        let frames = drain(&mut decoder)?;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.first().map(String::as_str), Some(r#"{"cmd":1,"reqid":0,"status":true}"#));
        assert_eq!(decoder.buffered(), 0);
        Ok(())
    }

    #[test]
    fn test_reassembles_split_document() -> IpcResult<()> {
        let mut decoder = JsonFrameDecoder::new();
        decoder.push(br#"{"cmd":65,"reqid":2,"da"#);
        assert_eq!(decoder.next_frame()?, None);

        decoder.push(br#"ta":"{}"}"#);
        assert_eq!(
            decoder.next_frame()?,
            Some(r#"{"cmd":65,"reqid":2,"data":"{}"}"#.to_string())
        );
        Ok(())
    }

    #[test]
    fn test_skips_nul_padding_and_whitespace() -> IpcResult<()> {
        let mut decoder = JsonFrameDecoder::new();
        decoder.push(b"\0\0 {\"cmd\":1}\n\0{\"cmd\":2}\0\0");

        assert_eq!(drain(&mut decoder)?, vec!["{\"cmd\":1}", "{\"cmd\":2}"]);
        assert_eq!(decoder.buffered(), 0);
        Ok(())
    }

    #[test]
    fn test_malformed_input_resets_buffer() -> IpcResult<()> {
        let mut decoder = JsonFrameDecoder::new();
        decoder.push(b"{\"cmd\":]");
        assert!(matches!(decoder.next_frame(), Err(IpcError::DecodingFailed(_))));
        assert_eq!(decoder.buffered(), 0);

        decoder.push(b"{\"cmd\":1}");
        assert_eq!(decoder.next_frame()?, Some("{\"cmd\":1}".to_string()));
        Ok(())
    }

    #[test]
    fn test_oversized_partial_document_rejected() {
        let mut decoder = JsonFrameDecoder::with_max_size(16);
        decoder.push(b"{\"data\":\"0123456789abcdef");
        assert!(matches!(decoder.next_frame(), Err(IpcError::DecodingFailed(_))));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_oversized_complete_document_rejected() {
        let mut decoder = JsonFrameDecoder::with_max_size(8);
        decoder.push(b"{\"cmd\":12345}");
        assert!(decoder.next_frame().is_err());
    }
}
