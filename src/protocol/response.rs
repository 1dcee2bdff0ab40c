//! Reply writer: accumulates `key: value\n` lines and the final
//! `OK\n`/`list_OK\n`/`ACK ...\n` terminator, plus binary chunk framing.

use std::fmt::Display;

use crate::error::AckError;

/// Buffers one command's reply. Handlers call `line`/`pair` freely; the
/// session driving dispatch appends the terminator once the handler returns.
///
/// Byte-backed rather than `String`-backed: a `binary` chunk
/// (`albumart`/`readpicture`) carries arbitrary bytes, and a lossy UTF-8
/// conversion would both corrupt the payload and make the emitted byte
/// count disagree with the `binary: N` header.
#[derive(Debug, Default)]
pub struct Response {
    buf: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&mut self, key: &str, value: impl Display) {
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.extend_from_slice(b": ");
        self.buf.extend_from_slice(value.to_string().as_bytes());
        self.buf.push(b'\n');
    }

    pub fn line(&mut self, raw: &str) {
        self.buf.extend_from_slice(raw.as_bytes());
        self.buf.push(b'\n');
    }

    /// Appends a `binary: N\n<N bytes>\n` chunk. Callers must have already
    /// checked `data.len() <= binary_limit`; this function does not enforce
    /// that, since the limit is per-session state the caller already owns.
    pub fn binary_chunk(&mut self, data: &[u8]) {
        self.pair("binary", data.len());
        self.buf.extend_from_slice(data);
        self.buf.push(b'\n');
    }

    pub fn into_ok(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(b"OK\n");
        self.buf
    }

    pub fn into_list_ok(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(b"list_OK\n");
        self.buf
    }

    /// Renders the accumulated lines followed by the ACK terminator for a
    /// failing command at `index` within the active command list (0 if not
    /// inside one).
    pub fn into_ack(mut self, err: &AckError, command_name: &str, index: u32) -> Vec<u8> {
        self.buf.extend_from_slice(err.render(command_name, index).as_bytes());
        self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AckCode;

    #[test]
    fn pair_then_ok() {
        let mut r = Response::new();
        r.pair("volume", 80);
        assert_eq!(r.into_ok(), b"volume: 80\nOK\n");
    }

    #[test]
    fn binary_chunk_framing() {
        let mut r = Response::new();
        r.binary_chunk(b"abc");
        assert_eq!(r.into_ok(), b"binary: 3\nabc\nOK\n");
    }

    #[test]
    fn binary_chunk_carries_non_utf8_bytes_unmodified() {
        let mut r = Response::new();
        let data = [0xff, 0x00, 0xfe, b'\n', 0x80];
        r.binary_chunk(&data);
        let body = r.into_ok();
        let mut expected = b"binary: 5\n".to_vec();
        expected.extend_from_slice(&data);
        expected.extend_from_slice(b"\nOK\n");
        assert_eq!(body, expected);
    }

    #[test]
    fn ack_terminator_carries_index_and_command() {
        let r = Response::new();
        let err = AckError::new(AckCode::NoExist, "No such song");
        assert_eq!(
            r.into_ack(&err, "playid", 2),
            b"ACK [50@2] {playid} No such song\n"
        );
    }
}
