//! Commands, responses and the text framing used on broker connections
//!
//! Requests are single lines, `stats [item] <opaque>\r\n`. Replies are a
//! header line `result <code> <length> <opaque>\r\n` followed by exactly
//! `length` bytes of body.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::MetaClientError;

pub type Opaque = i32;

/// Reply code of a successful command
pub const SUCCESS_CODE: u16 = 200;

const STATS_CMD: &str = "stats";
const RESULT_CMD: &str = "result";
const CRLF: &[u8] = b"\r\n";
const MAX_HEADER_LEN: usize = 1024;
/// Largest reply body accepted from a broker
pub const MAX_BODY_LEN: usize = 8 * 1024 * 1024;

/// Request for a broker's operational counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsCommand {
    item: Option<String>,
    opaque: Opaque,
}

impl StatsCommand {
    /// Build a stats request; a blank item means "all categories".
    ///
    /// The item travels as one token of a single request line, so inner
    /// whitespace and control characters are rejected.
    pub fn new(item: Option<&str>) -> Result<Self, MetaClientError> {
        let item = item.map(str::trim).filter(|item| !item.is_empty());

        if let Some(item) = item {
            if item.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(MetaClientError::invalid_argument(format!(
                    "stats item {:?} must be a single token",
                    item
                )));
            }
        }

        Ok(Self {
            item: item.map(str::to_string),
            opaque: 0,
        })
    }

    /// Item filter, `None` for all categories
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }
}

/// Commands a remoting client can carry to a broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stats(StatsCommand),
}

impl Command {
    /// Correlation token carried by the command
    pub fn opaque(&self) -> Opaque {
        match self {
            Command::Stats(cmd) => cmd.opaque,
        }
    }

    /// Stamp the correlation token
    pub fn set_opaque(&mut self, opaque: Opaque) {
        match self {
            Command::Stats(cmd) => cmd.opaque = opaque,
        }
    }
}

impl From<StatsCommand> for Command {
    fn from(cmd: StatsCommand) -> Self {
        Command::Stats(cmd)
    }
}

/// Broker reply correlated to a command by its opaque
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub message: String,
    pub opaque: Opaque,
}

impl Response {
    pub fn new<S: Into<String>>(code: u16, message: S, opaque: Opaque) -> Self {
        Self {
            code,
            message: message.into(),
            opaque,
        }
    }

    /// Whether the broker reported success
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Codec for broker connections: encodes `Command`s, decodes `Response`s
#[derive(Debug, Default)]
pub struct MetaCodec {
    _private: (),
}

impl MetaCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl tokio_util::codec::Encoder<Command> for MetaCodec {
    type Error = MetaClientError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Command::Stats(cmd) => {
                let line = match cmd.item {
                    Some(ref item) => format!("{} {} {}", STATS_CMD, item, cmd.opaque),
                    None => format!("{} {}", STATS_CMD, cmd.opaque),
                };
                dst.reserve(line.len() + CRLF.len());
                dst.put_slice(line.as_bytes());
                dst.put_slice(CRLF);
            }
        }
        Ok(())
    }
}

impl tokio_util::codec::Decoder for MetaCodec {
    type Item = Response;
    type Error = MetaClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header_end = match src.windows(CRLF.len()).position(|w| w == CRLF) {
            Some(pos) => pos,
            None if src.len() > MAX_HEADER_LEN => {
                return Err(MetaClientError::protocol("response header too long"));
            }
            None => return Ok(None),
        };

        let header = std::str::from_utf8(&src[..header_end])
            .map_err(|_| MetaClientError::protocol("response header is not UTF-8"))?;
        let (code, body_len, opaque) = parse_result_header(header)?;
        if body_len > MAX_BODY_LEN {
            return Err(MetaClientError::protocol(format!(
                "response body too large: {} bytes",
                body_len
            )));
        }

        let frame_len = (header_end + CRLF.len())
            .checked_add(body_len)
            .ok_or_else(|| MetaClientError::protocol("response body too large"))?;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_end + CRLF.len());
        let body = src.split_to(body_len);
        let message = String::from_utf8(body.to_vec())
            .map_err(|_| MetaClientError::protocol("response body is not UTF-8"))?;

        Ok(Some(Response::new(code, message, opaque)))
    }
}

fn parse_result_header(header: &str) -> Result<(u16, usize, Opaque), MetaClientError> {
    let malformed = || MetaClientError::protocol(format!("malformed response header '{}'", header));

    let mut parts = header.split_whitespace();
    if parts.next() != Some(RESULT_CMD) {
        return Err(malformed());
    }

    let code = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    let body_len = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;
    let opaque = parts.next().and_then(|s| s.parse().ok()).ok_or_else(malformed)?;

    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok((code, body_len, opaque))
}
