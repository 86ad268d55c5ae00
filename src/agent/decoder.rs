//! Streamed response decoder
//!
//! The agent runtime answers with an event stream: binary framing around
//! JSON payloads. Payload-bearing events carry a base64 `bytes` field; trace
//! events carry plain JSON. The framing is not owned by this crate, so the
//! decoder works on the text view of the stream rather than the binary
//! frame structure:
//!
//! 1. Chunks are decoded as UTF-8 in arrival order. Bytes that are not
//!    valid UTF-8 (binary preludes, checksums) are dropped; the valid runs
//!    around them are kept. A character split across chunks is joined.
//! 2. The text is split on `:message-type`, one segment per framed event.
//! 3. Every segment but the last is classified; payload fragments are
//!    decoded into the trace.
//! 4. The last segment holds the answer, either as a `bytes` payload or,
//!    failing that, as the `finalResponse` object embedded in a trace event.
//! 5. The answer is cleaned of quote characters and known noise.
//!
//! The payload field is located positionally: it is the fourth
//! `"`-delimited token of the segment. A change in upstream field order
//! would break this.

use base64::{engine::general_purpose::STANDARD, Engine};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::Result;
use super::sender::ChunkStream;

/// Delimiter between framed events in the text view of the stream.
pub const MESSAGE_DELIMITER: &str = ":message-type";

const BYTES_MARKER: &str = "\"bytes\"";
const FINAL_RESPONSE_KEY: &str = "finalResponse\":";
const FINAL_RESPONSE_END: &str = "\"}";

/// Fragments of the runtime's internal representation that leak into answers.
const NOISE: [&str; 2] = ["{input:{value:", ",source:null}}"];

/// A logical unit recovered from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Diagnostic event, kept verbatim.
    Trace(String),
    /// Decoded payload fragment from a `bytes` field.
    Chunk(String),
    /// The uncleaned final answer.
    FinalResponse(String),
}

/// Accumulates diagnostic lines for one decode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLog {
    buf: String,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        debug!(target: "portfolio_agent::trace", "{}", text);
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Keep only lines containing `query`, case-insensitively.
///
/// An empty query returns the trace unchanged.
pub fn filter_trace(trace: &str, query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return trace.to_string();
    }

    let needle = query.to_lowercase();
    trace
        .lines()
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of decoding one response.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    /// Cleaned final answer
    pub answer: String,
    pub trace: TraceLog,
    pub events: Vec<DecodedEvent>,
    /// Answer before cleanup, as carried by the stream
    pub raw_answer: String,
    /// Bytes dropped because they were not valid UTF-8
    pub skipped_bytes: usize,
}

/// Incremental decoder: feed chunks in arrival order, then `finish`.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: String,
    /// Incomplete UTF-8 sequence at the end of the last chunk
    pending: Vec<u8>,
    skipped_bytes: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, dropping the bytes that are not valid UTF-8.
    pub fn push(&mut self, chunk: &[u8]) {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut rest = buf.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.text.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, invalid) = rest.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.text.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.skipped_bytes += len;
                            rest = &invalid[len..];
                        }
                        // Truncated sequence; the next chunk may complete it
                        None => {
                            self.pending = invalid.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Decode everything pushed so far.
    pub fn finish(self) -> Result<DecodedResponse> {
        let skipped_bytes = self.skipped_bytes + self.pending.len();
        if skipped_bytes > 0 {
            debug!("Skipped {} non-UTF-8 bytes", skipped_bytes);
        }
        decode_text(&self.text, skipped_bytes)
    }
}

/// Decode an in-memory chunk sequence.
pub fn decode_chunks<I, B>(chunks: I) -> Result<DecodedResponse>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut decoder = StreamDecoder::new();
    for chunk in chunks {
        decoder.push(chunk.as_ref());
    }
    decoder.finish()
}

/// Drain a response body and decode it.
///
/// Transport errors while reading the body propagate; decoding starts only
/// once the whole body has arrived.
pub async fn decode_stream(mut body: ChunkStream) -> Result<DecodedResponse> {
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = body.next().await {
        decoder.push(&chunk?);
    }
    decoder.finish()
}

fn decode_text(text: &str, skipped_bytes: usize) -> Result<DecodedResponse> {
    let mut trace = TraceLog::new();
    let mut events = Vec::new();

    trace.line(format!("Decoded response: {}", text));
    let segments: Vec<&str> = text.split(MESSAGE_DELIMITER).collect();
    trace.line(format!("Split Response: {:?}", segments));
    trace.line(format!("Length of split: {}", segments.len()));

    let (last, earlier) = match segments.split_last() {
        Some(split) => split,
        None => (&"", &[][..]),
    };

    for (idx, segment) in earlier.iter().enumerate() {
        if segment.contains(BYTES_MARKER) {
            match extract_bytes_payload(segment) {
                Ok(fragment) => {
                    trace.line(&fragment);
                    events.push(DecodedEvent::Chunk(fragment));
                }
                Err(e) => {
                    trace.line(format!("Undecodable payload at index {}: {}", idx, e));
                }
            }
        } else {
            trace.line(format!("No bytes at index {}", idx));
            trace.line(segment);
            events.push(DecodedEvent::Trace(segment.to_string()));
        }
    }

    trace.line(format!("Last Response: {}", last));
    let raw_answer = if last.contains(BYTES_MARKER) {
        trace.line("Bytes in last response");
        extract_bytes_payload(last)?
    } else {
        trace.line("No bytes in last response");
        if !last.is_empty() {
            events.push(DecodedEvent::Trace(last.to_string()));
        }
        if text.trim().is_empty() {
            if skipped_bytes > 0 {
                return Err(Error::Decode(format!(
                    "response held {} bytes and no readable text",
                    skipped_bytes
                )));
            }
            String::new()
        } else {
            extract_final_response(text)?
        }
    };

    events.push(DecodedEvent::FinalResponse(raw_answer.clone()));

    Ok(DecodedResponse {
        answer: clean_answer(&raw_answer),
        trace,
        events,
        raw_answer,
        skipped_bytes,
    })
}

/// Decode the base64 value of the fourth `"`-delimited token.
fn extract_bytes_payload(segment: &str) -> Result<String> {
    let encoded = segment.split('"').nth(3).ok_or_else(|| {
        Error::Decode("payload field not found at the expected position".to_string())
    })?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Decode(format!("invalid base64 payload: {}", e)))?;

    String::from_utf8(decoded).map_err(|e| Error::Decode(format!("payload is not UTF-8: {}", e)))
}

/// Pull the answer out of the first `finalResponse":...` occurrence.
///
/// The candidate runs up to and including the next `"}`; its first JSON
/// value is taken. An object yields its `text` field, a bare string is
/// taken as is.
fn extract_final_response(text: &str) -> Result<String> {
    let start = text
        .find(FINAL_RESPONSE_KEY)
        .ok_or_else(|| Error::Decode("no finalResponse event in stream".to_string()))?
        + FINAL_RESPONSE_KEY.len();
    let tail = &text[start..];

    let end = tail
        .find(FINAL_RESPONSE_END)
        .ok_or_else(|| Error::Decode("unterminated finalResponse event".to_string()))?
        + FINAL_RESPONSE_END.len();
    let candidate = &tail[..end];

    let value = serde_json::Deserializer::from_str(candidate)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| Error::Decode("empty finalResponse event".to_string()))?
        .map_err(|e| Error::Decode(format!("finalResponse is not valid JSON: {}", e)))?;

    match value {
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("finalResponse has no text field".to_string())),
        Value::String(s) => Ok(s),
        other => Err(Error::Decode(format!("unexpected finalResponse value: {}", other))),
    }
}

/// Strip quote characters and leaked noise from an answer.
///
/// Applying it to its own output is a no-op.
pub fn clean_answer(answer: &str) -> String {
    let mut out = answer.replace('"', "");
    loop {
        let before = out.len();
        for noise in NOISE {
            out = out.replace(noise, "");
        }
        if out.len() == before {
            break;
        }
    }
    out
}
