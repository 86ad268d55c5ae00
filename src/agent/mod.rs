//! Agent module - talking to the hosted agent runtime.
//!
//! This module contains:
//! - Turn payload and reply types
//! - The signed request sender (network seam)
//! - The streamed response decoder
//! - The session client that ties them together
//!
//! Control flow for one turn:
//!
//! ```text
//! AgentSession::invoke -> RequestSender::send -> (network)
//!     -> RawResponse body -> decoder -> AgentReply
//! ```

pub mod decoder;
mod message;
pub mod sender;
mod session;

// Re-exports for convenience
pub use decoder::{clean_answer, decode_chunks, decode_stream, filter_trace, DecodedEvent, DecodedResponse, StreamDecoder, TraceLog};
pub use message::{AgentReply, AgentRequest, CollaboratorReply, ConversationTurn, TurnAnswer, TurnRequest};
pub use sender::{ChunkStream, HttpMethod, OutboundRequest, RawResponse, RequestSender, SigV4Sender};
pub use session::{AgentSession, END_SESSION_TEXT};
