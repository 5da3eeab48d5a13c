//! Streaming query transport.
//!
//! [`StreamClient`] posts a [`ChatRequest`] and reads the Server-Sent Events
//! body; [`frame`] turns each SSE `data` field into a [`Frame`].

mod client;
mod error;
pub mod frame;
mod request;

pub use client::{
    FrameStream, GENIE_USER_AGENT, StreamClient, StreamEnd, StreamEvent, StreamMessage,
    Subscription,
};
pub use error::{StreamError, StreamErrorKind};
pub use frame::{EventFrame, Frame, Terminal, parse_frame};
pub use request::ChatRequest;
