//! Core genie library (stream client, transcript engine, session sidebar, config).

pub mod chat;
pub mod config;
pub mod input;
pub mod logging;
pub mod sessions;
pub mod stream;
