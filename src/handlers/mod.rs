// src/handlers/mod.rs

pub mod chat;
pub mod status;

pub use chat::chat_completions_handler;
pub use status::{status_handler, StatusResponse};
