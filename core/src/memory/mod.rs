//! Session memory
//!
//! The Messages API is stateless; the whole history is resent on every call.

pub mod conversation;

pub use conversation::ConversationMemory;
