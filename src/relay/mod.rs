//! Mention relay - rebuilds reply threads and answers through OpenAI.

pub mod discord;
pub mod gateway;
pub mod handler;
pub mod message;
pub mod thread;

pub use gateway::CompletionGateway;
pub use handler::RelayHandler;
