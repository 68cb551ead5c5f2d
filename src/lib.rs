//! relaychat: a minimal chat relay in front of a hosted language model.

pub mod chat;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod http;
pub mod providers;
pub mod session;
