//! GutChat reasoning core.
//!
//! Intent resolution, microbiome metrics, reply composition, learned
//! corrections and wearable scoring. Transport, persistence and the remote
//! language model are left to the host.

pub mod assistant;
pub mod augment;
pub mod brain;
pub mod config;
pub mod error;
pub mod health;
pub mod learning;
pub mod microbiome;
pub mod models;
pub mod telemetry;

pub use assistant::{Assistant, ChatReply, ChatRequest, ReplySource};
pub use error::AppError;

#[cfg(test)]
mod tests;
