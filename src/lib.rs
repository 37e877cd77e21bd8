//! ragbox - a terminal RAG (Retrieval-Augmented Generation) sandbox
//!
//! This crate provides:
//! - An ingestion pipeline that chunks text files into per-collection vector indexes
//! - A conversational orchestrator that rephrases follow-ups, retrieves and
//!   grounds Gemini answers in the retrieved chunks
//! - A daily JSON log of every question/answer cycle

pub mod catalog;
pub mod chat;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod gemini_backend;
pub mod ingest;
pub mod journal;
pub mod llm;
pub mod models;
pub mod progress;
pub mod store;
pub mod ui;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
