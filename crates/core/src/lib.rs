//! # OrbitChat Core
//!
//! Domain types, traits, and error definitions for the OrbitChat chatbot.
//! This crate has **no framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators (the hosted chat-completion API and the
//! space-data REST endpoints) are each defined as a trait here. Implementations
//! live in their respective crates, so the chat pipeline can be tested with
//! scripted stand-ins for both.

pub mod data;
pub mod error;
pub mod fetcher;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use data::{DataCategory, ExternalDataSummary, FetchOutcome, FetchQuery, GeoPoint};
pub use error::{Error, FetchError, ProviderError, Result};
pub use fetcher::DataFetcher;
pub use message::{Conversation, Message, Role};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
