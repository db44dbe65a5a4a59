//! Chat-completion provider implementations for OrbitChat.
//!
//! All providers implement the `orbitchat_core::Provider` trait.
//! [`build_from_config`] picks the right one for the loaded configuration.

pub mod factory;
pub mod openai_compat;
pub mod unconfigured;

pub use factory::build_from_config;
pub use openai_compat::OpenAiCompatProvider;
pub use unconfigured::UnconfiguredProvider;
