//! The OrbitChat chat pipeline.
//!
//! Every chat request flows through four stages connected by plain values:
//!
//! 1. **Classify** the latest user message against a keyword [`Vocabulary`]
//! 2. **Fetch** one summary per implicated data category (failures are dropped)
//! 3. **Augment** the conversation with a context preamble
//! 4. **Dispatch** to the chat provider, buffered or as a [`ChatStream`]
//!
//! [`ChatPipeline`] wires the stages together; each stage is also usable
//! on its own.

pub mod augmenter;
pub mod classifier;
pub mod dispatcher;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use augmenter::{AugmentedPrompt, augment};
pub use classifier::{Classification, Vocabulary};
pub use dispatcher::{ChatDispatcher, ChatStream};
pub use pipeline::ChatPipeline;
