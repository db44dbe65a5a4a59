//! Prompt augmenter: renders fetched summaries into a context preamble.
//!
//! The caller's conversation is never touched; the augmented message list is
//! a fresh copy that lives only for one dispatch.

use orbitchat_core::data::ExternalDataSummary;
use orbitchat_core::message::{Conversation, Message};

const HEADER: &str = "REAL NASA DATA FETCHED";
const INSTRUCTION: &str = "Use this real NASA data to give accurate, data-driven answers. \
Include specific details from the data above where they are relevant to the question.";

/// The message list actually sent upstream, plus the summaries rendered into it.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedPrompt {
    pub messages: Vec<Message>,
    pub summaries: Vec<ExternalDataSummary>,
}

impl AugmentedPrompt {
    /// The conversation as-is, with no context preamble.
    pub fn passthrough(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages.clone(),
            summaries: Vec::new(),
        }
    }

    pub fn is_augmented(&self) -> bool {
        !self.summaries.is_empty()
    }
}

/// Prepend a system message carrying `summaries` to a copy of `conversation`.
///
/// With no summaries this is a no-op: the copy equals the input.
pub fn augment(
    conversation: &Conversation,
    matched_terms: &[String],
    summaries: Vec<ExternalDataSummary>,
) -> AugmentedPrompt {
    if summaries.is_empty() {
        return AugmentedPrompt::passthrough(conversation);
    }

    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(Message::system(render_context(matched_terms, &summaries)));
    messages.extend(conversation.messages.iter().cloned());

    AugmentedPrompt {
        messages,
        summaries,
    }
}

/// Render the preamble text.
pub fn render_context(matched_terms: &[String], summaries: &[ExternalDataSummary]) -> String {
    let mut out = String::from(HEADER);
    if !matched_terms.is_empty() {
        out.push_str("\nSpace keywords detected: ");
        out.push_str(&matched_terms.join(", "));
    }

    for summary in summaries {
        out.push_str("\n\n");
        out.push_str(summary.category.heading());
        out.push_str(&format!(
            " (fetched {}):\n",
            summary.fetched_at.format("%Y-%m-%d %H:%M UTC")
        ));
        out.push_str(summary.text.trim_end());
    }

    out.push_str("\n\n");
    out.push_str(INSTRUCTION);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitchat_core::data::DataCategory;
    use orbitchat_core::message::Role;

    fn conversation() -> Conversation {
        Conversation::from(vec![
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("What's up on Mars?"),
        ])
    }

    #[test]
    fn no_summaries_is_a_noop() {
        let input = conversation();
        let prompt = augment(&input, &["mars".into()], vec![]);
        assert!(!prompt.is_augmented());
        assert_eq!(prompt.messages, input.messages);
    }

    #[test]
    fn preamble_is_prepended_as_system_message() {
        let input = conversation();
        let before = input.clone();
        let summary = ExternalDataSummary::new(DataCategory::MarsWeather, "Sol 675: -62.3 °C");

        let prompt = augment(&input, &["mars".into()], vec![summary]);

        assert_eq!(input, before);
        assert_eq!(prompt.messages.len(), input.len() + 1);
        assert_eq!(prompt.messages[0].role, Role::System);
        assert_eq!(&prompt.messages[1..], input.messages.as_slice());

        let preamble = &prompt.messages[0].content;
        assert!(preamble.starts_with(HEADER));
        assert!(preamble.contains("Space keywords detected: mars"));
        assert!(preamble.contains("MARS WEATHER"));
        assert!(preamble.contains("Sol 675: -62.3 °C"));
        assert!(preamble.ends_with(INSTRUCTION));
    }

    #[test]
    fn sections_follow_summary_order() {
        let summaries = vec![
            ExternalDataSummary::new(DataCategory::NearEarthObjects, "Total objects: 9"),
            ExternalDataSummary::new(DataCategory::MarsWeather, "Sols available: 7"),
        ];
        let text = render_context(&[], &summaries);
        assert!(!text.contains("keywords detected"));
        let neo = text.find(DataCategory::NearEarthObjects.heading()).unwrap();
        let mars = text.find(DataCategory::MarsWeather.heading()).unwrap();
        assert!(neo < mars);
    }
}
