//! Prompt construction for per-post extraction

use postlens_domain::schema_contract;
use postlens_llm::{ChatMessage, GenerationRequest, MessagePart};
use std::path::PathBuf;

/// System message sent with every request
pub const SYSTEM_INSTRUCTION: &str = "Return ONLY valid JSON. Do not include any extra text.";

/// Builds the instruction block for one post
pub struct PromptBuilder {
    post_id: String,
    text: String,
}

impl PromptBuilder {
    /// Create a builder for a post
    pub fn new(post_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            text: text.into(),
        }
    }

    /// Build the text part of the user message
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str(&format!("POST_ID: {}\n", self.post_id));
        prompt.push_str(&format!("TEXT: {}\n\n", self.text));

        prompt.push_str("Output JSON schema (for reference, do not repeat it):\n");
        prompt.push_str(&schema_contract().to_string());
        prompt.push('\n');

        prompt
    }

    /// Full request: system message, then images, the optional video and the instructions
    pub fn request(&self, images: &[PathBuf], video: Option<&PathBuf>) -> GenerationRequest {
        let mut parts: Vec<MessagePart> = images.iter().cloned().map(MessagePart::Image).collect();
        if let Some(video) = video {
            parts.push(MessagePart::Video(video.clone()));
        }
        parts.push(MessagePart::Text(self.build()));

        GenerationRequest::new(
            vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(parts)],
            Some(schema_contract().clone()),
        )
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"You are an information extractor. Read a single social-media post (text plus any attached images or video) and return one strict JSON object. Do not output reasoning or any text besides the JSON.

Fields:
A) style: how the author writes. `tone` is speaking register, not sentiment; pick 1-3 values from the allowed list. `emotion` is one of the eight basic emotions, or "none" when no emotion is evident.
B) stance: the author's position on concrete targets, split in two layers. `targets` holds target + position + evidence; `reasoning` holds the opinion and the intent behind it.
C) topic: why the author posted. Summarise the trigger in one sentence.
D) knowledge_facts: durable entities and long-lived facts only (people, organisations, brands, objects, lasting preferences, values). Never one-off events, short-term milestones or dates.
E) safety_rewrite: sensitive terms or phrasings that could be swapped for safer wording when speaking in this voice; empty if none.

Rules:
1) Extract only what the text or the images/video directly support. Do not guess.
2) When a field is absent or unclear, leave it as an empty list / empty string with confidence 0.
3) Evidence must be the smallest literal span of the text, or a minimal visual cue.
4) The reason for posting belongs in topic, never in knowledge_facts.
5) knowledge_facts keeps only facts that stay true and reusable over time."#;

#[cfg(test)]
mod tests {
    use super::*;
    use postlens_llm::Role;

    #[test]
    fn test_prompt_includes_post() {
        let prompt = PromptBuilder::new("P1", "今天去了海边").build();
        assert!(prompt.contains("POST_ID: P1"));
        assert!(prompt.contains("TEXT: 今天去了海边"));
    }

    #[test]
    fn test_prompt_embeds_schema_and_policy() {
        let prompt = PromptBuilder::new("P1", "x").build();
        assert!(prompt.contains("\"knowledge_facts\""));
        assert!(prompt.contains("\"additionalProperties\":false"));
        assert!(prompt.contains("Do not guess"));
        assert!(prompt.contains("belongs in topic"));
    }

    #[test]
    fn test_request_part_order() {
        let images = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        let video = PathBuf::from("v.mp4");
        let request = PromptBuilder::new("P1", "x").request(&images, Some(&video));

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(
            request.messages[0].parts,
            vec![MessagePart::Text(SYSTEM_INSTRUCTION.to_string())]
        );

        let parts = &request.messages[1].parts;
        assert_eq!(parts[0], MessagePart::Image("a.jpg".into()));
        assert_eq!(parts[1], MessagePart::Image("b.jpg".into()));
        assert_eq!(parts[2], MessagePart::Video("v.mp4".into()));
        assert!(matches!(parts[3], MessagePart::Text(_)));
        assert!(request.schema.is_some());
    }

    #[test]
    fn test_request_without_media() {
        let request = PromptBuilder::new("P1", "x").request(&[], None);
        assert_eq!(request.messages[1].parts.len(), 1);
        assert!(!request.messages[1].has_video());
    }
}
