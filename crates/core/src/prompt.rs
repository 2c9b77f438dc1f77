//! Prompt assembly.
//!
//! A prompt is built as an ordered list of named sections and only turned
//! into a single string by [`Prompt::render`], right before it is sent to
//! the model.

use crate::RetrievedChunk;
use serde::Serialize;

pub const REFUSAL_PHRASE: &str = "Sorry, I don't know.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionKind {
    System,
    Context,
    Instructions,
    History,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub kind: SectionKind,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    sections: Vec<PromptSection>,
}

/// Numbered directives that keep the model grounded in the retrieved context.
pub fn instruction_block(question: &str) -> String {
    [
        format!("1. Answer the question: {question} based on the provided context."),
        format!(
            "2. If you do not find any relevant information for the question in the provided documents, simply respond with \"{REFUSAL_PHRASE}\""
        ),
        "3. If the user asks you to summarize the context, then summarize it in a concise manner."
            .to_string(),
        "4. If the user asks you to explain something, then explain it in a simple and clear manner."
            .to_string(),
        "5. Do not include any greeting or self-introduction in your responses. Provide direct, helpful answers without unnecessary introductions."
            .to_string(),
    ]
    .join("\n\n")
}

/// Retrieved chunk texts joined by newlines, in retrieval order.
pub fn context_from_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Prompt {
    pub fn assemble(
        system_prompt: &str,
        chunks: &[RetrievedChunk],
        question: &str,
        history: &str,
    ) -> Self {
        let sections = vec![
            PromptSection {
                kind: SectionKind::System,
                body: system_prompt.trim().to_string(),
            },
            PromptSection {
                kind: SectionKind::Context,
                body: context_from_chunks(chunks),
            },
            PromptSection {
                kind: SectionKind::Instructions,
                body: instruction_block(question),
            },
            PromptSection {
                kind: SectionKind::History,
                body: history.to_string(),
            },
            PromptSection {
                kind: SectionKind::Question,
                body: question.to_string(),
            },
        ];
        Self { sections }
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&PromptSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    pub fn render(&self) -> String {
        let mut blocks: Vec<String> = self
            .sections
            .iter()
            .map(|section| match section.kind {
                SectionKind::History => format!("Conversation history:\n{}", section.body),
                SectionKind::Question => format!("Question: {}", section.body),
                SectionKind::System | SectionKind::Context | SectionKind::Instructions => {
                    section.body.clone()
                }
            })
            .collect();
        blocks.push("Answer:".to_string());
        blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chunk;

    fn hit(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                chunk_id: text.to_string(),
                text: text.to_string(),
                source_path: "/tmp/doc.txt".to_string(),
                page: None,
                chunk_index: 0,
            },
            similarity: 1.0,
        }
    }

    #[test]
    fn sections_follow_fixed_order() {
        let prompt = Prompt::assemble("You are helpful.", &[hit("ctx")], "Why?", "");
        let kinds: Vec<SectionKind> = prompt.sections().iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SectionKind::System,
                SectionKind::Context,
                SectionKind::Instructions,
                SectionKind::History,
                SectionKind::Question,
            ]
        );
    }

    #[test]
    fn context_joins_chunks_in_retrieval_order() {
        let prompt = Prompt::assemble("sys", &[hit("second best"), hit("third")], "q", "");
        assert_eq!(
            prompt.section(SectionKind::Context).map(|s| s.body.as_str()),
            Some("second best\nthird")
        );
    }

    #[test]
    fn instructions_carry_question_and_refusal_phrase() {
        let block = instruction_block("What is covered?");
        assert!(block.contains("What is covered?"));
        assert!(block.contains(REFUSAL_PHRASE));
        assert!(block.contains("summarize"));
        assert!(block.contains("explain"));
        assert!(block.contains("greeting"));
    }

    #[test]
    fn rendered_prompt_lays_out_sections() {
        let prompt = Prompt::assemble(
            "You are helpful.",
            &[hit("Deductible is 500.")],
            "What is the deductible?",
            "Human: hi\nAI: hello",
        );
        let rendered = prompt.render();

        let system_at = rendered.find("You are helpful.").unwrap_or(usize::MAX);
        let context_at = rendered.find("Deductible is 500.").unwrap_or(usize::MAX);
        let history_at = rendered
            .find("Conversation history:\nHuman: hi\nAI: hello")
            .unwrap_or(usize::MAX);
        let question_at = rendered
            .find("Question: What is the deductible?")
            .unwrap_or(usize::MAX);

        assert!(system_at < context_at);
        assert!(context_at < history_at);
        assert!(history_at < question_at);
        assert!(rendered.ends_with("Answer:"));
    }
}
