//! Request-time answering: embed the query, pull matching chunks from the
//! index, and drive a tool-capable generation exchange to completion.

use std::sync::Arc;

use thiserror::Error;

use crate::core::errors::UpstreamError;
use crate::index::VectorIndexClient;
use crate::llm::types::{ChatTurn, ModelReply, ToolCallRequest, ToolDecl};
use crate::llm::{EmbeddingClient, GenerationClient};
use crate::tooling;

use super::prompt::support_prompt;

/// Returned when the exchange terminates with no text, which happens when
/// the model replies with nothing after a tool round.
const EMPTY_REPLY_FALLBACK: &str = "Your request has been handled.";

/// Which stage of answering failed. Retrieval covers the query embedding
/// and the index lookup; Generation covers the model calls.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("retrieval failed: {0}")]
    Retrieval(UpstreamError),
    #[error("generation failed: {0}")]
    Generation(UpstreamError),
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// How many chunks to retrieve as context.
    pub top_k: usize,
}

/// One tool-capable exchange. A single tool round is allowed: after the
/// tool result goes back to the model, the next reply is terminal.
enum ToolExchange {
    AwaitingModelReply,
    ToolRequested(ToolCallRequest),
    ToolExecuted { name: String, output: String },
    Done(String),
}

pub struct AnswerPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndexClient>,
    generator: Arc<dyn GenerationClient>,
    options: AnswerOptions,
}

impl AnswerPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
        generator: Arc<dyn GenerationClient>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            options,
        }
    }

    /// Answer a question from retrieved context alone.
    pub async fn answer(&self, query: &str) -> Result<String, AnswerError> {
        self.run(query, None).await
    }

    /// Answer a question with the ticket tool offered to the model.
    pub async fn answer_with_tools(&self, query: &str) -> Result<String, AnswerError> {
        let tools = [tooling::ticket_tool_decl()];
        self.run(query, Some(&tools)).await
    }

    async fn run(&self, query: &str, tools: Option<&[ToolDecl]>) -> Result<String, AnswerError> {
        let context = self.retrieve_context(query).await?;
        let prompt = support_prompt(&context, query);
        self.run_exchange(prompt, tools).await
    }

    /// Embed the query and join the matched chunk texts, ranked order,
    /// separated by blank lines. Matches without stored text contribute an
    /// empty section rather than being dropped.
    async fn retrieve_context(&self, query: &str) -> Result<String, AnswerError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(AnswerError::Retrieval)?;
        let matches = self
            .index
            .query(&vector, self.options.top_k)
            .await
            .map_err(AnswerError::Retrieval)?;
        Ok(matches
            .iter()
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Drive the exchange until it reaches Done. Tool failures are fed back
    /// to the model as the tool's output so it can apologize or retry in
    /// prose instead of the whole request erroring out.
    async fn run_exchange(
        &self,
        prompt: String,
        tools: Option<&[ToolDecl]>,
    ) -> Result<String, AnswerError> {
        let mut turns = vec![ChatTurn::user(prompt)];
        let mut state = ToolExchange::AwaitingModelReply;

        loop {
            state = match state {
                ToolExchange::AwaitingModelReply => {
                    let reply = self.generate(&turns, tools).await?;
                    match reply.tool_call {
                        // Only an exchange that offered tools may execute
                        // one; an unsolicited call counts as a plain reply.
                        Some(call) if tools.is_some() => {
                            turns.push(ChatTurn::model_tool_call(&call));
                            ToolExchange::ToolRequested(call)
                        }
                        Some(call) => {
                            tracing::warn!("ignoring unsolicited `{}` tool call", call.name);
                            ToolExchange::Done(reply.text)
                        }
                        None => ToolExchange::Done(reply.text),
                    }
                }
                ToolExchange::ToolRequested(call) => {
                    let output = match tooling::execute_tool(&call) {
                        Ok(output) => output,
                        Err(err) => {
                            tracing::warn!("tool `{}` failed: {}", call.name, err);
                            format!("Tool `{}` failed: {}", call.name, err)
                        }
                    };
                    ToolExchange::ToolExecuted {
                        name: call.name,
                        output,
                    }
                }
                ToolExchange::ToolExecuted { name, output } => {
                    turns.push(ChatTurn::tool_result(&name, &output));
                    // Terminal reply; a second tool request here has no
                    // transition and is dropped.
                    let reply = self.generate(&turns, tools).await?;
                    ToolExchange::Done(reply.text)
                }
                ToolExchange::Done(answer) => {
                    let answer = answer.trim();
                    if answer.is_empty() {
                        return Ok(EMPTY_REPLY_FALLBACK.to_string());
                    }
                    return Ok(answer.to_string());
                }
            };
        }
    }

    async fn generate(
        &self,
        turns: &[ChatTurn],
        tools: Option<&[ToolDecl]>,
    ) -> Result<ModelReply, AnswerError> {
        self.generator
            .generate(turns, tools)
            .await
            .map_err(AnswerError::Generation)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::answer::prompt::FALLBACK_SENTENCE;
    use crate::index::{IndexStats, QueryMatch};
    use crate::llm::types::ToolCallRequest;

    use super::*;

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
            Ok(self.vector.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
            Err(UpstreamError::Timeout { service: "gemini" })
        }
    }

    struct StaticIndex {
        matches: Vec<QueryMatch>,
        queried_top_k: Mutex<Vec<usize>>,
    }

    impl StaticIndex {
        fn with_texts(texts: &[&str]) -> Self {
            let matches = texts
                .iter()
                .enumerate()
                .map(|(i, text)| QueryMatch {
                    id: format!("chunk_{}", i),
                    score: 1.0 - i as f32 * 0.1,
                    metadata: Some(json!({ "text": text })),
                })
                .collect();
            Self {
                matches,
                queried_top_k: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self::with_texts(&[])
        }
    }

    #[async_trait]
    impl VectorIndexClient for StaticIndex {
        async fn ensure_index(&self, _dimension: usize) -> Result<(), UpstreamError> {
            Ok(())
        }

        async fn upsert(&self, _records: &[crate::index::IndexRecord]) -> Result<(), UpstreamError> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<QueryMatch>, UpstreamError> {
            self.queried_top_k.lock().unwrap().push(top_k);
            Ok(self.matches.clone())
        }

        async fn stats(&self) -> Result<IndexStats, UpstreamError> {
            Ok(IndexStats::default())
        }
    }

    /// Pops scripted replies in order and records every call's turns.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<ModelReply>>,
        calls: Mutex<Vec<(Vec<ChatTurn>, bool)>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<ModelReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn text_reply(text: &str) -> ModelReply {
            ModelReply {
                text: text.to_string(),
                tool_call: None,
            }
        }

        fn tool_reply(name: &str, args: serde_json::Value) -> ModelReply {
            ModelReply {
                text: String::new(),
                tool_call: Some(ToolCallRequest {
                    name: name.to_string(),
                    args,
                }),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedGenerator {
        async fn generate(
            &self,
            turns: &[ChatTurn],
            tools: Option<&[ToolDecl]>,
        ) -> Result<ModelReply, UpstreamError> {
            self.calls
                .lock()
                .unwrap()
                .push((turns.to_vec(), tools.is_some()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(UpstreamError::Malformed {
                    service: "fake",
                    message: "no scripted reply left".to_string(),
                })
        }
    }

    fn pipeline(
        index: StaticIndex,
        generator: ScriptedGenerator,
        top_k: usize,
    ) -> (AnswerPipeline, Arc<StaticIndex>, Arc<ScriptedGenerator>) {
        let index = Arc::new(index);
        let generator = Arc::new(generator);
        let pipeline = AnswerPipeline::new(
            Arc::new(FixedEmbedder {
                vector: vec![0.1, 0.2],
            }),
            index.clone(),
            generator.clone(),
            AnswerOptions { top_k },
        );
        (pipeline, index, generator)
    }

    fn first_turn_text(turns: &[ChatTurn]) -> String {
        turns[0].parts[0]["text"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn empty_context_still_reaches_the_model() {
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::text_reply(
            FALLBACK_SENTENCE,
        )]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer("What is the meaning of life?").await.unwrap();

        assert_eq!(answer, FALLBACK_SENTENCE);
        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let prompt = first_turn_text(&calls[0].0);
        assert!(prompt.contains("What is the meaning of life?"));
        assert!(prompt.contains(FALLBACK_SENTENCE));
    }

    #[tokio::test]
    async fn context_joins_match_texts_in_rank_order() {
        let generator =
            ScriptedGenerator::new(vec![ScriptedGenerator::text_reply("No annual fee.")]);
        let index = StaticIndex::with_texts(&["Aven has no annual fee.", "Cashback is 2%."]);
        let (pipeline, _, generator) = pipeline(index, generator, 5);

        pipeline.answer("Fees?").await.unwrap();

        let calls = generator.calls.lock().unwrap();
        let prompt = first_turn_text(&calls[0].0);
        assert!(prompt.contains("Aven has no annual fee.\n\nCashback is 2%."));
    }

    #[tokio::test]
    async fn requested_top_k_is_forwarded_to_the_index() {
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::text_reply("ok")]);
        let (pipeline, index, _) = pipeline(StaticIndex::empty(), generator, 3);

        pipeline.answer("Fees?").await.unwrap();

        assert_eq!(*index.queried_top_k.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn tools_are_only_offered_on_the_tool_path() {
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::text_reply("a"),
            ScriptedGenerator::text_reply("b"),
        ]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        pipeline.answer("plain").await.unwrap();
        pipeline.answer_with_tools("with tools").await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert!(!calls[0].1);
        assert!(calls[1].1);
    }

    #[tokio::test]
    async fn tool_round_feeds_the_result_back_and_returns_the_followup() {
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::tool_reply(
                tooling::TICKET_TOOL_NAME,
                json!({ "email": "sam@example.com", "issue_description": "card declined" }),
            ),
            ScriptedGenerator::text_reply("Your ticket is filed, Sam."),
        ]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer_with_tools("My card was declined").await.unwrap();

        assert_eq!(answer, "Your ticket is filed, Sam.");
        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let second_turns = &calls[1].0;
        assert_eq!(second_turns.len(), 3);
        assert_eq!(second_turns[0].role, "user");
        assert_eq!(second_turns[1].role, "model");
        assert_eq!(second_turns[2].role, "function");
        let tool_output = second_turns[2].parts[0]["functionResponse"]["response"]["result"]
            .as_str()
            .unwrap_or_default();
        assert!(tool_output.contains("sam@example.com"));
    }

    #[tokio::test]
    async fn tool_failure_is_reported_to_the_model_not_the_caller() {
        let generator = ScriptedGenerator::new(vec![
            // Missing email makes the ticket tool reject the call.
            ScriptedGenerator::tool_reply(
                tooling::TICKET_TOOL_NAME,
                json!({ "issue_description": "card declined" }),
            ),
            ScriptedGenerator::text_reply("Could you share your email address?"),
        ]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer_with_tools("My card was declined").await.unwrap();

        assert_eq!(answer, "Could you share your email address?");
        let calls = generator.calls.lock().unwrap();
        let tool_output = calls[1].0[2].parts[0]["functionResponse"]["response"]["result"]
            .as_str()
            .unwrap_or_default();
        assert!(tool_output.contains("failed"));
    }

    #[tokio::test]
    async fn empty_followup_reply_gets_the_handled_fallback() {
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::tool_reply(
                tooling::TICKET_TOOL_NAME,
                json!({ "email": "sam@example.com", "issue_description": "x" }),
            ),
            ScriptedGenerator::text_reply(""),
        ]);
        let (pipeline, _, _) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer_with_tools("help").await.unwrap();

        assert_eq!(answer, "Your request has been handled.");
    }

    #[tokio::test]
    async fn unsolicited_tool_call_on_the_plain_path_is_not_executed() {
        let generator = ScriptedGenerator::new(vec![ModelReply {
            text: "I can file that for you if you share your email.".to_string(),
            tool_call: Some(ToolCallRequest {
                name: tooling::TICKET_TOOL_NAME.to_string(),
                args: json!({ "email": "sam@example.com", "issue_description": "x" }),
            }),
        }]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer("My card was declined").await.unwrap();

        assert_eq!(answer, "I can file that for you if you share your email.");
        // One generate call, no tool round, no ticket confirmation.
        assert_eq!(generator.calls.lock().unwrap().len(), 1);
        assert!(!answer.contains("support ticket #"));
    }

    #[tokio::test]
    async fn second_tool_request_after_a_round_is_dropped() {
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::tool_reply(
                tooling::TICKET_TOOL_NAME,
                json!({ "email": "sam@example.com", "issue_description": "x" }),
            ),
            // The follow-up tries to call the tool again; only its text counts.
            ModelReply {
                text: "All set.".to_string(),
                tool_call: Some(ToolCallRequest {
                    name: tooling::TICKET_TOOL_NAME.to_string(),
                    args: json!({}),
                }),
            },
        ]);
        let (pipeline, _, generator) = pipeline(StaticIndex::empty(), generator, 5);

        let answer = pipeline.answer_with_tools("help").await.unwrap();

        assert_eq!(answer, "All set.");
        assert_eq!(generator.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn embedding_failure_is_a_retrieval_error() {
        let generator = ScriptedGenerator::new(vec![]);
        let pipeline = AnswerPipeline::new(
            Arc::new(FailingEmbedder),
            Arc::new(StaticIndex::empty()),
            Arc::new(generator),
            AnswerOptions { top_k: 5 },
        );

        let err = pipeline.answer("Fees?").await.unwrap_err();

        assert!(matches!(err, AnswerError::Retrieval(_)));
    }

    #[tokio::test]
    async fn generation_failure_is_a_generation_error() {
        // No scripted replies, so the first generate call fails.
        let generator = ScriptedGenerator::new(vec![]);
        let (pipeline, _, _) = pipeline(StaticIndex::empty(), generator, 5);

        let err = pipeline.answer("Fees?").await.unwrap_err();

        assert!(matches!(err, AnswerError::Generation(_)));
    }
}
