//! services/api/src/adapters/qa_llm.rs
//!
//! This module contains the adapter for the question-answering LLM.
//! It implements the `QuestionAnsweringService` port from the `core` crate
//! against any OpenAI-compatible chat completion endpoint (OpenAI, or a local
//! Ollama server through its `/v1` API).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use configmate_core::{
    domain::{PromptMessage, Role},
    ports::{PortError, PortResult, QuestionAnsweringService, TokenStream},
};
use futures::StreamExt;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuestionAnsweringService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQaAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQaAdapter {
    /// Creates a new `OpenAiQaAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn to_request_message(message: &PromptMessage) -> PortResult<ChatCompletionRequestMessage> {
        let built: Result<ChatCompletionRequestMessage, OpenAIError> = match message.role {
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
        };
        built.map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

//=========================================================================================
// `QuestionAnsweringService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestionAnsweringService for OpenAiQaAdapter {
    /// Opens a streaming chat completion and yields each content delta.
    async fn answer_streaming(&self, messages: &[PromptMessage]) -> PortResult<TokenStream> {
        let request_messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<PortResult<Vec<_>>>()?;
        debug!(model = %self.model, messages = request_messages.len(), "Opening chat stream");

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let tokens = stream.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => {
                    let content: String = response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    (!content.is_empty()).then_some(Ok(content))
                }
                Err(e) => Some(Err(PortError::Unexpected(e.to_string()))),
            }
        });

        Ok(Box::pin(tokens))
    }
}
