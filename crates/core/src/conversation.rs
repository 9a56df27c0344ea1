//! The conversation handle — message history plus a provider binding.
//!
//! One conversation is created per process invocation. A reboot persists
//! its history to disk and the restarted process installs that history on
//! a fresh conversation. Context-prune forks get a sibling conversation
//! with the same provider/model/routing and an empty history.
//!
//! History lives behind a `std::sync::Mutex`: every access is a short
//! synchronous critical section, never held across an await.

use std::sync::{Arc, Mutex};

use crate::error::ProviderError;
use crate::message::ChatMessage;
use crate::provider::{ChatRequest, ChunkReceiver, Provider, StreamChunk, Usage};

/// Default sampling temperature for agent turns.
const DEFAULT_TEMPERATURE: f32 = 0.7;

struct ConversationState {
    system: String,
    routing: Option<String>,
    history: Vec<ChatMessage>,
}

/// An owned conversation: mutable message history, a model identifier, an
/// optional routing hint, and a system prompt.
pub struct Conversation {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    state: Mutex<ConversationState>,
}

impl Conversation {
    /// Create a new empty conversation bound to a provider and model.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            state: Mutex::new(ConversationState {
                system: String::new(),
                routing: None,
                history: Vec::new(),
            }),
        }
    }

    /// The model identifier this conversation sends to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Snapshot of the message history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().history.clone()
    }

    /// Replace the message history wholesale (reboot restore, prune apply).
    pub fn set_history(&self, history: Vec<ChatMessage>) {
        self.state.lock().unwrap().history = history;
    }

    /// Install a new system prompt.
    pub fn set_system(&self, system: impl Into<String>) {
        self.state.lock().unwrap().system = system.into();
    }

    /// The current system prompt.
    pub fn system(&self) -> String {
        self.state.lock().unwrap().system.clone()
    }

    /// Set or clear the provider-routing hint.
    pub fn set_provider_routing(&self, routing: Option<String>) {
        self.state.lock().unwrap().routing = routing;
    }

    /// Append an assistant message to the history.
    ///
    /// The Think step uses this when it abandons a stream before the
    /// end-of-stream hook could run (early tool break, abort).
    pub fn push_assistant(&self, content: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .history
            .push(ChatMessage::assistant(content));
    }

    /// Fork: a new conversation with the same provider, model, and routing,
    /// the given system prompt, and an empty history.
    pub fn fork(&self, system: impl Into<String>) -> Conversation {
        let routing = self.state.lock().unwrap().routing.clone();
        let forked = Conversation::new(Arc::clone(&self.provider), self.model.clone());
        forked.set_system(system);
        forked.set_provider_routing(routing);
        forked
    }

    /// Build the provider request from the current state. The `input` has
    /// already been pushed onto the history.
    fn request(&self) -> ChatRequest {
        let state = self.state.lock().unwrap();
        let mut messages = Vec::with_capacity(state.history.len() + 1);
        if !state.system.is_empty() {
            messages.push(ChatMessage::system(state.system.clone()));
        }
        messages.extend(state.history.iter().cloned());
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            routing: state.routing.clone(),
        }
    }

    /// Send `input` as a user turn and wait for the complete reply.
    ///
    /// The reply is appended to history before returning.
    pub async fn send(self: &Arc<Self>, input: &str) -> Result<String, ProviderError> {
        self.state
            .lock()
            .unwrap()
            .history
            .push(ChatMessage::user(input));
        let reply = self.provider.complete(self.request()).await?;
        self.push_assistant(reply.clone());
        Ok(reply)
    }

    /// Send `input` as a user turn and stream the reply.
    ///
    /// The returned [`ChatStream`] appends the accumulated assistant
    /// message to history when it observes the terminal chunk. A caller
    /// that drops the stream before then must append manually.
    pub async fn stream(self: &Arc<Self>, input: &str) -> Result<ChatStream, ProviderError> {
        self.state
            .lock()
            .unwrap()
            .history
            .push(ChatMessage::user(input));
        let rx = self.provider.stream(self.request()).await?;
        Ok(ChatStream {
            rx,
            conversation: Arc::clone(self),
            collected: String::new(),
            usage: None,
            finished: false,
        })
    }

    /// Number of messages currently in the history.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live reply stream from the conversation's provider.
///
/// Iterated manually (not via `Stream` combinators) so the Think step can
/// abandon it mid-flight: dropping a `ChatStream` closes the chunk channel
/// and the producer task exits on its next send, with nothing awaited.
pub struct ChatStream {
    rx: ChunkReceiver,
    conversation: Arc<Conversation>,
    collected: String,
    usage: Option<Usage>,
    finished: bool,
}

impl ChatStream {
    /// Next chunk, or `None` at end of stream.
    ///
    /// On the terminal chunk the accumulated assistant text is pushed onto
    /// the conversation history (the end-of-stream hook).
    pub async fn next(&mut self) -> Option<Result<StreamChunk, ProviderError>> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => {
                if let Some(text) = &chunk.content {
                    self.collected.push_str(text);
                }
                if let Some(usage) = chunk.usage {
                    self.usage = Some(usage);
                }
                if chunk.done {
                    self.finish();
                }
                Some(Ok(chunk))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                if !self.finished {
                    self.finish();
                }
                None
            }
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.conversation.push_assistant(self.collected.clone());
            self.finished = true;
        }
    }

    /// Whether the end-of-stream hook has run.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Usage reported by the provider, if any arrived yet.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Abandon the stream without running the end-of-stream hook.
    ///
    /// Fire-and-forget: this is just a drop. Closing the underlying HTTP
    /// connection is best-effort and never awaited.
    pub fn abandon(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    /// Streams a fixed reply as several small chunks.
    struct ChunkedProvider {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl Provider for ChunkedProvider {
        fn name(&self) -> &str {
            "chunked"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<String, ProviderError> {
            Ok(self.chunks.concat())
        }

        async fn stream(&self, _request: ChatRequest) -> Result<ChunkReceiver, ProviderError> {
            let (tx, rx) = mpsc::channel(8);
            let chunks = self.chunks.clone();
            tokio::spawn(async move {
                for c in chunks {
                    if tx.send(Ok(StreamChunk::text(c))).await.is_err() {
                        return;
                    }
                }
                let _ = tx.send(Ok(StreamChunk::finished(None))).await;
            });
            Ok(rx)
        }
    }

    fn conversation(chunks: Vec<&'static str>) -> Arc<Conversation> {
        Arc::new(Conversation::new(
            Arc::new(ChunkedProvider { chunks }),
            "test-model",
        ))
    }

    #[tokio::test]
    async fn stream_hook_appends_assistant_message() {
        let conv = conversation(vec!["Hello, ", "world!"]);
        let mut stream = conv.stream("hi").await.unwrap();
        while let Some(chunk) = stream.next().await {
            chunk.unwrap();
        }
        assert!(stream.finished());

        let history = conv.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("hi"));
        assert_eq!(history[1], ChatMessage::assistant("Hello, world!"));
    }

    #[tokio::test]
    async fn abandoned_stream_does_not_touch_history() {
        let conv = conversation(vec!["partial", " reply"]);
        let mut stream = conv.stream("hi").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("partial"));
        stream.abandon();

        // Only the user turn made it in; the caller appends the partial
        // text itself when it abandons.
        let history = conv.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn send_appends_both_turns() {
        let conv = conversation(vec!["ok"]);
        let reply = conv.send("do it").await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn fork_copies_routing_not_history() {
        let conv = conversation(vec![]);
        conv.set_provider_routing(Some("groq".into()));
        conv.set_history(vec![ChatMessage::user("old")]);

        let fork = conv.fork("you are a pruner");
        assert!(fork.is_empty());
        assert_eq!(fork.system(), "you are a pruner");
        assert_eq!(fork.state.lock().unwrap().routing.as_deref(), Some("groq"));
    }

    #[test]
    fn request_puts_system_first() {
        let conv = conversation(vec![]);
        conv.set_system("be terse");
        conv.set_history(vec![ChatMessage::user("hello")]);
        let req = conv.request();
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[0].content, "be terse");
        assert_eq!(req.messages[1].content, "hello");
    }
}
