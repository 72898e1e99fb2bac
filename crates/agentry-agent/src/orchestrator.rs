//! Agent orchestrator — drives one conversation turn.
//!
//! A turn is:
//! 1. Append the user message to memory
//! 2. Build a request from the memory window and the tool definitions
//! 3. Serve it from the response cache, or call the provider and cache the answer
//! 4. If the model asked for tools: append its call message, run each tool in
//!    order, append every result, go back to 2
//! 5. Otherwise append the assistant message and return its text
//!
//! Provider failures end the turn with a synthetic assistant message. Tool
//! failures become error-content tool results the model can react to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use agentry_core::config::Config;
use agentry_core::conversation::{ConversationStore, InMemoryConversationStore, JsonlConversationStore};
use agentry_core::error::MemoryError;
use agentry_core::types::{ChatRequest, ConversationSummary, LlmResponse, Message};
use agentry_core::utils::expand_home;
use agentry_providers::{LlmProvider, ProviderError};

use crate::cache::{fingerprint, CacheError, ResponseCache};
use crate::context::resolve_system_prompt;
use crate::memory::MemoryManager;
use crate::tools::{builtin_tools, ToolError, ToolRegistry};

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Errors that end a turn or prevent the agent from starting.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The model kept requesting tools past the per-turn cap.
    #[error("turn did not finish within {limit} model calls")]
    IterationLimitExceeded { limit: u32 },

    #[error("failed to open response cache: {0}")]
    Cache(#[from] CacheError),

    #[error("failed to register tool: {0}")]
    Tool(#[from] ToolError),
}

// ─────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────

/// Per-agent request settings.
#[derive(Clone, Debug)]
pub struct AgentOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_iterations: u32,
    pub system_prompt: String,
}

impl AgentOptions {
    /// Settings for `provider` taken from its section of the configuration.
    pub fn from_config(config: &Config, provider: &dyn LlmProvider) -> Self {
        let provider_config = config
            .providers
            .get_by_name(provider.kind().tag())
            .cloned()
            .unwrap_or_default();

        Self {
            model: provider_config.model_or(provider.default_model()).to_string(),
            temperature: provider_config.temperature,
            max_tokens: provider_config.max_tokens,
            max_iterations: config.agent.max_iterations,
            system_prompt: resolve_system_prompt(
                config.agent.system_prompt.as_deref(),
                &config.agent.name,
                config.agent.description.as_deref(),
            ),
        }
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Owns the provider, tools, memory and cache and runs turns against them.
///
/// Independent conversations may run turns concurrently. Turns on the same
/// conversation are serialized by a per-conversation lock.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryManager>,
    cache: Option<Arc<ResponseCache>>,
    options: AgentOptions,
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryManager>,
        cache: Option<Arc<ResponseCache>>,
        options: AgentOptions,
    ) -> Self {
        info!(
            provider = provider.display_name(),
            model = %options.model,
            tools = tools.len(),
            max_iterations = options.max_iterations,
            cache = cache.is_some(),
            "agent initialized"
        );

        Self {
            provider,
            tools,
            memory,
            cache,
            options,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Build an agent with the built-in tools and the stores named in `config`.
    pub fn from_config(config: &Config, provider: Arc<dyn LlmProvider>) -> Result<Self, AgentError> {
        let mut tools = ToolRegistry::new();
        for tool in builtin_tools() {
            tools.register(tool)?;
        }

        let store: Arc<dyn ConversationStore> = if config.memory.long_term_enabled {
            Arc::new(JsonlConversationStore::new(Some(expand_home(
                &config.memory.directory,
            )))?)
        } else {
            Arc::new(InMemoryConversationStore::new())
        };
        let memory = MemoryManager::new(config.memory.short_term_capacity, store);

        let cache = if config.cache.enabled {
            let cache = ResponseCache::new(
                expand_home(&config.cache.directory),
                config.cache.expiry_days,
            )?;
            Some(Arc::new(cache))
        } else {
            None
        };

        let options = AgentOptions::from_config(config, provider.as_ref());
        Ok(Self::new(
            provider,
            Arc::new(tools),
            Arc::new(memory),
            cache,
            options,
        ))
    }

    // ────────────── Accessors ──────────────

    pub fn model(&self) -> &str {
        &self.options.model
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    pub fn system_prompt(&self) -> &str {
        &self.options.system_prompt
    }

    pub fn max_iterations(&self) -> u32 {
        self.options.max_iterations
    }

    // ────────────── Conversations ──────────────

    /// Start a conversation seeded with the system prompt. Returns its id.
    pub fn new_conversation(&self) -> Result<String, AgentError> {
        let id = self.memory.new_conversation()?;
        self.memory
            .append(&id, Message::system(&self.options.system_prompt))?;
        Ok(id)
    }

    /// Make a stored conversation active again. Returns its context window.
    pub fn load_conversation(&self, conversation_id: &str) -> Result<Vec<Message>, AgentError> {
        Ok(self.memory.load_conversation(conversation_id)?)
    }

    /// Forget the short-term window of a conversation. The log is kept.
    pub fn clear_memory(&self, conversation_id: &str) {
        self.memory.clear_short_term(conversation_id);
        info!(conversation = conversation_id, "cleared short-term memory");
    }

    /// Drop the in-process state of a conversation. The log is kept and a
    /// later turn picks it up again from the store.
    pub fn close_conversation(&self, conversation_id: &str) {
        self.memory.unload(conversation_id);
        let mut locks = self.turn_locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(conversation_id);
        }
    }

    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>, AgentError> {
        Ok(self.memory.list_conversations()?)
    }

    pub fn delete_conversation(&self, conversation_id: &str) -> Result<bool, AgentError> {
        self.turn_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(conversation_id);
        Ok(self.memory.delete_conversation(conversation_id)?)
    }

    /// Full persisted log of a conversation.
    pub fn history(&self, conversation_id: &str) -> Result<Vec<Message>, AgentError> {
        Ok(self.memory.history(conversation_id)?)
    }

    // ────────────── Turns ──────────────

    /// Run one turn with the configured iteration cap.
    pub async fn process(&self, conversation_id: &str, input: &str) -> Result<String, AgentError> {
        self.run_turn(conversation_id, input, self.options.max_iterations)
            .await
    }

    /// Run one turn, allowing at most `max_iterations` model calls.
    ///
    /// Messages appended before the cap is hit stay in memory.
    pub async fn run_turn(
        &self,
        conversation_id: &str,
        input: &str,
        max_iterations: u32,
    ) -> Result<String, AgentError> {
        if max_iterations == 0 {
            return Err(AgentError::IterationLimitExceeded { limit: 0 });
        }

        let lock = self.turn_lock(conversation_id);
        let result = {
            let _turn = lock.lock().await;
            self.run_locked_turn(conversation_id, input, max_iterations)
                .await
        };
        self.release_turn_lock(conversation_id, lock);
        result
    }

    async fn run_locked_turn(
        &self,
        conversation_id: &str,
        input: &str,
        max_iterations: u32,
    ) -> Result<String, AgentError> {
        self.ensure_conversation(conversation_id)?;
        self.memory.append(conversation_id, Message::user(input))?;

        for iteration in 1..=max_iterations {
            debug!(conversation = conversation_id, iteration, "LLM call");

            let request = self.build_request(conversation_id);
            let response = match self.complete(&request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(conversation = conversation_id, error = %e, "provider call failed");
                    let reply = format!("Sorry, I could not get a response from the model: {e}");
                    self.memory
                        .append(conversation_id, Message::assistant(&reply))?;
                    return Ok(reply);
                }
            };

            if !response.has_tool_calls() {
                let reply = response.content.clone().unwrap_or_default();
                self.memory.append(conversation_id, response.into_message())?;
                debug!(conversation = conversation_id, iteration, "turn complete");
                return Ok(reply);
            }

            let calls = response.tool_calls.clone();
            self.memory.append(conversation_id, response.into_message())?;

            for call in &calls {
                info!(tool = %call.name, iteration, "executing tool call");
                let output = match self.tools.execute_call(call).await {
                    Ok(output) => output,
                    Err(e) => format!("Error: {e}"),
                };
                self.memory
                    .append(conversation_id, Message::tool_result(&call.id, output))?;
            }
        }

        warn!(
            conversation = conversation_id,
            limit = max_iterations,
            "iteration limit reached"
        );
        Err(AgentError::IterationLimitExceeded {
            limit: max_iterations,
        })
    }

    /// Make sure the conversation is active and carries a system prompt.
    fn ensure_conversation(&self, conversation_id: &str) -> Result<(), MemoryError> {
        if !self.memory.get_messages(conversation_id).is_empty() {
            return Ok(());
        }

        let has_system = match self.memory.load_conversation(conversation_id) {
            Ok(window) => window.first().is_some_and(Message::is_system),
            Err(MemoryError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !has_system {
            self.memory
                .append(conversation_id, Message::system(&self.options.system_prompt))?;
        }
        Ok(())
    }

    fn build_request(&self, conversation_id: &str) -> ChatRequest {
        ChatRequest {
            model: self.options.model.clone(),
            messages: self.memory.get_messages(conversation_id),
            tools: self.tools.definitions(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }

    /// Cache lookup, then the provider on a miss. Only successes are cached.
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, ProviderError> {
        let key = self.cache.as_ref().and_then(|cache| match fingerprint(request) {
            Ok(fp) => Some((cache, fp)),
            Err(e) => {
                warn!(error = %e, "could not fingerprint request, skipping cache");
                None
            }
        });

        if let Some((cache, fp)) = &key {
            if let Some(hit) = cache.get(fp) {
                debug!(fingerprint = %fp, "serving response from cache");
                return Ok(hit);
            }
        }

        let response = self.provider.chat(request).await?;

        if let Some((cache, fp)) = &key {
            if let Err(e) = cache.put(fp, &response) {
                warn!(error = %e, "failed to cache response");
            }
        }
        Ok(response)
    }

    fn turn_lock(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.turn_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(conversation_id.to_string()).or_default())
    }

    /// Forget the lock once no other turn holds or waits on it.
    fn release_turn_lock(&self, conversation_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.turn_locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(conversation_id);
        }
    }

    #[cfg(test)]
    fn turn_lock_count(&self) -> usize {
        self.turn_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use agentry_core::types::{ToolCall, ToolDefinition};
    use agentry_providers::ProviderKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    const SYSTEM: &str = "You are a test agent.";

    /// Provider that replays scripted responses and records every request.
    struct MockProvider {
        script: Mutex<VecDeque<Result<LlmResponse, ProviderError>>>,
        /// Returned once the script runs out. `None` means an error.
        fallback: Option<LlmResponse>,
        /// Answer every request with the last user message instead.
        echo: bool,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockProvider {
        fn scripted(script: Vec<Result<LlmResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: None,
                echo: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replies(responses: Vec<LlmResponse>) -> Self {
            Self::scripted(responses.into_iter().map(Ok).collect())
        }

        fn forever(response: LlmResponse) -> Self {
            Self {
                fallback: Some(response),
                ..Self::scripted(vec![])
            }
        }

        fn echo() -> Self {
            Self {
                echo: true,
                ..Self::scripted(vec![])
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> ChatRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());

            if self.echo {
                tokio::task::yield_now().await;
                let last_user = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| matches!(m, Message::User { .. }))
                    .and_then(Message::text)
                    .unwrap_or_default();
                return Ok(LlmResponse::text(format!("echo: {last_user}")));
            }

            let next = self.script.lock().unwrap().pop_front();
            match (next, &self.fallback) {
                (Some(result), _) => result,
                (None, Some(fallback)) => Ok(fallback.clone()),
                (None, None) => Err(ProviderError::EmptyResponse("Mock".into())),
            }
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }

        fn display_name(&self) -> &str {
            "Mock"
        }

        fn tool_specs(&self, tools: &[ToolDefinition]) -> Vec<Value> {
            tools.iter().map(|t| json!({"name": t.name})).collect()
        }
    }

    fn options() -> AgentOptions {
        AgentOptions {
            model: "mock-model".into(),
            temperature: 0.7,
            max_tokens: 2000,
            max_iterations: 10,
            system_prompt: SYSTEM.into(),
        }
    }

    fn make_agent(provider: Arc<MockProvider>, cache: Option<Arc<ResponseCache>>) -> Agent {
        let mut tools = ToolRegistry::new();
        for tool in builtin_tools() {
            tools.register(tool).unwrap();
        }
        let memory = MemoryManager::new(10, Arc::new(InMemoryConversationStore::new()));
        Agent::new(provider, Arc::new(tools), Arc::new(memory), cache, options())
    }

    fn calc_call(id: &str, expression: &str) -> ToolCall {
        ToolCall::new(id, "calculator", json!({ "expression": expression }))
    }

    #[tokio::test]
    async fn test_simple_response() {
        let provider = Arc::new(MockProvider::replies(vec![LlmResponse::text("Hello!")]));
        let agent = make_agent(provider.clone(), None);
        let id = agent.new_conversation().unwrap();

        assert_eq!(agent.process(&id, "Hi").await.unwrap(), "Hello!");
        assert_eq!(
            agent.history(&id).unwrap(),
            vec![
                Message::system(SYSTEM),
                Message::user("Hi"),
                Message::assistant("Hello!"),
            ]
        );

        let request = provider.request(0);
        assert_eq!(request.model, "mock-model");
        assert_eq!(request.tools.len(), 2);
        assert_eq!(request.messages[0], Message::system(SYSTEM));
    }

    #[tokio::test]
    async fn test_calculator_round_trip() {
        let call = calc_call("call_1", "2+2");
        let provider = Arc::new(MockProvider::replies(vec![
            LlmResponse::tool_calls(vec![call.clone()]),
            LlmResponse::text("2 + 2 = 4"),
        ]));
        let agent = make_agent(provider.clone(), None);
        let id = agent.new_conversation().unwrap();

        let reply = agent.process(&id, "compute 2+2").await.unwrap();
        assert_eq!(reply, "2 + 2 = 4");
        assert_eq!(
            agent.history(&id).unwrap(),
            vec![
                Message::system(SYSTEM),
                Message::user("compute 2+2"),
                Message::assistant_tool_calls(None, vec![call]),
                Message::tool_result("call_1", "4"),
                Message::assistant("2 + 2 = 4"),
            ]
        );

        // The second model call sees the tool result
        assert_eq!(provider.calls(), 2);
        let second = provider.request(1);
        assert_eq!(second.messages.last(), Some(&Message::tool_result("call_1", "4")));
    }

    #[tokio::test]
    async fn test_tool_results_in_call_order() {
        let calls = vec![
            calc_call("c1", "1+1"),
            ToolCall::new("c2", "current_time", json!({"format": "%Y"})),
            calc_call("c3", "3*3"),
        ];
        let provider = Arc::new(MockProvider::replies(vec![
            LlmResponse::tool_calls(calls),
            LlmResponse::text("done"),
        ]));
        let agent = make_agent(provider, None);
        let id = agent.new_conversation().unwrap();
        agent.process(&id, "go").await.unwrap();

        let history = agent.history(&id).unwrap();
        let tool_messages: Vec<_> = history
            .iter()
            .filter_map(|m| match m {
                Message::Tool {
                    content,
                    tool_call_id,
                } => Some((tool_call_id.as_str(), content.as_str())),
                _ => None,
            })
            .collect();

        assert_eq!(tool_messages.len(), 3);
        assert_eq!(tool_messages[0], ("c1", "2"));
        assert_eq!(tool_messages[1].0, "c2");
        assert_eq!(tool_messages[1].1.len(), 4);
        assert_eq!(tool_messages[2], ("c3", "9"));
    }

    #[tokio::test]
    async fn test_tool_errors_become_results() {
        let provider = Arc::new(MockProvider::replies(vec![
            LlmResponse::tool_calls(vec![
                ToolCall::new("c1", "nope", json!({})),
                ToolCall::new("c2", "calculator", json!({})),
                calc_call("c3", "1/0"),
                ToolCall::unparsed("c4", "calculator", "{not json"),
                ToolCall::new("c5", "calculator", Value::String("1+1".into())),
            ]),
            LlmResponse::text("sorry"),
        ]));
        let agent = make_agent(provider, None);
        let id = agent.new_conversation().unwrap();

        assert_eq!(agent.process(&id, "break things").await.unwrap(), "sorry");

        let results: Vec<String> = agent
            .history(&id)
            .unwrap()
            .into_iter()
            .filter(Message::is_tool)
            .filter_map(|m| m.text().map(str::to_string))
            .collect();
        assert_eq!(results[0], "Error: unknown tool 'nope'");
        assert!(results[1].contains("missing required parameter 'expression'"));
        assert!(results[2].contains("division by zero"));
        assert!(results[3].contains("not valid JSON: {not json"));
        assert!(results[4].contains("must be a JSON object, got string"));
    }

    #[tokio::test]
    async fn test_provider_error_becomes_message() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path(), Some(7)).unwrap());
        let provider = Arc::new(MockProvider::scripted(vec![
            Err(ProviderError::Status {
                provider: "Mock".into(),
                status: 500,
                body: "boom".into(),
            }),
            Ok(LlmResponse::text("recovered")),
        ]));
        let agent = make_agent(provider.clone(), Some(cache.clone()));
        let id = agent.new_conversation().unwrap();

        let reply = agent.process(&id, "hi").await.unwrap();
        assert!(reply.contains("500"));
        assert_eq!(agent.history(&id).unwrap().last(), Some(&Message::assistant(&reply)));
        assert!(cache.is_empty().unwrap());

        // Same request again reaches the provider because nothing was cached
        let other = agent.new_conversation().unwrap();
        assert_eq!(agent.process(&other, "hi").await.unwrap(), "recovered");
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path(), Some(7)).unwrap());
        let provider = Arc::new(MockProvider::replies(vec![LlmResponse::text("cached answer")]));
        let agent = make_agent(provider.clone(), Some(cache));

        let first = agent.new_conversation().unwrap();
        assert_eq!(agent.process(&first, "hello").await.unwrap(), "cached answer");

        let second = agent.new_conversation().unwrap();
        assert_eq!(agent.process(&second, "hello").await.unwrap(), "cached answer");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let provider = Arc::new(MockProvider::forever(LlmResponse::tool_calls(vec![
            calc_call("loop", "1+1"),
        ])));
        let agent = make_agent(provider.clone(), None);
        let id = agent.new_conversation().unwrap();

        let err = agent.run_turn(&id, "loop forever", 3).await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimitExceeded { limit: 3 }));
        assert_eq!(provider.calls(), 3);

        // system + user + 3 x (assistant call, tool result)
        assert_eq!(agent.history(&id).unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let provider = Arc::new(MockProvider::replies(vec![LlmResponse::text("unused")]));
        let agent = make_agent(provider.clone(), None);
        let id = agent.new_conversation().unwrap();

        let err = agent.run_turn(&id, "hi", 0).await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimitExceeded { limit: 0 }));
        assert_eq!(provider.calls(), 0);
        assert_eq!(agent.history(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_started() {
        let provider = Arc::new(MockProvider::replies(vec![LlmResponse::text("hi there")]));
        let agent = make_agent(provider, None);

        agent.process("adhoc", "hi").await.unwrap();
        assert_eq!(
            agent.history("adhoc").unwrap(),
            vec![
                Message::system(SYSTEM),
                Message::user("hi"),
                Message::assistant("hi there"),
            ]
        );
    }

    #[tokio::test]
    async fn test_new_then_load_conversation() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let id = agent.new_conversation().unwrap();
        assert_eq!(agent.load_conversation(&id).unwrap(), vec![Message::system(SYSTEM)]);

        let err = agent.load_conversation("missing").unwrap_err();
        assert!(matches!(err, AgentError::Memory(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_clear_memory_keeps_system_prompt() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let id = agent.new_conversation().unwrap();
        agent.process(&id, "remember me").await.unwrap();

        agent.clear_memory(&id);
        assert_eq!(agent.memory().get_messages(&id), vec![Message::system(SYSTEM)]);
        assert_eq!(agent.history(&id).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_conversations() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let a = agent.new_conversation().unwrap();
        let b = agent.new_conversation().unwrap();

        let (ra, rb) = tokio::join!(agent.process(&a, "from a"), agent.process(&b, "from b"));
        assert_eq!(ra.unwrap(), "echo: from a");
        assert_eq!(rb.unwrap(), "echo: from b");
        assert_eq!(agent.history(&a).unwrap()[1], Message::user("from a"));
        assert_eq!(agent.history(&b).unwrap()[1], Message::user("from b"));
    }

    #[tokio::test]
    async fn test_same_conversation_turns_serialized() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let id = agent.new_conversation().unwrap();

        let (first, second) = tokio::join!(agent.process(&id, "one"), agent.process(&id, "two"));
        assert_eq!(first.unwrap(), "echo: one");
        assert_eq!(second.unwrap(), "echo: two");

        let roles: Vec<String> = agent
            .history(&id)
            .unwrap()
            .iter()
            .map(|m| m.role().to_string())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user", "assistant"]);
    }

    #[tokio::test]
    async fn test_turn_locks_released_after_turns() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let a = agent.new_conversation().unwrap();
        let b = agent.new_conversation().unwrap();

        agent.process(&a, "one").await.unwrap();
        assert_eq!(agent.turn_lock_count(), 0);

        let (ra, rb, ra2) = tokio::join!(
            agent.process(&a, "two"),
            agent.process(&b, "three"),
            agent.process(&a, "four"),
        );
        assert!(ra.is_ok() && rb.is_ok() && ra2.is_ok());
        assert_eq!(agent.turn_lock_count(), 0);
        assert_eq!(agent.history(&a).unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_close_conversation_keeps_log() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let id = agent.new_conversation().unwrap();
        agent.process(&id, "hello").await.unwrap();

        agent.close_conversation(&id);
        assert!(agent.memory().get_messages(&id).is_empty());
        assert_eq!(agent.history(&id).unwrap().len(), 3);

        // Picked up again from the store on the next turn
        assert_eq!(agent.process(&id, "again").await.unwrap(), "echo: again");
        let window = agent.memory().get_messages(&id);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0], Message::system(SYSTEM));
    }

    #[tokio::test]
    async fn test_delete_conversation() {
        let agent = make_agent(Arc::new(MockProvider::echo()), None);
        let id = agent.new_conversation().unwrap();
        assert_eq!(agent.list_conversations().unwrap().len(), 1);

        assert!(agent.delete_conversation(&id).unwrap());
        assert!(agent.list_conversations().unwrap().is_empty());
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.directory = dir.path().join("cache").to_string_lossy().into_owned();
        config.memory.directory = dir.path().join("conversations").to_string_lossy().into_owned();
        config.agent.max_iterations = 4;
        config.providers.openai.temperature = 0.2;

        let agent = Agent::from_config(&config, Arc::new(MockProvider::echo())).unwrap();
        assert_eq!(agent.model(), "mock-model");
        assert_eq!(agent.max_iterations(), 4);
        assert_eq!(agent.tools().tool_names(), vec!["calculator", "current_time"]);
        assert!(agent.cache().is_some());
        assert!(agent.system_prompt().contains("named Agentry"));

        let id = agent.new_conversation().unwrap();
        assert!(dir.path().join("conversations").join(format!("{id}.jsonl")).exists());
    }

    #[test]
    fn test_from_config_without_persistence() {
        let mut config = Config::default();
        config.cache.enabled = false;
        config.memory.long_term_enabled = false;
        config.agent.system_prompt = Some("Custom prompt".into());
        config.providers.openai.model = "gpt-4o-mini".into();

        let agent = Agent::from_config(&config, Arc::new(MockProvider::echo())).unwrap();
        assert!(agent.cache().is_none());
        assert_eq!(agent.model(), "gpt-4o-mini");
        assert_eq!(agent.system_prompt(), "Custom prompt");
    }
}
