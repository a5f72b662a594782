use std::sync::Arc;

use anyhow::{anyhow, Result};
use relay_llm::AssistantClient;
use relay_persist::{InMemoryMessageStore, MessageStore};
use relay_types::RelayConfig;

use crate::relay::Relay;
use crate::session::SessionManager;
use crate::title::{TitleGenerator, TruncatingTitleGenerator};
use crate::tool_relay::ToolRelay;
use crate::tools::ToolRegistry;

/// Builder for constructing a Relay with optional components
pub struct RelayBuilder {
    client: Option<Arc<dyn AssistantClient>>,
    assistant_id: Option<String>,
    store: Option<Arc<dyn MessageStore>>,
    tools: Option<ToolRegistry>,
    titles: Option<Arc<dyn TitleGenerator>>,
    config: RelayConfig,
}

impl RelayBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            assistant_id: None,
            store: None,
            tools: None,
            titles: None,
            config: RelayConfig::default(),
        }
    }

    /// Set the assistant-run provider client
    pub fn client(mut self, client: Arc<dyn AssistantClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the assistant every run is started with
    pub fn assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }

    /// Set the message store (defaults to in-memory)
    pub fn store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the tool registry (defaults to the built-in tools)
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the title generator (defaults to truncation)
    pub fn titles(mut self, titles: Arc<dyn TitleGenerator>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the Relay
    pub fn build(self) -> Result<Relay> {
        let client = self
            .client
            .ok_or_else(|| anyhow!("Assistant client is required"))?;
        let assistant_id = self
            .assistant_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("ASSISTANT_ID is required"))?;
        if self.config.max_tool_rounds == 0 {
            return Err(anyhow!("max_tool_rounds must be at least 1"));
        }

        let store: Arc<dyn MessageStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryMessageStore::new()),
        };
        let tools = Arc::new(self.tools.unwrap_or_else(ToolRegistry::with_builtins));
        let titles: Arc<dyn TitleGenerator> = match self.titles {
            Some(titles) => titles,
            None => Arc::new(TruncatingTitleGenerator),
        };

        let session = SessionManager::new(Arc::clone(&store), Arc::clone(&client), titles);
        let tool_relay = ToolRelay::new(
            Arc::clone(&client),
            Arc::clone(&tools),
            assistant_id,
            self.config.max_tool_rounds,
        );

        Ok(Relay::from_parts(client, store, tools, session, tool_relay, self.config))
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
