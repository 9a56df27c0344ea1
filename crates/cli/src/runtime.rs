//! Shared wiring for both modes: provider, conversation, registry, and
//! memory, assembled from configuration.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use gloop_config::GloopConfig;
use gloop_core::{Conversation, ToolRegistry};
use gloop_memory::NoteStore;
use gloop_provider::OpenAiCompatProvider;

/// Everything a run needs, built once per process.
pub struct Runtime {
    pub config: GloopConfig,
    pub conversation: Arc<Conversation>,
    pub registry: Arc<RwLock<ToolRegistry>>,
    pub memory: Arc<NoteStore>,
    pub tools_dir: PathBuf,
}

impl Runtime {
    /// Assemble the runtime. `model` and `routing` override the config.
    pub fn new(
        config: GloopConfig,
        model: Option<String>,
        routing: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(concat!(
                "No API key configured. Set GLOOP_API_KEY (or OPENROUTER_API_KEY / ",
                "OPENAI_API_KEY), or add api_key to ~/.gloop/config.toml.",
            )
            .into());
        };

        let provider = Arc::new(OpenAiCompatProvider::new(
            "openrouter",
            config.base_url.clone(),
            api_key,
        ));
        let model = model.unwrap_or_else(|| config.default_model.clone());
        let conversation = Arc::new(Conversation::new(provider, model));
        conversation
            .set_provider_routing(routing.or_else(|| config.provider_routing.clone()));

        let registry = Arc::new(RwLock::new(gloop_tools::default_registry()));
        let tools_dir = GloopConfig::tools_dir();
        gloop_tools::attach_installed(&registry, &tools_dir);

        let memory = Arc::new(NoteStore::new(GloopConfig::memory_path()));

        Ok(Self {
            config,
            conversation,
            registry,
            memory,
            tools_dir,
        })
    }
}
