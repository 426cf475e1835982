//! Application State
//!
//! Shared state across all handlers, plus startup assembly of the pipeline.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;

use aicc_agent::{ClarificationOrchestrator, ConversationIdGenerator, MetaInfoBuilder, OrchestratorConfig};
use aicc_classifier::Classifier;
use aicc_config::{load_settings, CategoryRegistry, Settings};
use aicc_llm::{LlmBackend, LlmClarifier, LlmFactory, LlmProviderConfig};

use crate::session::SessionManager;

/// Classifier load status reported by `/health` and `/ready`
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModelStatus {
    pub fn ready() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    pub fn of(classifier: &Classifier) -> Self {
        Self {
            available: classifier.is_available(),
            reason: classifier.unavailable_reason().map(str::to_string),
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Wrapped in RwLock so auth settings can be reloaded
    pub config: Arc<RwLock<Settings>>,
    pub orchestrator: Arc<ClarificationOrchestrator>,
    pub sessions: Arc<SessionManager>,
    pub model_status: Arc<ModelStatus>,
    /// Raw backend, probed by the readiness check
    pub llm_backend: Option<Arc<dyn LlmBackend>>,
    pub metrics: Option<PrometheusHandle>,
    env: Option<String>,
}

impl AppState {
    pub fn new(config: Settings, orchestrator: ClarificationOrchestrator) -> Self {
        let sessions = SessionManager::with_config(
            config.server.max_sessions,
            config.server.session_timeout(),
            config.server.cleanup_interval(),
        );
        Self {
            config: Arc::new(RwLock::new(config)),
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(sessions),
            model_status: Arc::new(ModelStatus::ready()),
            llm_backend: None,
            metrics: None,
            env: None,
        }
    }

    /// Assemble registry, classifier, LLM and orchestrator from settings.
    ///
    /// Fails when the category file is invalid, the LLM provider is
    /// misconfigured, or a loaded model's labels disagree with the registry.
    /// A model that fails to load is not an error: the server starts and
    /// reports not ready.
    pub fn from_settings(settings: Settings, env: Option<String>) -> aicc_core::Result<Self> {
        let registry = Arc::new(CategoryRegistry::load(&settings.categories_path)?);

        let classifier = Classifier::from_config(&settings.classifier, registry.thresholds());
        let model_status = ModelStatus::of(&classifier);

        let llm_config = LlmProviderConfig::from_settings(
            &settings.llm,
            settings.clarification.llm_timeout(),
        )?;
        let backend = LlmFactory::create_backend(&llm_config)?;
        let clarifier = LlmClarifier::from_arc(backend.clone());
        tracing::info!(
            provider = ?llm_config.provider,
            model = %llm_config.model,
            "Clarification LLM configured"
        );

        let meta = MetaInfoBuilder::new(registry.clone(), Arc::new(ConversationIdGenerator::system()));
        let orchestrator = ClarificationOrchestrator::new(
            Arc::new(classifier),
            Arc::new(clarifier),
            registry,
            meta,
            OrchestratorConfig::from_settings(&settings),
        )?;

        Ok(Self::new(settings, orchestrator)
            .with_model_status(model_status)
            .with_llm_backend(backend)
            .with_env(env))
    }

    pub fn with_model_status(mut self, status: ModelStatus) -> Self {
        self.model_status = Arc::new(status);
        self
    }

    pub fn with_llm_backend(mut self, backend: Arc<dyn LlmBackend>) -> Self {
        self.llm_backend = Some(backend);
        self
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }

    /// Reload settings from disk.
    ///
    /// Only request-time settings (auth) take effect; the pipeline is built
    /// once at startup.
    pub fn reload_config(&self) -> Result<(), String> {
        let new_config = load_settings(self.env.as_deref())
            .map_err(|e| format!("Failed to reload config: {}", e))?;

        *self.config.write() = new_config;
        tracing::info!("Configuration reloaded");
        Ok(())
    }

    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }
}
