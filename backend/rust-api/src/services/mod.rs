use std::sync::Arc;

use crate::config::Config;
use crate::services::catalog_service::QuestionCatalog;
use crate::services::engine_service::EngineRegistry;
use crate::services::responder_service::{ConversationResponder, KeywordResponder};

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<QuestionCatalog>,
    pub engines: EngineRegistry,
    pub responder: Arc<dyn ConversationResponder>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let responder = Arc::new(KeywordResponder::new()?);
        Ok(Self::with_responder(config, responder))
    }

    pub fn with_responder(config: Config, responder: Arc<dyn ConversationResponder>) -> Self {
        let catalog = Arc::new(QuestionCatalog::new());
        let engines = EngineRegistry::new(catalog.clone(), config.mastery, config.selection);

        tracing::info!(
            "Practice engine ready (seeded={})",
            config.selection.seed.is_some()
        );

        Self {
            config,
            catalog,
            engines,
            responder,
        }
    }
}

pub mod catalog_service;
pub mod engine_service;
pub mod ledger_service;
pub mod mastery_service;
pub mod responder_service;
pub mod review_service;
pub mod selection_service;
pub mod session_service;
