use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::results::ResultStore;
use crate::services::content_origin::ContentOriginService;
use crate::services::llm::LlmService;
use crate::services::vector_index::IndexStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    llm: LlmService,
    detection: ContentOriginService,
    results: ResultStore,
    indexes: IndexStore,
}

impl AppState {
    pub(crate) fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let llm = LlmService::from_settings(&settings)?;
        let detection = ContentOriginService::from_settings(&settings)?;
        let results = ResultStore::from_settings(&settings);
        let indexes = IndexStore::from_settings(&settings);

        Ok(Self {
            inner: Arc::new(InnerState { settings, llm, detection, results, indexes }),
        })
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn llm(&self) -> &LlmService {
        &self.inner.llm
    }

    pub(crate) fn detection(&self) -> &ContentOriginService {
        &self.inner.detection
    }

    pub(crate) fn results(&self) -> &ResultStore {
        &self.inner.results
    }

    pub(crate) fn indexes(&self) -> &IndexStore {
        &self.inner.indexes
    }
}
