//! Source registry: routes each target to the adapter named by its `source_id`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use beopjeon_core::{RawPayload, SourceRef};
use tracing::info;

use crate::adapter::{SourceAdapter, SourceKind, SourceSpec};
use crate::error::{FetchError, SourceError};
use crate::file::{ArchiveSource, FileSource};

#[derive(Default, Clone)]
pub struct SourceRegistry {
    adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Result<(), SourceError> {
        let id = adapter.id().to_string();
        if self.adapters.contains_key(&id) {
            return Err(SourceError::DuplicateId(id));
        }
        self.adapters.insert(id, adapter);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build adapters for every configured source.
    ///
    /// `law_api_key` is used for `law_api` sources that carry no `auth`.
    #[cfg(feature = "http")]
    pub fn from_specs(
        specs: &[SourceSpec],
        client: &reqwest::Client,
        law_api_key: Option<&str>,
    ) -> Result<Self, SourceError> {
        use crate::http::HttpSource;
        use crate::law_api::LawApiClient;

        let mut registry = Self::new();
        for spec in specs {
            let adapter: Arc<dyn SourceAdapter> = match spec.kind {
                SourceKind::Http => {
                    require_base(spec)?;
                    Arc::new(HttpSource::new(
                        spec.id.clone(),
                        client.clone(),
                        &spec.base,
                        spec.auth.clone(),
                        spec.format,
                    ))
                }
                SourceKind::LawApi => {
                    let oc = spec
                        .auth
                        .as_deref()
                        .or(law_api_key)
                        .ok_or_else(|| SourceError::Invalid {
                            id: spec.id.clone(),
                            message: "law_api source needs an OC key (auth or LAW_API_OC)".into(),
                        })?;
                    Arc::new(LawApiClient::new(spec.id.clone(), client.clone(), &spec.base, oc))
                }
                SourceKind::File | SourceKind::Archive => local_adapter(spec)?,
            };
            registry.register(adapter)?;
        }
        info!(count = registry.len(), "source registry ready");
        Ok(registry)
    }

    /// Build adapters for local sources only (`file`, `archive`).
    pub fn from_local_specs(specs: &[SourceSpec]) -> Result<Self, SourceError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(local_adapter(spec)?)?;
        }
        Ok(registry)
    }
}

fn require_base(spec: &SourceSpec) -> Result<(), SourceError> {
    if spec.base.trim().is_empty() {
        return Err(SourceError::Invalid {
            id: spec.id.clone(),
            message: "missing base".into(),
        });
    }
    Ok(())
}

fn local_adapter(spec: &SourceSpec) -> Result<Arc<dyn SourceAdapter>, SourceError> {
    require_base(spec)?;
    match spec.kind {
        SourceKind::File => Ok(Arc::new(FileSource::new(spec.id.clone(), &spec.base, spec.format))),
        SourceKind::Archive => Ok(Arc::new(ArchiveSource::new(spec.id.clone(), &spec.base, spec.format))),
        other => Err(SourceError::Invalid {
            id: spec.id.clone(),
            message: format!("{other:?} sources need the `http` feature"),
        }),
    }
}

#[async_trait]
impl SourceAdapter for SourceRegistry {
    fn id(&self) -> &str {
        "registry"
    }

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError> {
        let adapter = self
            .get(&target.source_id)
            .ok_or_else(|| FetchError::InvalidTarget(format!("unknown source {:?}", target.source_id)))?;
        adapter.fetch(target).await
    }
}
