//! Backend capabilities built from the daemon config.

mod http;
mod log;

pub use http::{HttpBackend, SDK_METADATA_KEY};
pub use log::LogBackend;

use crate::config::{BackendConfig, BackendKind};
use crate::DaemonResult;
use delivery_scheduler::{BackendCapability, InMemoryBackendRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn build_backend(config: &BackendConfig) -> DaemonResult<Arc<dyn BackendCapability>> {
    let backend: Arc<dyn BackendCapability> = match &config.kind {
        BackendKind::Http {
            url,
            timeout_secs,
            auth_token,
        } => Arc::new(HttpBackend::new(
            &config.name,
            url,
            Duration::from_secs(*timeout_secs),
            auth_token.clone(),
        )?),
        BackendKind::Log => Arc::new(LogBackend::new(&config.name)),
    };
    Ok(backend)
}

/// A registry holding one backend per configured destination.
pub fn build_registry(configs: &[BackendConfig]) -> DaemonResult<Arc<InMemoryBackendRegistry>> {
    let registry = Arc::new(InMemoryBackendRegistry::new());
    for config in configs {
        registry.register(config.name.clone(), build_backend(config)?);
        info!(destination = %config.name, kind = kind_name(&config.kind), "Registered backend");
    }
    Ok(registry)
}

fn kind_name(kind: &BackendKind) -> &'static str {
    match kind {
        BackendKind::Http { .. } => "http",
        BackendKind::Log => "log",
    }
}
