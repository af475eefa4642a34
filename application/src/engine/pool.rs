//! Provider client pool

use crate::ports::provider::{ProviderClient, ProviderFactory, ProviderInitError};
use docfiller_domain::ProviderId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Lazily constructed provider clients, at most one per provider
pub struct ProviderPool {
    factory: Arc<dyn ProviderFactory>,
    clients: Mutex<HashMap<ProviderId, Arc<dyn ProviderClient>>>,
}

impl ProviderPool {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The client for `provider`, constructing it on first use.
    ///
    /// A construction failure is returned for this provider only and is not
    /// cached, so a later call retries.
    pub async fn get_or_create(
        &self,
        provider: &ProviderId,
    ) -> Result<Arc<dyn ProviderClient>, ProviderInitError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(provider) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.create(provider)?;
        debug!("Created client for provider {}", provider);
        clients.insert(provider.clone(), Arc::clone(&client));
        Ok(client)
    }

    pub async fn size(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn clear(&self) {
        self.clients.lock().await.clear();
    }

    pub fn factory(&self) -> &Arc<dyn ProviderFactory> {
        &self.factory
    }
}
