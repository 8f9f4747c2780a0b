// server/src/state.rs

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::directory::JobDirectory;
use crate::gateway::TaskGateway;
use crate::legacy::LegacyLogReader;
use crate::resolver::StatusResolver;
use crate::store::MemoryTaskStore;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<StatusResolver>,
    pub directory: Arc<JobDirectory>,
    // lado escritor del store, para que el ejecutor reporte avances
    pub store: MemoryTaskStore,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let store = MemoryTaskStore::new(config.max_retries);
        let gateway: Arc<dyn TaskGateway> = Arc::new(store.clone());
        let legacy = LegacyLogReader::new(config.prgs_dir.clone());

        Self {
            resolver: Arc::new(StatusResolver::with_backends(gateway.clone(), legacy.clone())),
            directory: Arc::new(JobDirectory::new(gateway, legacy)),
            store,
        }
    }
}
