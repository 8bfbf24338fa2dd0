use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use geosync_store::{DatasetStore, MemoryStore};
use geosync_sync::SyncHub;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::gateway::{SharedHub, UpdateGateway};
use crate::router::{build_router, AppState};
use crate::seed::apply_seeds;

/// GeoSync dataset server.
pub struct GeoSyncServer {
    config: ServerConfig,
    gateway: UpdateGateway,
}

impl GeoSyncServer {
    /// Build the store and hub described by `config` and load its seed datasets.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let store = MemoryStore::with_algorithm(config.digest);
        let hub: SharedHub = Arc::new(SyncHub::new(store, config.sync.clone()));
        let gateway = UpdateGateway::new(hub, config.max_dataset_id_len);
        apply_seeds(&gateway, &config.seeds)?;

        Ok(Self { config, gateway })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn hub(&self) -> &SharedHub {
        self.gateway.hub()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            gateway: self.gateway.clone(),
        })
    }

    /// Start serving requests until the process is killed.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start serving requests; stop accepting when `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr: SocketAddr = listener.local_addr()?;
        let datasets = self.hub().store().len()?;
        tracing::info!(
            addr = %local_addr,
            digest = %self.hub().store().hash_algorithm(),
            datasets,
            "GeoSync server listening"
        );

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!(
            connections = self.hub().registry().connection_count(),
            "GeoSync server stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedDataset;
    use crate::gateway::Point;
    use geosync_core::{DatasetId, HashAlgorithm};

    #[test]
    fn server_construction() {
        let server = GeoSyncServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert!(server.hub().store().is_empty().unwrap());
    }

    #[test]
    fn seeds_loaded_on_construction() {
        let config = ServerConfig {
            seeds: vec![SeedDataset {
                id: "region".into(),
                points: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            }],
            ..ServerConfig::default()
        };
        let server = GeoSyncServer::new(config).unwrap();
        assert!(server
            .hub()
            .store()
            .hash_of(&DatasetId::new("region"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn store_uses_configured_digest() {
        let config = ServerConfig {
            digest: HashAlgorithm::Blake3,
            ..ServerConfig::default()
        };
        let server = GeoSyncServer::new(config).unwrap();
        assert_eq!(server.hub().store().hash_algorithm(), HashAlgorithm::Blake3);
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = ServerConfig::default();
        config.max_dataset_id_len = 0;
        assert!(GeoSyncServer::new(config).is_err());
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = GeoSyncServer::new(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.serve_on(listener, async {}).await.unwrap();
    }
}
