//! The closed set of vendor adapters.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nlg_adapter_ibm::{IbmAdapter, IbmRuntimeClient, JobService};
use nlg_adapter_ibm_legacy::IbmLegacyAdapter;
use nlg_adapter_iontrap::IonTrapAdapter;
use nlg_adapter_rigetti::RigettiAdapter;
use nlg_core::{Adapter, IngestError, IngestRecord, IngestResult, NonlocalGame};

use crate::config::{AdapterKind, Config};

/// One of the supported hardware sources.
pub enum VendorAdapter {
    IonTrap(IonTrapAdapter),
    IbmLegacy(IbmLegacyAdapter),
    Ibm(IbmAdapter),
    Rigetti(RigettiAdapter),
}

impl VendorAdapter {
    /// Build the adapter of `kind`. The IBM adapter reaches its job service
    /// through `service`.
    pub fn new(
        kind: AdapterKind,
        game: NonlocalGame,
        data_folder: &Path,
        service: Option<Arc<dyn JobService>>,
    ) -> IngestResult<Self> {
        Ok(match kind {
            AdapterKind::IonTrap => VendorAdapter::IonTrap(IonTrapAdapter::new(game, data_folder)),
            AdapterKind::IbmLegacy => {
                VendorAdapter::IbmLegacy(IbmLegacyAdapter::new(game, data_folder))
            }
            AdapterKind::Rigetti => VendorAdapter::Rigetti(RigettiAdapter::new(game, data_folder)),
            AdapterKind::Ibm => {
                let service = service.ok_or_else(|| {
                    IngestError::JobService("no job service configured for the ibm adapter".into())
                })?;
                VendorAdapter::Ibm(IbmAdapter::new(game, data_folder, service))
            }
        })
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            VendorAdapter::IonTrap(_) => AdapterKind::IonTrap,
            VendorAdapter::IbmLegacy(_) => AdapterKind::IbmLegacy,
            VendorAdapter::Ibm(_) => AdapterKind::Ibm,
            VendorAdapter::Rigetti(_) => AdapterKind::Rigetti,
        }
    }
}

#[async_trait]
impl Adapter for VendorAdapter {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>> {
        match self {
            VendorAdapter::IonTrap(a) => a.ingest().await,
            VendorAdapter::IbmLegacy(a) => a.ingest().await,
            VendorAdapter::Ibm(a) => a.ingest().await,
            VendorAdapter::Rigetti(a) => a.ingest().await,
        }
    }
}

/// Every adapter enabled in `config`, each built for `game`.
pub fn build_adapters(config: &Config, game: &NonlocalGame) -> IngestResult<Vec<VendorAdapter>> {
    let kinds = config
        .adapter_kinds()
        .map_err(|e| IngestError::Validation(e.to_string()))?;

    let service: Option<Arc<dyn JobService>> = if kinds.contains(&AdapterKind::Ibm) {
        let token = config.ibm.token.as_deref().unwrap_or_default();
        let client = IbmRuntimeClient::new(config.ibm.endpoint.clone(), token)?;
        Some(Arc::new(client))
    } else {
        None
    };

    kinds
        .into_iter()
        .map(|kind| VendorAdapter::new(kind, game.clone(), &config.data_folder, service.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlg_adapter_ibm::StaticJobService;

    #[test]
    fn test_build_adapters_follows_config() {
        let mut config = Config::default();
        config.adapters = vec!["rigetti".into(), "ibm-legacy".into()];
        let adapters = build_adapters(&config, &NonlocalGame::new("G14", 0.9, 1.0)).unwrap();
        let names: Vec<_> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["rigetti", "ibm-legacy"]);
    }

    #[test]
    fn test_ibm_without_token_fails() {
        let mut config = Config::default();
        config.adapters = vec!["ibm".into()];
        assert!(build_adapters(&config, &NonlocalGame::new("G14", 0.9, 1.0)).is_err());
    }

    #[test]
    fn test_ibm_needs_a_service() {
        let game = NonlocalGame::new("G14", 0.9, 1.0);
        assert!(VendorAdapter::new(AdapterKind::Ibm, game.clone(), Path::new("data"), None).is_err());

        let service: Arc<dyn JobService> = Arc::new(StaticJobService::new());
        let adapter =
            VendorAdapter::new(AdapterKind::Ibm, game, Path::new("data"), Some(service)).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Ibm);
    }
}
