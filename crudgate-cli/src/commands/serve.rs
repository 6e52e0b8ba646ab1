use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use crudgate_core::config::CrudgateConfig;
use crudgate_core::logging::init_logging;
use crudgate_core::model::{normalize_path, ModelDefinition};
use crudgate_core::store::MemoryRecordStore;
use crudgate_core::CrudServer;

/// Resolve the layered configuration, with `--port` on top
fn load_config(path: &Path, port: Option<u16>) -> Result<CrudgateConfig> {
    let mut config = CrudgateConfig::load_from(path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Register the configured models, adding a groups collection when none is declared
fn build_server(config: CrudgateConfig) -> Result<CrudServer> {
    let groups_path = normalize_path(&config.security.groups_path);
    let declares_groups = config.models.iter().any(|m| m.normalized_path() == groups_path);
    let admin_roles = config.security.admin_roles.clone();

    let mut server = CrudServer::with_config(config).with_configured_models()?;
    if !declares_groups {
        log::warn!(
            "No model at {}: serving an in-memory groups collection managed by [{}]",
            groups_path,
            admin_roles.join(", ")
        );
        server = server.with_model(
            ModelDefinition::groups(&groups_path, admin_roles),
            Arc::new(MemoryRecordStore::new()),
        );
    }
    Ok(server)
}

pub async fn run(path: &Path, port: Option<u16>) -> Result<()> {
    let config = load_config(path, port)?;
    init_logging(&config.logging)?;
    log::info!("Loaded {} model(s) from {}", config.models.len(), path.display());

    build_server(config)?.serve().await
}
