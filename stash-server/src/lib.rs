pub mod config;

use std::path::PathBuf;

use anyhow::Result;
use stash_axum::AxumApp;
use stash_blob::{StorageSettings, StoreProvider, UploadPipeline};
use stash_core::{StashConfigSnapshot, UploadPolicy};

/// Build the HTTP app from configuration: policy, backend (initialised once
/// here, never per request), upload route, health route and static serving.
pub async fn build(config: &StashConfigSnapshot) -> Result<AxumApp> {
    let policy = UploadPolicy::from_config(config);
    let settings = StorageSettings::from_config(config)?;

    let provider = StoreProvider::new(settings.clone());
    let store = provider.get().await?;

    tracing::info!(
        backend = settings.backend_name(),
        max_file_bytes = policy.max_file_bytes(),
        allowed_types = ?policy.allowed_types(),
        "upload pipeline configured"
    );

    let route = config
        .get_string("upload.route")
        .unwrap_or_else(|| "/api/upload".to_string());

    let mut ax = stash_axum::axum(UploadPipeline::new(store, policy))
        .use_upload(&route)
        .use_get("/health", || async { "ok" });

    if let StorageSettings::Local(local) = &settings {
        ax = ax.serve_dir(&local.public_prefix, &local.root);
    }

    let static_dir = config
        .get_string("static.dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("public"));

    Ok(ax.fallback_dir(static_dir).with_http_layers())
}
