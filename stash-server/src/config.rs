use stash_core::{StashConfig, StashConfigSnapshot};
use tracing_subscriber::EnvFilter;

pub const ENV_PREFIX: &str = "STASH__";
const DEFAULT_FILTER: &str = "info,stash=debug";

/// Process configuration: `STASH__*` environment variables over defaults.
/// Read once at startup.
pub fn load() -> StashConfig {
    let mut config = StashConfig::from_env(ENV_PREFIX);
    apply_defaults(&mut config);
    config
}

pub fn apply_defaults(config: &mut StashConfig) {
    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "3030");
    config.set_default("upload.route", "/api/upload");
    config.set_default("storage.backend", "local");
    config.set_default("storage.local.root", "public/uploads");
    config.set_default("storage.local.public_prefix", "/uploads");
    config.set_default("static.dir", "public");
}

/// `RUST_LOG` wins; otherwise `info,stash=debug`. `log.format=json` switches
/// to one JSON object per line.
pub fn init_tracing(config: &StashConfigSnapshot) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.get("log.format") {
        Some("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}
