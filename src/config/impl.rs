use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::AppConfig;

static CONFIG: OnceLock<ArcSwap<AppConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to loading `config.toml` if
/// `init_config` was never called.
pub fn get_config() -> Arc<AppConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(AppConfig::load(None)))
        .load_full()
}

/// Initialize the global configuration
///
/// `path` overrides the default "config.toml". Subsequent calls are no-ops.
pub fn init_config(path: Option<&str>) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(AppConfig::load(path)));
}

/// Replace the global configuration (tests, reload)
pub fn set_config(config: AppConfig) {
    match CONFIG.get() {
        Some(swap) => swap.store(Arc::new(config)),
        None => {
            // 并发初始化时 get_or_init 的赢家可能不是我们，再 store 一次
            let swap = CONFIG.get_or_init(|| ArcSwap::from_pointee(config.clone()));
            swap.store(Arc::new(config));
        }
    }
}
