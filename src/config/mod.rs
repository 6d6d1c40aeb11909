pub mod settings;

pub use settings::Config;

use crate::error::FeedError;
use std::sync::Arc;

/// Loads the application configuration from the environment (and an
/// optional .env file) and returns it as an `Arc<Config>`.
pub fn load_config() -> Result<Arc<Config>, FeedError> {
    dotenv::dotenv().ok(); // Load .env if present, ignore errors

    let config = Config::from_env();

    if config.api_base_url.is_empty() {
        return Err(FeedError::Config("API_BASE_URL cannot be empty".to_string()));
    }
    if config.ws_url.is_empty() {
        return Err(FeedError::Config("WS_URL cannot be empty".to_string()));
    }

    config.validate_and_log();

    Ok(Arc::new(config))
}
