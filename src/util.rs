const CONFIG_PATH: &str = "CLOUDSCRAPE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./cloudscrape.json";

/// Config file path from the environment, falling back to the default
pub fn get_config_path() -> String {
    std::env::var(CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

const LOG_LEVEL: &str = "CLOUDSCRAPE_LOG";

/// Log level from the environment, `info` if unset or unparseable
pub fn get_log_level() -> tracing::level_filters::LevelFilter {
    std::env::var(LOG_LEVEL)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::level_filters::LevelFilter::INFO)
}
