pub const DEFAULT_CONFIG_PATH: &str = "sigmap.json";
pub const DEFAULT_LOG_FILTER: &str = "info";
