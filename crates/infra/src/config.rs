use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub log_level: String,
    pub data_backend: String,
    pub realtime_transport: String,
    pub realtime_channel_prefix: String,
    pub realtime_buffer: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("realtime_transport", "local")?
            .set_default("realtime_channel_prefix", "sewa:contact:realtime")?
            .set_default("realtime_buffer", 256)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        log_level: "info".to_string(),
        data_backend: "memory".to_string(),
        realtime_transport: "local".to_string(),
        realtime_channel_prefix: "sewa:contact:realtime:test".to_string(),
        realtime_buffer: 16,
    }
}
