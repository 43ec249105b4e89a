use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;

/// Load settings from `config/settings.yaml`, with `APP__`-prefixed
/// environment variables (and a `.env` file) taking precedence.
pub fn load_app_settings() -> Result<AppSettings> {
    // Need to load from dotenv to let it overwrite the db url from env.
    dotenv::from_path(".env").ok();
    let config_path = Path::new("config/settings.yaml").canonicalize()?;

    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    raw_settings.try_into()
}

/// Parse settings from a YAML string, without touching disk or environment.
pub fn settings_from_yaml(yaml: &str) -> Result<AppSettings> {
    let raw_settings = config::Config::builder()
        .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
        .build()?
        .try_deserialize::<RawSettings>()?;
    raw_settings.try_into()
}

#[cfg(test)]
mod tests {
    use super::settings_from_yaml;
    use crate::StorageSettings;

    const SAMPLE: &str = r"
api:
  host: 127.0.0.1
  port: 8000
  public_url: http://localhost:8000
  allowed_origins: [http://localhost:5173]
logging:
  level: debug
database:
  max_connections: 5
  min_connections: 1
  max_lifetime: 1800
  idle_timeout: 600
  acquire_timeout: 30
worker:
  max_attempts: 3
  operation_timeout_secs: 120
  stale_claim_secs: 600
matcher:
  similarity_threshold: 0.6
inference:
  url: http://localhost:8500
  timeout_secs: 60
storage:
  kind: local
  media_folder: ./media
secrets:
  database_url: postgres://localhost/faces_backend
";

    #[test]
    fn parses_sample_settings() {
        let settings = settings_from_yaml(SAMPLE).expect("settings should parse");
        assert_eq!(settings.api.port, 8000);
        assert_eq!(settings.worker.max_attempts, 3);
        assert!((settings.matcher.similarity_threshold - 0.6).abs() < f32::EPSILON);
        // embedding_dim falls back to the model default when omitted.
        assert_eq!(settings.matcher.embedding_dim, 128);
        assert!(matches!(settings.storage, StorageSettings::Local { .. }));
    }

    #[test]
    fn http_storage_requires_base_url() {
        let broken = SAMPLE.replace("kind: local", "kind: http");
        assert!(settings_from_yaml(&broken).is_err());
    }
}
