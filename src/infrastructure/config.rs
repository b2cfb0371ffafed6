use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::DEFAULT_CHUNK_SIZE;

pub const CONFIG_DIR_ENV: &str = "SCANSHEET_CONFIG_DIR";
const APP_FILE: &str = "app.yaml";
const PROMPTS_FILE: &str = "prompts.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings plus prompt templates, as loaded from the config directory.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub batch: BatchConfig,
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_base: String,
    /// Never read from YAML; set from `GEMINI_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Remote extraction endpoint used by the `scan` CLI.
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/v1/extract".to_string(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub chunk_size: usize,
    /// How long a finished batch job stays queryable.
    pub retention_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retention_seconds: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetBackend {
    #[default]
    Google,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub backend: SheetBackend,
    pub api_base: String,
    pub header_range: String,
    pub timeout_seconds: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            backend: SheetBackend::Google,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            header_range: "A1:Z1".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Template with `{fields}` and `{example}` placeholders.
    pub extraction: String,
    pub template: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            extraction: DEFAULT_EXTRACTION_PROMPT.to_string(),
            template: DEFAULT_TEMPLATE_PROMPT.to_string(),
        }
    }
}

const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an OCR and data-entry system for scanned documents such as letters, certificates and forms.

TASK: extract the following fields from the attached document:
{fields}

INSTRUCTIONS:
- Read the text carefully even through stamps, watermarks or decorative backgrounds.
- For bilingual documents prefer the Indonesian text.
- If the document contains several separate documents or table rows, return a JSON array with one object per document or row.
- Otherwise return a single JSON object in exactly this format:
{example}

RULES:
1. If a field is not found, use an empty string "".
2. Keep numbers, registration codes and dates exactly as printed, including separators.
3. Return ONLY the JSON, without markdown formatting or explanations."#;

const DEFAULT_TEMPLATE_PROMPT: &str = r#"You are an expert data analyst.
The attached image is a screenshot of a spreadsheet, form or document template.
Extract the column headers or field labels (for example "Nama", "Tanggal", "Alamat").
Ignore titles and boilerplate text that are not headers.
Return the headers as a JSON array of strings, for example ["Name", "Date of Birth", "Address"], and nothing else."#;

impl AppConfig {
    /// Loads `.env`, then the YAML files from `SCANSHEET_CONFIG_DIR`
    /// (default `config`), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".into());
        let mut config = Self::load_from(Path::new(&dir))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `app.yaml` and `prompts.yaml` from `dir`; a missing file keeps defaults.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let config = read_yaml::<Config>(&dir.join(APP_FILE))?.unwrap_or_default();
        let prompts = read_yaml::<PromptsConfig>(&dir.join(PROMPTS_FILE))?.unwrap_or_default();
        Ok(Self { config, prompts })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cfg = &mut self.config;
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            cfg.llm.api_key = Some(key);
        }
        if let Some(host) = lookup("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            cfg.server.port = parse_var("SERVER_PORT", &port)?;
        }
        if let Some(endpoint) = lookup("EXTRACTION_ENDPOINT") {
            cfg.extraction.endpoint = endpoint;
        }
        if let Some(size) = lookup("BATCH_CHUNK_SIZE") {
            cfg.batch.chunk_size = parse_var("BATCH_CHUNK_SIZE", &size)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config.batch.chunk_size == 0 {
            return Err(ConfigError::Invalid("batch.chunk_size must be at least 1".into()));
        }
        if self.config.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_upload_bytes must be positive".into()));
        }
        Ok(())
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={value} is not valid")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.config.batch.chunk_size, 3);
        assert_eq!(config.config.batch.retention_seconds, 3600);
        assert_eq!(config.config.sheets.header_range, "A1:Z1");
        assert!(config.prompts.extraction.contains("{fields}"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "batch:\n  chunk_size: 5\nsheets:\n  backend: memory\n",
        )
        .unwrap();
        assert_eq!(config.batch.chunk_size, 5);
        assert_eq!(config.sheets.backend, SheetBackend::Memory);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_missing_directory_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/scansheet")).unwrap();
        assert_eq!(config.config.batch.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_shipped_config_files_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let config = AppConfig::load_from(&dir).unwrap();
        assert_eq!(config.config.batch.chunk_size, 3);
        assert_eq!(config.config.sheets.backend, SheetBackend::Google);
        assert!(config.prompts.extraction.contains("{example}"));
        assert!(config.prompts.template.contains("JSON array"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GEMINI_API_KEY", "abc"),
            ("SERVER_PORT", "9090"),
            ("BATCH_CHUNK_SIZE", "4"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.config.llm.api_key.as_deref(), Some("abc"));
        assert_eq!(config.config.server.port, 9090);
        assert_eq!(config.config.batch.chunk_size, 4);
    }

    #[test]
    fn test_invalid_overrides_and_zero_chunk() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|k| (k == "SERVER_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        config.config.batch.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
