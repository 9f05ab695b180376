use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the relay from a browser; empty means any.
    pub allowed_origins: Vec<String>,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    provider: ProviderSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default)]
    max_output_tokens: Option<u32>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }
}

const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Self::from_file_config(file_config, env::var(API_KEY_ENV).ok());
        }

        Self::from_env()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_file_config(file: FileConfig, env_api_key: Option<String>) -> anyhow::Result<Self> {
        // File key takes precedence over the environment.
        let api_key = file
            .provider
            .api_key
            .or(env_api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(missing_api_key)?;

        Ok(Self {
            host: file.server.host,
            port: file.server.port,
            allowed_origins: file.server.allowed_origins,
            provider: ProviderConfig {
                api_key,
                model: file.provider.model,
                base_url: file.provider.base_url,
                temperature: file.provider.temperature,
                max_output_tokens: file.provider.max_output_tokens,
            },
        })
    }

    fn from_env() -> anyhow::Result<Self> {
        let host = env::var("LEADCHAT_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("LEADCHAT_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let allowed_origins = env::var("LEADCHAT_ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(missing_api_key)?;
        let model = env::var("LEADCHAT_MODEL").unwrap_or_else(|_| default_model());
        let base_url = env::var("LEADCHAT_PROVIDER_BASE_URL").ok();

        Ok(Self {
            host,
            port,
            allowed_origins,
            provider: ProviderConfig {
                api_key,
                model,
                base_url,
                temperature: default_temperature(),
                max_output_tokens: None,
            },
        })
    }
}

fn missing_api_key() -> anyhow::Error {
    anyhow::anyhow!(
        "Gemini API key not found: set {} or provider.api_key in the config file",
        API_KEY_ENV
    )
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("LEADCHAT_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed = parse_file_config(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}

fn parse_file_config(contents: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(contents)
}
