use std::env;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::language::Language;
use crate::llm::{LlmSettings, Provider};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub resilience: ResilienceConfig,
    pub session: SessionConfig,
    pub pipeline: PipelineConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub requests_per_second: f32,
    pub burst_size: f32,
    /// Upper bound for a whole HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound for a single provider call, in seconds.
    pub provider_timeout_secs: u64,
}

impl ResilienceConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
}

/// How `max_words` is applied to a generated summary.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
    /// Only a hint to the model (token budget); output is kept as is.
    #[default]
    Advisory,
    /// Hard cut to the first `max_words` words plus `...`.
    Truncate,
}

/// Which language tag is sent to the speech provider.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioLanguage {
    /// The language the stored text is in.
    #[default]
    FollowContent,
    /// Always `pipeline.audio_fixed_language`.
    Fixed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub summary_length: SummaryLength,
    pub default_max_words: u32,
    /// Reject unknown language codes instead of falling back to English.
    pub strict_languages: bool,
    pub audio_language: AudioLanguage,
    pub audio_fixed_language: Language,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
}

impl LlmConfig {
    #[must_use]
    pub fn settings(&self) -> LlmSettings {
        let provider = Provider::detect_from_url(&self.base_url).with_azure_deployment(
            self.azure_deployment.clone(),
            self.azure_api_version.clone(),
        );
        LlmSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: self.model.clone(),
            provider,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Language filter passed to the search API.
    pub language: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// AllOrigins-style proxy; the page URL is appended url-encoded.
    pub proxy_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
}

/// Legacy provider variables and the key each one overrides.
const PROVIDER_ENV_OVERRIDES: [(&str, &str); 8] = [
    ("LLM_BASE_URL", "providers.llm.base_url"),
    ("LLM_MODEL", "providers.llm.model"),
    ("LLM_API_KEY", "providers.llm.api_key"),
    ("AZURE_DEPLOYMENT_NAME", "providers.llm.azure_deployment"),
    ("AZURE_API_VERSION", "providers.llm.azure_api_version"),
    ("NEWSAPI_KEY", "providers.search.api_key"),
    ("TTS_BASE_URL", "providers.speech.base_url"),
    ("TTS_API_KEY", "providers.speech.api_key"),
];

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // Priority: CLI flag > CLI env var > legacy provider env > NEWSDESK_* env > file > defaults.
        let mut builder = Config::builder()
            .set_default("server.port", 8000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("logging.json", false)?
            .set_default("logging.filter", "info")?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?
            .set_default("resilience.request_timeout_secs", 120)?
            .set_default("resilience.provider_timeout_secs", 30)?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("session.cleanup_interval_secs", 60)?
            .set_default("pipeline.summary_length", "advisory")?
            .set_default("pipeline.default_max_words", 200)?
            .set_default("pipeline.strict_languages", true)?
            .set_default("pipeline.audio_language", "follow_content")?
            .set_default("pipeline.audio_fixed_language", "en")?
            .set_default("providers.llm.base_url", "https://api.aimlapi.com")?
            .set_default(
                "providers.llm.model",
                "meta-llama/Meta-Llama-3-8B-Instruct-Turbo",
            )?
            .set_default("providers.search.base_url", "https://newsapi.org")?
            .set_default("providers.search.language", "en")?
            .set_default(
                "providers.fetch.user_agent",
                "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
            )?
            .set_default("providers.speech.base_url", "https://api.openai.com")?
            .set_default("providers.speech.model", "tts-1")?
            .set_default("providers.speech.voice", "alloy")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("newsdesk").required(false)),
        };

        // E.g. NEWSDESK_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("NEWSDESK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in PROVIDER_ENV_OVERRIDES {
            if let Ok(val) = env::var(var)
                && !val.trim().is_empty()
            {
                builder = builder.set_override(key, val)?;
            }
        }

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_settings_drop_blank_key() {
        let cfg = LlmConfig {
            base_url: "https://api.aimlapi.com".to_string(),
            model: "m".to_string(),
            api_key: Some("  ".to_string()),
            azure_deployment: None,
            azure_api_version: None,
        };
        let settings = cfg.settings();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.provider, Provider::AimlApi);
    }

    #[test]
    fn test_resilience_durations() {
        let cfg = ResilienceConfig {
            rate_limit_enabled: false,
            requests_per_second: 1.0,
            burst_size: 1.0,
            request_timeout_secs: 120,
            provider_timeout_secs: 30,
        };
        assert_eq!(cfg.provider_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(120));
    }
}
