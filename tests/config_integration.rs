use std::env;
use std::io::Write;

use newsdesk::config::{AppConfig, AudioLanguage, SummaryLength};
use newsdesk::language::Language;
use newsdesk::llm::Provider;
use serial_test::serial;

const TOUCHED_VARS: [&str; 16] = [
    "CONFIG_FILE",
    "HOST",
    "PORT",
    "LOG_JSON",
    "RATE_LIMIT_ENABLED",
    "LLM_BASE_URL",
    "LLM_MODEL",
    "LLM_API_KEY",
    "AZURE_DEPLOYMENT_NAME",
    "AZURE_API_VERSION",
    "NEWSAPI_KEY",
    "TTS_BASE_URL",
    "TTS_API_KEY",
    "NEWSDESK_SERVER__PORT",
    "NEWSDESK_PIPELINE__SUMMARY_LENGTH",
    "NEWSDESK_PROVIDERS__SEARCH__LANGUAGE",
];

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    for var in TOUCHED_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn load(args: &[&str]) -> AppConfig {
    let argv = std::iter::once("newsdesk").chain(args.iter().copied());
    AppConfig::load_from_args(argv).expect("config should load")
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert!(!config.logging.json);
    assert!(config.resilience.rate_limit_enabled);
    assert_eq!(config.resilience.request_timeout_secs, 120);
    assert_eq!(config.resilience.provider_timeout_secs, 30);
    assert_eq!(config.session.idle_timeout_secs, 1800);
    assert_eq!(config.pipeline.summary_length, SummaryLength::Advisory);
    assert_eq!(config.pipeline.default_max_words, 200);
    assert!(config.pipeline.strict_languages);
    assert_eq!(config.pipeline.audio_language, AudioLanguage::FollowContent);
    assert_eq!(config.pipeline.audio_fixed_language, Language::En);
    assert_eq!(config.providers.llm.settings().provider, Provider::AimlApi);
    assert!(config.providers.search.api_key.is_none());
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("NEWSDESK_SERVER__PORT", "9090");
        env::set_var("NEWSDESK_PIPELINE__SUMMARY_LENGTH", "truncate");
        env::set_var("NEWSDESK_PROVIDERS__SEARCH__LANGUAGE", "fr");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.pipeline.summary_length, SummaryLength::Truncate);
    assert_eq!(config.providers.search.language, "fr");

    clear_env_vars();
}

#[test]
#[serial]
fn test_legacy_provider_vars() {
    clear_env_vars();
    unsafe {
        env::set_var("LLM_BASE_URL", "https://api.groq.com");
        env::set_var("LLM_MODEL", "llama3-8b-8192");
        env::set_var("LLM_API_KEY", "sk-test");
        env::set_var("NEWSAPI_KEY", "news-key");
        env::set_var("TTS_API_KEY", "");
    }

    let config = load(&[]);
    let llm = config.providers.llm.settings();
    assert_eq!(llm.provider, Provider::Groq);
    assert_eq!(llm.model, "llama3-8b-8192");
    assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.providers.search.api_key.as_deref(), Some("news-key"));
    // Blank legacy vars are ignored.
    assert!(config.providers.speech.api_key.is_none());

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() -> anyhow::Result<()> {
    clear_env_vars();

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    write!(
        file,
        r"
server:
  port: 7070
pipeline:
  audio_language: fixed
  audio_fixed_language: es
  strict_languages: false
providers:
  fetch:
    proxy_url: https://api.allorigins.win/get
"
    )?;

    let path = file.path().to_string_lossy().to_string();
    let config = AppConfig::load_from_args(["newsdesk", "--config", path.as_str()])?;

    assert_eq!(config.server.port, 7070);
    assert_eq!(config.pipeline.audio_language, AudioLanguage::Fixed);
    assert_eq!(config.pipeline.audio_fixed_language, Language::Es);
    assert!(!config.pipeline.strict_languages);
    assert_eq!(
        config.providers.fetch.proxy_url.as_deref(),
        Some("https://api.allorigins.win/get")
    );
    Ok(())
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("NEWSDESK_SERVER__PORT", "9090");
    }

    let config = load(&["--port", "6060", "--host", "0.0.0.0", "--log-json", "true"]);
    assert_eq!(config.server.port, 6060);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.logging.json);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["newsdesk", "--config", "/nonexistent/newsdesk.yaml"]);
    assert!(result.is_err());
}
