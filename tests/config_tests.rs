use std::collections::HashMap;

use tims_insight::config::{InsightConfig, DEFAULT_API_BASE};
use tims_insight::error::Error;
use tims_insight::providers::GeminiClient;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
{   let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_defaults()
{   let config = InsightConfig::default();
    assert_eq!(config.api_base, DEFAULT_API_BASE);
    assert_eq!(config.model_cache_ttl_secs, 3600);
    assert_eq!(config.generation.max_output_tokens, 200);
    assert_eq!(config.failover.max_discovered_attempts, 3);
    assert_eq!(
      config.require_api_key()
    , Err(Error::Configuration("API key not configured".to_string()))
    );
}

#[test]
fn test_env_overlay()
{   let config = InsightConfig::default().with_env(env(&[
      ("gemini_api_key", "lower-key")
    , ("GEMINI_MODEL", "  gemini-2.0-pro ")
    , ("GEMINI_API_BASE", "http://localhost:9000/v1beta/")
    , ("TIMS_REQUEST_TIMEOUT_SECS", "12")
    , ("TIMS_MODEL_CACHE_TTL_SECS", "soon")
    ]));

    assert_eq!(config.require_api_key(), Ok("lower-key"));
    assert_eq!(config.model.as_deref(), Some("gemini-2.0-pro"));
    assert_eq!(config.api_base, "http://localhost:9000/v1beta");
    assert_eq!(config.request_timeout_secs, 12);
    assert_eq!(config.model_cache_ttl_secs, 3600);
}

#[test]
fn test_upper_case_key_wins_and_blank_is_ignored()
{   let config = InsightConfig::default().with_env(env(&[
      ("GEMINI_API_KEY", "upper")
    , ("gemini_api_key", "lower")
    , ("GEMINI_MODEL", "   ")
    ]));
    assert_eq!(config.api_key.as_deref(), Some("upper"));
    assert_eq!(config.model, None);
}

#[test]
fn test_debug_redacts_key()
{   let config = InsightConfig::default().with_env(env(&[("GEMINI_API_KEY", "s3cret")]));
    assert!(!format!("{:?}", config).contains("s3cret"));

    let client = GeminiClient::from_config(&config).unwrap();
    assert!(!format!("{:?}", client).contains("s3cret"));
}

#[test]
fn test_partial_json_file()
{   let path = std::env::temp_dir()
      .join(format!("tims-insight-config-{}.json", std::process::id()));
    std::fs::write(
      &path
    , r#"{ "model": "gemini-1.5-flash", "generation": { "temperature": 0.2 } }"#
    ).unwrap();

    let config = InsightConfig::from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.model.as_deref(), Some("gemini-1.5-flash"));
    assert_eq!(config.generation.temperature, 0.2);
    assert_eq!(config.generation.max_output_tokens, 200);
    assert_eq!(config.bind, "0.0.0.0:3000");
}

#[test]
fn test_missing_file_is_configuration_error()
{   let err = InsightConfig::from_file(std::path::Path::new("/nonexistent/tims.json"))
      .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
