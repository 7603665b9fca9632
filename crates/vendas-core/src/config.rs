use std::env;
use std::time::Duration;

use crate::context::ContextPolicy;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_PORT: &str = "3001";
const DEFAULT_MAX_CONTEXT_BYTES: usize = 131_072;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration, read from the environment.
///
/// Missing credentials never prevent construction; the collaborators that
/// need them degrade instead (empty spreadsheet set, failing analyze calls).
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub drive_token: Option<String>,
    pub drive_folder_id: Option<String>,
    pub bind_addr: String,
    /// Empty list means any origin is allowed
    pub allowed_origins: Vec<String>,
    pub context_policy: ContextPolicy,
    pub max_context_bytes: usize,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = env_opt("BIND_ADDR").unwrap_or_else(|| {
            let port = env_opt("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("127.0.0.1:{port}")
        });

        let context_policy = match env_opt("CONTEXT_ROWS") {
            Some(value) => parse_context_policy(&value).unwrap_or_else(|| {
                log::warn!("unrecognized CONTEXT_ROWS value {value:?}, using all rows");
                ContextPolicy::Exhaustive
            }),
            None => ContextPolicy::Exhaustive,
        };

        Self {
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_model: env_opt("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            drive_token: env_opt("DRIVE_ACCESS_TOKEN"),
            drive_folder_id: env_opt("DRIVE_FOLDER_ID"),
            bind_addr,
            allowed_origins: parse_origins(&env_opt("ALLOWED_ORIGINS").unwrap_or_default()),
            context_policy,
            max_context_bytes: env_opt("MAX_CONTEXT_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONTEXT_BYTES),
            request_timeout: Duration::from_secs(
                env_opt("REQUEST_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// "all" keeps every data row in the context; a number samples the first N
/// rows per sheet. Sampling bounds the payload but makes aggregate answers
/// unreliable, so the sheet dump is labeled accordingly.
pub fn parse_context_policy(value: &str) -> Option<ContextPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "all" => Some(ContextPolicy::Exhaustive),
        other => other.parse::<usize>().ok().map(ContextPolicy::Sample),
    }
}

pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_policy_all_is_exhaustive() {
        assert_eq!(parse_context_policy("all"), Some(ContextPolicy::Exhaustive));
        assert_eq!(parse_context_policy(" ALL "), Some(ContextPolicy::Exhaustive));
    }

    #[test]
    fn context_policy_number_is_sample() {
        assert_eq!(parse_context_policy("5"), Some(ContextPolicy::Sample(5)));
    }

    #[test]
    fn context_policy_garbage_is_none() {
        assert_eq!(parse_context_policy("lots"), None);
        assert_eq!(parse_context_policy(""), None);
    }

    #[test]
    fn origins_split_and_trimmed() {
        let origins = parse_origins("http://localhost:5173, https://vendas.example.com ,");
        assert_eq!(
            origins,
            vec!["http://localhost:5173".to_string(), "https://vendas.example.com".to_string()]
        );
    }

    #[test]
    fn wildcard_origins_mean_any() {
        assert!(parse_origins("*").is_empty());
        assert!(parse_origins("").is_empty());
    }
}
