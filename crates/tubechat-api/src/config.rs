use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use tubechat_llm::{LlmSettings, ProviderSettings};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "dev-secret-change-me",
    "your-secret-key-change-in-production",
];

/// Process configuration, read once at startup and handed to each
/// component.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub llm: LlmSettings,
    pub transcript_languages: Vec<String>,
    pub transcript_timeout: Duration,
    pub admin: Option<AdminSeed>,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("TUBECHAT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TUBECHAT_JWT_SECRET is unset or still a placeholder");
        }

        let token_ttl_minutes: i64 = parse(&var, "TUBECHAT_TOKEN_TTL_MINUTES", 30)?;
        let llm_timeout_secs: u64 = parse(&var, "LLM_TIMEOUT_SECS", 120)?;
        let transcript_timeout_secs: u64 = parse(&var, "TRANSCRIPT_TIMEOUT_SECS", 30)?;

        let transcript_languages: Vec<String> = var_or("TRANSCRIPT_LANGUAGES", "en")
            .split(',')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        let admin = match (var("TUBECHAT_ADMIN_EMAIL"), var("TUBECHAT_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password,
                name: var_or("TUBECHAT_ADMIN_NAME", "Admin"),
            }),
            _ => None,
        };

        Ok(Self {
            host: var_or("TUBECHAT_HOST", "0.0.0.0"),
            port: parse(&var, "TUBECHAT_PORT", 8000)?,
            db_path: var_or("TUBECHAT_DB_PATH", "tubechat.db").into(),
            jwt_secret,
            token_ttl: chrono::Duration::minutes(token_ttl_minutes),
            llm: LlmSettings {
                openai: ProviderSettings {
                    api_key: var("OPENAI_API_KEY"),
                    model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
                    base_url: var("OPENAI_BASE_URL"),
                },
                anthropic: ProviderSettings {
                    api_key: var("ANTHROPIC_API_KEY"),
                    model: var_or("ANTHROPIC_MODEL", "claude-3-5-sonnet-20241022"),
                    base_url: var("ANTHROPIC_BASE_URL"),
                },
                temperature: parse(&var, "LLM_TEMPERATURE", 0.7)?,
                max_tokens: parse(&var, "LLM_MAX_TOKENS", 2000)?,
                timeout: Duration::from_secs(llm_timeout_secs),
            },
            transcript_languages,
            transcript_timeout: Duration::from_secs(transcript_timeout_secs),
            admin,
        })
    }
}

fn parse<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("TUBECHAT_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.token_ttl, chrono::Duration::minutes(30));
        assert_eq!(cfg.llm.max_tokens, 2000);
        assert_eq!(cfg.llm.openai.model, "gpt-4o-mini");
        assert!(cfg.llm.openai.api_key.is_none());
        assert_eq!(cfg.transcript_languages, vec!["en"]);
        assert!(cfg.admin.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(config(&[]).is_err());
        assert!(config(&[("TUBECHAT_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("TUBECHAT_JWT_SECRET", "s3cret"),
            ("TUBECHAT_PORT", "9000"),
            ("LLM_TEMPERATURE", "0.2"),
            ("TRANSCRIPT_LANGUAGES", "de, en"),
            ("TUBECHAT_ADMIN_EMAIL", "root@example.com"),
            ("TUBECHAT_ADMIN_PASSWORD", "hunter2hunter2"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.llm.temperature, 0.2);
        assert_eq!(cfg.transcript_languages, vec!["de", "en"]);
        assert_eq!(cfg.admin.unwrap().name, "Admin");
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = config(&[("TUBECHAT_JWT_SECRET", "s3cret"), ("TUBECHAT_PORT", "eighty")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("TUBECHAT_PORT"));
    }
}
