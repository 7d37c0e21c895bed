/// Configuration management for the content store
///
/// Loads configuration from environment variables with sensible defaults.
/// A `.env` file in the working directory is honoured by the binary.
use crate::media::{MediaLimits, DEFAULT_MAX_ATTACHMENTS, DEFAULT_MAX_INLINE_IMAGE_BYTES};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Default storage quota per profile (5 MiB, the usual browser allowance)
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub env: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub profile_dir: PathBuf,
    /// `0` disables the quota
    pub quota_bytes: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MediaConfig {
    pub max_attachments: usize,
    pub max_inline_image_bytes: usize,
}

impl MediaConfig {
    pub fn limits(&self) -> MediaLimits {
        MediaLimits {
            max_attachments: self.max_attachments,
            max_inline_image_bytes: self.max_inline_image_bytes,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PolicyConfig {
    /// Extra denylist terms, one per line
    pub denylist_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let max_attachments =
            parse_env_or_default("COMMUNITY_MAX_ATTACHMENTS", DEFAULT_MAX_ATTACHMENTS)?;
        if max_attachments == 0 {
            return Err("COMMUNITY_MAX_ATTACHMENTS must be at least 1".to_string());
        }

        let app = AppConfig {
            env: std::env::var("COMMUNITY_ENV").unwrap_or_else(|_| "development".to_string()),
        };
        // Production logs default to JSON for collectors.
        let default_format = if app.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        Ok(Config {
            app,
            storage: StorageConfig {
                profile_dir: std::env::var("COMMUNITY_PROFILE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/profile")),
                quota_bytes: parse_env_or_default(
                    "COMMUNITY_STORAGE_QUOTA_BYTES",
                    DEFAULT_STORAGE_QUOTA_BYTES,
                )?,
            },
            media: MediaConfig {
                max_attachments,
                max_inline_image_bytes: parse_env_or_default(
                    "COMMUNITY_MAX_INLINE_IMAGE_BYTES",
                    DEFAULT_MAX_INLINE_IMAGE_BYTES,
                )?,
            },
            policy: PolicyConfig {
                denylist_path: std::env::var("COMMUNITY_DENYLIST_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            },
            logging: LoggingConfig {
                format: parse_env_or_default("COMMUNITY_LOG_FORMAT", default_format)?,
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid {}: {}", key, e)),
        _ => Ok(default),
    }
}
