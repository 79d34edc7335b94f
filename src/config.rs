//! Process configuration, read from the environment at startup.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::client::ClientConfig;
use crate::render::{BoxPolicy, RenderOptions};

pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000));
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set (in the environment or a .env file)")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub render: RenderOptions,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut client = ClientConfig::new(
            required("AI_SERVICE_ENDPOINT")?,
            required("AI_SERVICE_KEY")?,
        );
        client.timeout = parse::<u64>("AI_SERVICE_TIMEOUT_SECS", get("AI_SERVICE_TIMEOUT_SECS"))?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        client.language = get("AI_SERVICE_LANGUAGE");
        client.gender_neutral_caption = parse_bool(
            "AI_SERVICE_GENDER_NEUTRAL_CAPTION",
            get("AI_SERVICE_GENDER_NEUTRAL_CAPTION"),
        )?;

        let bind_addr = parse("BIND_ADDR", get("BIND_ADDR"))?.unwrap_or(DEFAULT_BIND_ADDR);
        let upload_dir = get("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let max_upload_bytes =
            parse("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"))?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let box_policy = match parse_bool("ANNOTATION_CLAMP_BOXES", get("ANNOTATION_CLAMP_BOXES"))? {
            Some(true) => BoxPolicy::Clamp,
            _ => BoxPolicy::Permissive,
        };

        Ok(Self {
            client,
            bind_addr,
            upload_dir,
            max_upload_bytes,
            render: RenderOptions { box_policy },
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v }))
        .transpose()
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: v }),
        })
        .transpose()
}
