use crate::http::cookies::CookieConfig;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub cookies: CookieConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to find configuration file at {0}")]
    FileNotFound(PathBuf),
    #[error("Unable to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Configuration file is not valid toml: {0}")]
    FileFormatSyntaxError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<AppConfig, Error> {
    let mut result = AppConfig::default();

    let Some(config_path) = path else {
        return Ok(result);
    };
    let config_path = config_path.as_ref();

    if !config_path.is_file() {
        return Err(Error::FileNotFound(config_path.to_path_buf()));
    }
    let config = std::fs::read_to_string(config_path)?;
    let toml = toml::from_str::<toml::Value>(&config)?;

    if let Some(cookies) = toml.get("cookies") {
        let cookies = cookies.as_table().ok_or(Error::InvalidConfiguration(
            "cookies must be a table".into(),
        ))?;
        if let Some(domain) = cookies.get("domain") {
            let domain = domain.as_str().ok_or(Error::InvalidConfiguration(
                "cookies.domain must be a string".into(),
            ))?;
            result.cookies.default_domain = Some(domain.to_string());
        }
    }

    log::debug!("Loaded configuration from {}", config_path.display());
    Ok(result)
}
