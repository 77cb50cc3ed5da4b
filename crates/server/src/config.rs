use std::path::PathBuf;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub oidc_issuer_url: String,
    pub media_root: PathBuf,
    pub media_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            oidc_issuer_url: std::env::var("OIDC_ISSUER_URL")
                .map_err(|_| "OIDC_ISSUER_URL is not set".to_string())?,
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("storage/media")),
            media_base_url: std::env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "/media".to_string()),
        })
    }
}
