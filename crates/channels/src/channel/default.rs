use super::error::ChannelError;
use super::factory::ChannelFactory;
use super::settings::ChannelSettings;
use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use tracing::warn;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub fn default_client() -> Result<Client, ChannelError> {
    create_client(None)
}

pub fn create_client(proxy_config: Option<ProxyConfig>) -> Result<Client, ChannelError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ChannelError::Other(format!("tls protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ChannelError::Other(format!("tls platform verifier: {e}")))?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .timeout(std::time::Duration::from_secs(30));

    if let Some(config) = proxy_config {
        match reqwest::Proxy::all(&config.url) {
            Ok(mut proxy) => {
                if let (Some(username), Some(password)) = (config.username, config.password) {
                    proxy = proxy.basic_auth(&username, &password);
                }
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                warn!("Failed to configure proxy '{}': {}", config.url, e);
            }
        }
    }

    Ok(builder.build()?)
}

/// Returns a new `ChannelFactory` with default settings for every channel.
pub fn default_factory() -> Result<ChannelFactory, ChannelError> {
    let client = default_client()?;
    Ok(ChannelFactory::new(client, ChannelSettings::default()))
}

/// Returns a new `ChannelFactory` with proxy support and the given settings.
pub fn factory_with_proxy(
    proxy_config: Option<ProxyConfig>,
    settings: ChannelSettings,
) -> Result<ChannelFactory, ChannelError> {
    let client = create_client(proxy_config)?;
    Ok(ChannelFactory::new(client, settings))
}
