use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::{Error, Result};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the `reqwest::Client` used for webhook delivery.
///
/// `request_timeout` bounds the whole request, connect included. With
/// `use_system_proxy = false` the `HTTP(S)_PROXY` environment is ignored.
pub fn build_webhook_client(
    request_timeout: Duration,
    use_system_proxy: bool,
) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(request_timeout);

    if !use_system_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))
}
