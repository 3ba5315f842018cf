//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use backend::domain::PackageCatalog;
use backend::outbound::gateway::{DEFAULT_GATEWAY_TIMEOUT, GatewayCredentials};
use backend::outbound::identity::JwtVerifierConfig;
use url::Url;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) provider: String,
    pub(crate) credentials: GatewayCredentials,
    pub(crate) gateway_base_url: Option<Url>,
    pub(crate) gateway_timeout: Duration,
    pub(crate) identity: Option<JwtVerifierConfig>,
    pub(crate) catalogue: PackageCatalog,
}

impl ServerConfig {
    /// Construct a configuration with the fixture gateway and no identity
    /// authority; attach both for production use.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        provider: impl Into<String>,
        credentials: GatewayCredentials,
        catalogue: PackageCatalog,
    ) -> Self {
        Self {
            bind_addr,
            provider: provider.into(),
            credentials,
            gateway_base_url: None,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            identity: None,
            catalogue,
        }
    }

    /// Register orders against a real provider endpoint.
    #[must_use]
    pub fn with_gateway_base_url(mut self, base_url: Url) -> Self {
        self.gateway_base_url = Some(base_url);
        self
    }

    /// Override the deadline for calls into the provider.
    #[must_use]
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Verify bearer credentials against a real identity authority.
    #[must_use]
    pub fn with_identity(mut self, identity: JwtVerifierConfig) -> Self {
        self.identity = Some(identity);
        self
    }
}
