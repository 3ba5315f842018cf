//! Backend entry-point: environment configuration and server bootstrap.

mod server;

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use backend::domain::{PackageCatalog, PackageId};
use backend::outbound::gateway::GatewayCredentials;
use backend::outbound::identity::JwtVerifierConfig;
use server::ServerConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PROVIDER: &str = "razorpay";
const DEFAULT_CATALOGUE: &str = "starter-pack,scholar-pack,mastery-pack";

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = config_from_env()?;
    server::run(config).await
}

fn config_from_env() -> std::io::Result<ServerConfig> {
    let bind_addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.into())
        .parse()
        .map_err(|err| std::io::Error::other(format!("invalid BIND_ADDR: {err}")))?;
    let provider = env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| DEFAULT_PROVIDER.into());
    let catalogue = catalogue_from_env()?;

    let mut config = ServerConfig::new(bind_addr, provider, credentials_from_env()?, catalogue);

    match env::var("GATEWAY_BASE_URL") {
        Ok(raw) => {
            let base_url = Url::parse(&raw)
                .map_err(|err| std::io::Error::other(format!("invalid GATEWAY_BASE_URL: {err}")))?;
            config = config.with_gateway_base_url(base_url);
        }
        Err(_) => {
            warn!("GATEWAY_BASE_URL not set; orders will use the fixture gateway (dev only)");
        }
    }
    if let Ok(raw) = env::var("GATEWAY_TIMEOUT_SECS") {
        let secs: u64 = raw
            .parse()
            .map_err(|err| std::io::Error::other(format!("invalid GATEWAY_TIMEOUT_SECS: {err}")))?;
        config = config.with_gateway_timeout(Duration::from_secs(secs));
    }
    if let Some(identity) = identity_from_env()? {
        config = config.with_identity(identity);
    }
    Ok(config)
}

/// Gateway key pair, with a logged dev fallback mirroring the identity
/// handling: release builds must configure real credentials.
fn credentials_from_env() -> std::io::Result<GatewayCredentials> {
    match (env::var("GATEWAY_KEY_ID"), env::var("GATEWAY_KEY_SECRET")) {
        (Ok(key_id), Ok(key_secret)) => Ok(GatewayCredentials::new(key_id, key_secret)),
        _ => {
            let allow_dev = env::var("GATEWAY_ALLOW_DEV").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!("gateway credentials not set; using dev credentials (dev only)");
                Ok(GatewayCredentials::new("rzp_test_dev", "dev-gateway-secret"))
            } else {
                Err(std::io::Error::other(
                    "GATEWAY_KEY_ID and GATEWAY_KEY_SECRET must be set",
                ))
            }
        }
    }
}

fn identity_from_env() -> std::io::Result<Option<JwtVerifierConfig>> {
    let issuer = env::var("IDENTITY_ISSUER").ok();
    let audience = env::var("IDENTITY_AUDIENCE").ok();
    let shared_secret = env::var("IDENTITY_SHARED_SECRET").ok();
    let (issuer, audience, shared_secret) = match (issuer, audience, shared_secret) {
        (Some(issuer), Some(audience), Some(shared_secret)) => (issuer, audience, shared_secret),
        (None, None, None) => {
            warn!("identity authority not configured; presented credentials will be rejected");
            return Ok(None);
        }
        _ => {
            return Err(std::io::Error::other(
                "IDENTITY_ISSUER, IDENTITY_AUDIENCE, and IDENTITY_SHARED_SECRET must be set together",
            ));
        }
    };

    let mut identity = JwtVerifierConfig::new(issuer, audience, shared_secret);
    if let Ok(raw) = env::var("IDENTITY_LEEWAY_SECS") {
        let leeway: u64 = raw
            .parse()
            .map_err(|err| std::io::Error::other(format!("invalid IDENTITY_LEEWAY_SECS: {err}")))?;
        identity = identity.with_leeway_secs(leeway);
    }
    if let Ok(raw) = env::var("IDENTITY_REVOKED_TOKEN_IDS") {
        let revoked: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|jti| !jti.is_empty())
            .map(str::to_owned)
            .collect();
        for jti in revoked {
            identity = identity.with_revoked_token(jti);
        }
    }
    Ok(Some(identity))
}

fn catalogue_from_env() -> std::io::Result<PackageCatalog> {
    let raw = env::var("PACKAGE_CATALOG").unwrap_or_else(|_| DEFAULT_CATALOGUE.into());
    let mut packages = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let package = PackageId::new(entry)
            .map_err(|err| std::io::Error::other(format!("invalid PACKAGE_CATALOG entry: {err}")))?;
        packages.push(package);
    }
    if packages.is_empty() {
        return Err(std::io::Error::other("PACKAGE_CATALOG must name at least one package"));
    }
    Ok(PackageCatalog::new(packages))
}
