//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::warn;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use backend::ApiDoc;
use backend::RequestTrace;
use backend::domain::ports::{
    FixtureGateway, FixtureIdentityVerifier, IdentityVerifier, OrderService, StaticRateSource,
    VerificationService,
};
use backend::domain::{GatewaySecret, OrderServiceImpl, VerificationServiceImpl};
use backend::inbound::http::account::current_account;
use backend::inbound::http::health::{HealthState, live, ready};
use backend::inbound::http::payments::{checkout_descriptor, create_order, verify_payment};
use backend::inbound::http::state::HttpState;
use backend::outbound::gateway::HttpPaymentGateway;
use backend::outbound::identity::JwtIdentityVerifier;
use backend::outbound::persistence::{InMemoryCreditLedger, InMemoryOrderStore};

/// Wire the configured adapters into the handler state.
///
/// Orders and verification records live in the in-memory store; the credit
/// ledger records grants in-process. Durable adapters slot in behind the
/// same ports without touching the handlers.
fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let store = Arc::new(InMemoryOrderStore::new());
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let rates = Arc::new(StaticRateSource::policy_2024_01());

    let orders: Arc<dyn OrderService> = match &config.gateway_base_url {
        Some(base_url) => {
            let gateway = HttpPaymentGateway::new(
                base_url,
                config.credentials.clone(),
                config.gateway_timeout,
            )
            .map_err(|err| std::io::Error::other(format!("gateway client: {err}")))?;
            Arc::new(OrderServiceImpl::new(
                Arc::new(gateway),
                store.clone(),
                rates,
                config.catalogue.clone(),
            ))
        }
        None => {
            warn!("no gateway base URL configured; registering orders against the fixture gateway");
            Arc::new(OrderServiceImpl::new(
                Arc::new(FixtureGateway::default()),
                store.clone(),
                rates,
                config.catalogue.clone(),
            ))
        }
    };

    let verification: Arc<dyn VerificationService> = Arc::new(VerificationServiceImpl::new(
        store,
        ledger,
        GatewaySecret::new(config.credentials.key_secret.as_str()),
    ));

    let identity: Arc<dyn IdentityVerifier> = match &config.identity {
        Some(identity_config) => Arc::new(JwtIdentityVerifier::new(identity_config)),
        None => {
            warn!("no identity authority configured; presented credentials will be rejected");
            Arc::new(FixtureIdentityVerifier::default())
        }
    };

    Ok(HttpState::new(
        config.provider.clone(),
        orders,
        verification,
        identity,
    ))
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let api = web::scope("/api")
        .service(create_order)
        .service(verify_payment)
        .service(checkout_descriptor)
        .service(current_account);

    #[cfg_attr(not(debug_assertions), expect(unused_mut, reason = "swagger is debug-only"))]
    let mut app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(RequestTrace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    {
        app = app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app
}

/// Build the configured application and serve it until shutdown.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let http_state = web::Data::new(build_http_state(&config)?);
    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(config.bind_addr)?;

    health_state.mark_ready();
    server.run().await
}
