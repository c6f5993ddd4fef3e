//! tenant-billing server binary.
//!
//! Loads configuration, connects to PostgreSQL, wires the billing handlers
//! and serves the webhook endpoint.

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tenant_billing::adapters::http::{billing_router, BillingAppState};
use tenant_billing::adapters::identity::HttpIdentityService;
use tenant_billing::adapters::mercadopago::MercadoPagoAdapter;
use tenant_billing::adapters::postgres::{
    PostgresLeadRepository, PostgresLedgerRepository, PostgresTenantOwnerRepository,
    PostgresTenantRepository, PostgresTenantSetupRepository,
};
use tenant_billing::application::{BillingPorts, DispatchWebhookHandler, ProvisioningSettings};
use tenant_billing::config::{AppConfig, ServerConfig};
use tenant_billing::domain::billing::WebhookSignatureVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let ports = BillingPorts {
        owners: Arc::new(PostgresTenantOwnerRepository::new(pool.clone())),
        tenants: Arc::new(PostgresTenantRepository::new(pool.clone())),
        ledger: Arc::new(PostgresLedgerRepository::new(pool.clone())),
        leads: Arc::new(PostgresLeadRepository::new(pool.clone())),
        setup: Arc::new(PostgresTenantSetupRepository::new(pool)),
        provider: Arc::new(MercadoPagoAdapter::from_config(&config.provider)?),
        identity: Arc::new(HttpIdentityService::from_config(&config.identity)?),
    };
    let settings = ProvisioningSettings {
        schedule: config.provisioning.schedule_defaults()?,
        currency_label: config.provisioning.currency_label.clone(),
    };

    let mut dispatcher = DispatchWebhookHandler::from_ports(ports, settings);
    match &config.provider.webhook_secret {
        Some(secret) => {
            dispatcher = dispatcher.with_signature_verifier(WebhookSignatureVerifier::new(
                secret.clone(),
                config.provider.signature_tolerance_secs,
            ));
        }
        None => tracing::warn!("No webhook secret configured; signatures are not checked"),
    }

    let app: Router = billing_router(BillingAppState::new(Arc::new(dispatcher)))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "tenant-billing listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));

    if server.environment.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .init();
    }
}
