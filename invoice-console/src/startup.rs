//! Application startup and lifecycle management.

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use console_core::error::AppError;
use console_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::handlers::{self, invoices, notifications, parties, payments, records, transactions};
use crate::models::{
    BusinessOwner, CreateBusinessOwnerRequest, CreateCustomerRequest, CreateInvoiceRequest,
    Customer, Invoice, UpdateBusinessOwnerRequest, UpdateCustomerRequest, UpdateInvoiceRequest,
};
use crate::payments::{
    CacheInvalidationCoordinator, HostedCardForm, PaymentIntentRequester, PaymentWorkflow,
    RefundCoordinator, RefundRequester, StripeCardForm,
};
use crate::services::{init_metrics, BackendClient, Notifier, QueryCache, Records};
use crate::AppState;

/// Collaborators the console talks to. Tests swap in their own.
pub struct Collaborators {
    pub backend: BackendClient,
    pub card_form: Arc<dyn HostedCardForm>,
}

impl Collaborators {
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let backend = BackendClient::new(&settings.api)?;
        let card_form = StripeCardForm::new(&settings.processor).map_err(|e| {
            tracing::error!(error = %e, "Failed to build processor client");
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        Ok(Self {
            backend,
            card_form: Arc::new(card_form),
        })
    }
}

pub fn build_state(settings: Settings, collaborators: Collaborators) -> AppState {
    let Collaborators { backend, card_form } = collaborators;

    let cache = QueryCache::new(Arc::new(backend.clone()), settings.cache.stale_time());
    let records = Records::new(backend.clone(), cache.clone());
    let notifier = Notifier::default();
    let invalidation = CacheInvalidationCoordinator::new(cache, settings.payment.settle_delay());

    let intents: Arc<dyn PaymentIntentRequester> = Arc::new(backend.clone());
    let refunder: Arc<dyn RefundRequester> = Arc::new(backend);

    let workflow = PaymentWorkflow::new(
        records.clone(),
        intents,
        card_form,
        invalidation.clone(),
        notifier.clone(),
        &settings,
    );
    let refunds = RefundCoordinator::new(refunder, invalidation, notifier.clone());

    AppState {
        settings: Arc::new(settings),
        records,
        workflow,
        refunds,
        notifier,
    }
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-request-id")])
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/config", get(handlers::browser_config))
        // Invoices
        .route(
            "/invoices",
            get(records::list::<Invoice>)
                .post(records::create::<Invoice, CreateInvoiceRequest>),
        )
        .route(
            "/invoices/:id",
            get(records::get::<Invoice>)
                .put(records::update::<Invoice, UpdateInvoiceRequest>)
                .delete(records::delete::<Invoice>),
        )
        .route(
            "/invoices/:id/transactions",
            get(records::payment_history::<Invoice>),
        )
        .route("/invoices/:id/payment-link", get(invoices::get_payment_link))
        .route("/invoices/:id/payment-sessions", post(payments::open_session))
        // Customers
        .route(
            "/customers",
            get(records::list::<Customer>)
                .post(records::create::<Customer, CreateCustomerRequest>),
        )
        .route(
            "/customers/:id",
            get(records::get::<Customer>)
                .put(records::update::<Customer, UpdateCustomerRequest>)
                .delete(records::delete::<Customer>),
        )
        .route(
            "/customers/:id/transactions",
            get(records::payment_history::<Customer>),
        )
        .route("/customers/:id/stats", get(parties::customer_stats))
        // Business owners
        .route(
            "/business-owners",
            get(records::list::<BusinessOwner>)
                .post(records::create::<BusinessOwner, CreateBusinessOwnerRequest>),
        )
        .route(
            "/business-owners/:id",
            get(records::get::<BusinessOwner>)
                .put(records::update::<BusinessOwner, UpdateBusinessOwnerRequest>)
                .delete(records::delete::<BusinessOwner>),
        )
        .route(
            "/business-owners/:id/transactions",
            get(records::payment_history::<BusinessOwner>),
        )
        .route(
            "/business-owners/:id/stats",
            get(parties::business_owner_stats),
        )
        // Payment history and refunds
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/:id", get(transactions::get_transaction))
        .route(
            "/transactions/:id/refund",
            post(transactions::refund_transaction),
        )
        // Payment sessions
        .route(
            "/payment-sessions/:id",
            get(payments::get_session).delete(payments::close_session),
        )
        .route("/payment-sessions/:id/amount", put(payments::set_amount))
        .route("/payment-sessions/:id/pay", post(payments::pay))
        .route("/payment-sessions/:id/confirm", post(payments::confirm))
        .route("/payment-sessions/:id/retry", post(payments::retry))
        .route("/notifications", get(notifications::list_notifications));

    let cors = cors_layer(&state.settings);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = tracing::field::Empty,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self, AppError> {
        let collaborators = Collaborators::from_settings(&settings)?;
        Self::build_with(settings, collaborators).await
    }

    pub async fn build_with(
        settings: Settings,
        collaborators: Collaborators,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid server address: {}", e))
            })?;

        // Port 0 binds a random port for tests
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            api_base_url = %settings.api.base_url,
            processor_base_url = %settings.processor.api_base_url,
            "Invoice console configured"
        );

        let router = build_router(build_state(settings, collaborators));
        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(port = self.port, "Listening");
        axum::serve(self.listener, self.router).await
    }
}
