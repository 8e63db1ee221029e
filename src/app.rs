use axum::{
    http::{HeaderName, HeaderValue, Method},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::domain::progress::ModuleCatalog;
use crate::routes;
use crate::services::{
    CampaignRepository, Estimator, KeyValueStore, PricingTable, ProgressTracker,
};

/// Header carrying the request ID
pub const X_REQUEST_ID: &str = "x-request-id";

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub estimator: Estimator,
    pub store: Arc<dyn KeyValueStore>,
    pub progress: ProgressTracker,
    pub campaigns: Arc<dyn CampaignRepository>,
    pub verifier: TokenVerifier,
    /// Present when campaigns are served from Postgres
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        campaigns: Arc<dyn CampaignRepository>,
        db: Option<PgPool>,
    ) -> Arc<Self> {
        let estimator = Estimator::new(PricingTable::standard(), settings.estimate_validity_days);
        let progress = ProgressTracker::new(
            store.clone(),
            Arc::new(ModuleCatalog::onboarding_program()),
        );
        let verifier = TokenVerifier::new(
            &settings.jwt_secret,
            settings.jwt_issuer.as_deref(),
            &settings.jwt_audience,
        );

        Arc::new(Self {
            settings,
            estimator,
            store,
            progress,
            campaigns,
            verifier,
            db,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // DEBUG spans keep INFO output quiet
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let request_id = HeaderName::from_static(X_REQUEST_ID);
    let body_limit = RequestBodyLimitLayer::new(state.settings.max_body_bytes);

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(body_limit)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace_layer)
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Longer preflight cache in development
    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            HeaderName::from_static(X_REQUEST_ID),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
