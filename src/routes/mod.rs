pub mod campaigns;
pub mod estimates;
pub mod health;
pub mod training;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Estimates
        .route("/estimates", post(estimates::create_estimate))
        .route("/estimates/preview", post(estimates::preview_estimate))
        .route("/estimates/:estimate_id", get(estimates::get_estimate))
        .route(
            "/estimates/:estimate_id/line-items",
            get(estimates::list_line_items),
        )
        .route(
            "/estimates/:estimate_id/revisions",
            post(estimates::revise_estimate),
        )
        .route("/estimates/:estimate_id/send", post(estimates::send_estimate))
        .route(
            "/estimates/:estimate_id/approval",
            post(estimates::record_approval),
        )
        // Training
        .route("/training/modules", get(training::list_modules))
        .route(
            "/training/modules/:module_id/progress",
            get(training::get_progress)
                .post(training::record_progress)
                .delete(training::reset_progress),
        )
        // Campaigns
        .route("/campaigns", get(campaigns::list_campaigns))
        .route("/campaigns/summary", get(campaigns::campaign_summary))
        .route("/campaigns/:campaign_id", get(campaigns::get_campaign))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::app::{create_app, AppState};
    use crate::auth::Claims;
    use crate::config::Settings;
    use crate::services::{InMemoryCampaignRepository, MemoryStore};

    const SECRET: &str = "test-secret";

    pub fn app() -> Router {
        let state = AppState::new(
            Settings::for_tests(SECRET),
            Arc::new(MemoryStore::new()),
            Arc::new(InMemoryCampaignRepository::seeded()),
            None,
        );
        create_app(state)
    }

    pub fn token(user_id: &str) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            aud: "authenticated".to_string(),
            iss: None,
            iat: Some(chrono::Utc::now().timestamp()),
            exp: chrono::Utc::now().timestamp() + 3600,
            email: Some(format!("{}@example.com", user_id)),
            role: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    /// Send a request as `user` (anonymous when `None`) and decode the
    /// JSON body, `Value::Null` when empty
    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
