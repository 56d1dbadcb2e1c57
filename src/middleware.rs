use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::key_extractor::ClientKeyExtractor;
use crate::rate_limiter::{AdmitDecision, RateLimitPolicy};
use crate::registry::LimiterRegistry;

/// Per-request admission check placed in front of every route.
///
/// Derives the client key, charges it in the registry and either lets the
/// request through untouched or answers it with a 429.
pub struct RequestGate {
    extractor: ClientKeyExtractor,
    registry: Arc<LimiterRegistry>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    rejection_body: String,
}

impl RequestGate {
    pub fn new(
        extractor: ClientKeyExtractor,
        registry: Arc<LimiterRegistry>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self::with_clock(extractor, registry, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        extractor: ClientKeyExtractor,
        registry: Arc<LimiterRegistry>,
        policy: RateLimitPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rejection_body = rejection_message(&policy);
        Self {
            extractor,
            registry,
            policy,
            clock,
            rejection_body,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Charge `request` to its client key.
    pub fn check(&self, request: &Request) -> (String, AdmitDecision) {
        let key = self.extractor.extract(request);
        let decision = self.admit_key(&key);
        (key, decision)
    }

    /// Charge one request directly to `key`.
    pub fn admit_key(&self, key: &str) -> AdmitDecision {
        self.registry.admit(key, self.clock.now(), &self.policy)
    }

    /// The terminal response for a rejected request.
    pub fn rejection_response(&self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, Json(&self.rejection_body)).into_response()
    }
}

/// Advisory text sent with every 429, e.g.
/// `Too many requests, please try again later. (120 reqs/min/IP)`.
pub fn rejection_message(policy: &RateLimitPolicy) -> String {
    format!("Too many requests, please try again later. ({}/IP)", policy)
}

/// Rate limiting middleware; use with `from_fn_with_state`.
pub async fn rate_limit_middleware(
    State(gate): State<Arc<RequestGate>>,
    request: Request,
    next: Next,
) -> Response {
    let (key, decision) = gate.check(&request);

    match decision {
        AdmitDecision::Allowed => next.run(request).await,
        AdmitDecision::Rejected => {
            debug!(
                target: "naas::middleware",
                client = %key,
                limit = gate.policy().permit_limit(),
                "Rate limit exceeded"
            );
            gate.rejection_response()
        }
    }
}

/// Logging middleware for request/response tracking
pub async fn logging_middleware(
    State(gate): State<Arc<RequestGate>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();
    let client = gate.extractor.extract(&request);

    info!(
        target: "naas::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        client = %client,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "naas::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    response
}
