//! axum routes for webhook delivery and health checks.

use super::{
    NormalizedEvent, SIGNATURE_HEADER, SignatureVerdict, WebhookEnvelope, normalize,
    verify_signature,
};
use crate::integration::domain::Integration;
use crate::integration::ports::IntegrationRepository;
use crate::queue::domain::Job;
use crate::queue::ports::{JobQueue, QueueError};
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use mockable::Clock;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared state for the webhook routes.
pub struct WebhookState<R, Q, C>
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    integrations: Arc<R>,
    queue: Arc<Q>,
    clock: Arc<C>,
    max_body_bytes: usize,
}

impl<R, Q, C> Clone for WebhookState<R, Q, C>
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            integrations: Arc::clone(&self.integrations),
            queue: Arc::clone(&self.queue),
            clock: Arc::clone(&self.clock),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<R, Q, C> WebhookState<R, Q, C>
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates the route state.
    #[must_use]
    pub const fn new(
        integrations: Arc<R>,
        queue: Arc<Q>,
        clock: Arc<C>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            integrations,
            queue,
            clock,
            max_body_bytes,
        }
    }
}

/// Builds the router serving `POST /webhook` and `GET /health`.
pub fn router<R, Q, C>(state: WebhookState<R, Q, C>) -> Router
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/webhook", post(receive_webhook::<R, Q, C>))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn receive_webhook<R, Q, C>(
    State(state): State<WebhookState<R, Q, C>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    // The destination names the signing secret, so an unparseable body is
    // rejected as malformed before any signature check.
    let envelope = match WebhookEnvelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, bytes = body.len(), "malformed webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let integration = match resolve_integration(&state, envelope.destination.as_deref()).await
    {
        Ok(integration) => integration,
        Err(status) => return status,
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if verify_signature(integration.signing_secret(), &body, signature) == SignatureVerdict::Invalid
    {
        warn!(integration_id = %integration.id(), "webhook signature rejected");
        return StatusCode::UNAUTHORIZED;
    }

    if let Err(err) = state
        .integrations
        .record_webhook_received(integration.id(), state.clock.utc())
        .await
    {
        warn!(integration_id = %integration.id(), error = %err, "failed to stamp webhook receipt");
    }

    match enqueue_events(&state, &integration, &envelope).await {
        Ok(enqueued) => {
            info!(integration_id = %integration.id(), enqueued, "webhook accepted");
            StatusCode::OK
        }
        Err(err) => {
            error!(integration_id = %integration.id(), error = %err, "failed to enqueue webhook events");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// An unknown destination is an authentication failure; a failed lookup is
/// an internal error.
async fn resolve_integration<R, Q, C>(
    state: &WebhookState<R, Q, C>,
    destination: Option<&str>,
) -> Result<Integration, StatusCode>
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Some(channel_id) = destination else {
        warn!("webhook without destination rejected");
        return Err(StatusCode::UNAUTHORIZED);
    };
    match state.integrations.find_by_channel_id(channel_id).await {
        Ok(Some(integration)) => Ok(integration),
        Ok(None) => {
            warn!(destination = channel_id, "webhook for unknown destination rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(err) => {
            error!(destination = channel_id, error = %err, "integration lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn enqueue_events<R, Q, C>(
    state: &WebhookState<R, Q, C>,
    integration: &Integration,
    envelope: &WebhookEnvelope,
) -> Result<usize, QueueError>
where
    R: IntegrationRepository + 'static,
    Q: JobQueue + 'static,
    C: Clock + Send + Sync + 'static,
{
    let integration_id = integration.id();
    let mut enqueued = 0;
    for normalized in normalize(envelope) {
        let job = match normalized {
            NormalizedEvent::Message(event) => Job::ProcessMessage {
                integration_id,
                event,
            },
            NormalizedEvent::Membership(event) => Job::SyncMembership {
                integration_id,
                event,
            },
            NormalizedEvent::Ignored { event_type } => {
                debug!(%integration_id, %event_type, "no job for event");
                continue;
            }
        };
        let job_id = state.queue.enqueue(&job).await?;
        debug!(%integration_id, %job_id, kind = job.kind(), "job enqueued");
        enqueued += 1;
    }
    Ok(enqueued)
}
