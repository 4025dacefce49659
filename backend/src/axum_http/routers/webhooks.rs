use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use billing::domain::repositories::{
    payments::PaymentRepository, payouts::PayoutRepository, plans::PlanRepository,
    subscriptions::SubscriptionRepository, users::UserRepository,
};
use tracing::{error, info, warn};

use crate::usecases::{
    payouts::PayoutUseCase,
    subscriptions::{SubscriptionError, SubscriptionUseCase},
};

/// Inbound reconciliation surface. Signature failures are rejected; every
/// other internal failure is logged and acknowledged as success, because most
/// provider webhook protocols treat a non-2xx response as "retry forever".
pub fn routes<P, S, Pay, U, PO>(
    subscription_usecase: Arc<SubscriptionUseCase<P, S, Pay, U>>,
    payout_usecase: Arc<PayoutUseCase<PO, U, P, S, Pay>>,
) -> Router
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PO: PayoutRepository + Send + Sync + 'static,
{
    Router::new()
        .merge(
            Router::new()
                .route("/razorpay", post(razorpay_webhook))
                .route("/paynpro", post(paynpro_webhook))
                .with_state(subscription_usecase),
        )
        .merge(
            Router::new()
                .route("/paynpro-payout", post(paynpro_payout_webhook))
                .with_state(payout_usecase),
        )
}

pub async fn razorpay_webhook<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    info!("webhooks: razorpay delivery received");

    let signature = match headers
        .get("X-Razorpay-Signature")
        .and_then(|value| value.to_str().ok())
    {
        Some(signature) => signature,
        None => {
            warn!("webhooks: razorpay delivery missing signature header");
            return (StatusCode::BAD_REQUEST, "Missing signature").into_response();
        }
    };

    ack_or_reject(
        "razorpay",
        usecase.handle_razorpay_webhook(&body, signature).await,
    )
}

pub async fn paynpro_webhook<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    Json(payload): Json<serde_json::Value>,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    info!(payload = %payload, "webhooks: paynpro delivery received");

    ack_or_reject("paynpro", usecase.handle_paynpro_webhook(payload).await)
}

pub async fn paynpro_payout_webhook<P, S, Pay, U, PO>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, P, S, Pay>>>,
    Json(payload): Json<serde_json::Value>,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PO: PayoutRepository + Send + Sync + 'static,
{
    info!(payload = %payload, "webhooks: paynpro payout delivery received");

    match usecase.handle_payout_webhook(payload).await {
        Ok(()) => (StatusCode::OK, "SUCCESS").into_response(),
        Err(err) => {
            error!(error = ?err, "webhooks: payout webhook processing failed");
            (StatusCode::OK, "ERROR").into_response()
        }
    }
}

/// Authentication failures bounce; everything else acknowledges so the
/// sender stops redelivering a payload we already know we cannot use.
fn ack_or_reject(label: &str, result: Result<(), SubscriptionError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, "Webhook processed successfully").into_response(),
        Err(err @ SubscriptionError::SignatureRejected) => {
            warn!(
                webhook = label,
                status = err.status_code().as_u16(),
                "webhooks: rejected unauthenticated delivery"
            );
            (err.status_code(), "Invalid signature").into_response()
        }
        Err(err) => {
            error!(
                webhook = label,
                error = %err,
                "webhooks: processing failed, acknowledging to stop retries"
            );
            (StatusCode::OK, "OK").into_response()
        }
    }
}
