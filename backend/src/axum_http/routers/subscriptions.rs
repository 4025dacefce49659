use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use billing::domain::{
    repositories::{
        payments::PaymentRepository, plans::PlanRepository,
        subscriptions::SubscriptionRepository, users::UserRepository,
    },
    value_objects::enums::payment_gateways::PaymentGateway,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::error_response,
    usecases::subscriptions::SubscriptionUseCase,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateSubscriptionRequest {
    pub plan_id: Uuid,
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateSubscriptionRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub fn routes<P, S, Pay, U>(usecase: Arc<SubscriptionUseCase<P, S, Pay, U>>) -> Router
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/plans", get(list_plans))
        .route("/initiate", post(initiate))
        .route("/activate", post(activate))
        .route("/current", get(current_subscription))
        .with_state(usecase)
}

pub async fn list_plans<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    _auth: AuthUser,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.list_plans().await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn initiate<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    auth: AuthUser,
    Json(request): Json<InitiateSubscriptionRequest>,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let gateway_name = request.gateway.as_deref().unwrap_or("razorpay");
    let Some(gateway) = PaymentGateway::from_str(gateway_name) else {
        warn!(gateway = gateway_name, "subscriptions: unknown gateway requested");
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unknown gateway: {gateway_name}"),
        );
    };

    match usecase.initiate(auth.user_id, request.plan_id, gateway).await {
        Ok(params) => (StatusCode::OK, Json(params)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn activate<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    _auth: AuthUser,
    Json(request): Json<ActivateSubscriptionRequest>,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match usecase
        .activate(&request.order_id, &request.payment_id, &request.signature)
        .await
    {
        Ok(()) => (StatusCode::OK, "Subscription activated successfully").into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn current_subscription<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    auth: AuthUser,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.get_current_subscription(auth.user_id).await {
        Ok(Some(subscription)) => (StatusCode::OK, Json(subscription)).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
