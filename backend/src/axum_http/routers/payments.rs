use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use billing::domain::repositories::{
    payments::PaymentRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
    users::UserRepository,
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::error_response,
    usecases::subscriptions::SubscriptionUseCase,
};

pub fn routes<P, S, Pay, U>(usecase: Arc<SubscriptionUseCase<P, S, Pay, U>>) -> Router
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/history", get(payment_history))
        .with_state(usecase)
}

pub async fn payment_history<P, S, Pay, U>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, Pay, U>>>,
    auth: AuthUser,
) -> Response
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.payment_history(auth.user_id).await {
        Ok(payments) => (StatusCode::OK, Json(payments)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
