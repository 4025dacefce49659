use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use billing::domain::{
    repositories::{
        payments::PaymentRepository, payouts::PayoutRepository, plans::PlanRepository,
        subscriptions::SubscriptionRepository, users::UserRepository,
    },
    value_objects::enums::payment_gateways::PaymentGateway,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::error_response,
    usecases::payouts::PayoutUseCase,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankDetailsRequest {
    pub email: String,
    pub account_no: String,
    pub ifsc: String,
    pub beneficiary_name: String,
    pub bank_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPayoutRequest {
    pub email: String,
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
    pub start_date: String,
    pub end_date: String,
}

pub fn routes<PO, U, PL, S, Pay>(usecase: Arc<PayoutUseCase<PO, U, PL, S, Pay>>) -> Router
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/balance", get(balance))
        .route("/all", get(all_payouts))
        .route("/update-bank-details", post(update_bank_details))
        .route("/history/:email", get(payout_history))
        .route("/status/:payout_ref", get(payout_status))
        .route("/report", post(txn_report))
        .route("/statement", post(statement))
        .route("/initiate-manual", post(initiate_manual))
        .with_state(usecase)
}

fn require_admin(auth: &AuthUser) -> Result<(), Response> {
    if auth.is_admin() {
        return Ok(());
    }
    warn!(user_id = %auth.user_id, "payouts: admin route denied for non-admin");
    Err(error_response(
        StatusCode::FORBIDDEN,
        "Admin access required".to_string(),
    ))
}

pub async fn balance<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    (StatusCode::OK, Json(usecase.balances().await)).into_response()
}

pub async fn all_payouts<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase.list_all().await {
        Ok(payouts) => (StatusCode::OK, Json(payouts)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn update_bank_details<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Json(request): Json<UpdateBankDetailsRequest>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase
        .update_beneficiary_details(
            request.email,
            request.account_no,
            request.ifsc,
            request.beneficiary_name,
            request.bank_name,
        )
        .await
    {
        Ok(()) => (StatusCode::OK, "Bank details updated successfully").into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn payout_history<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Path(email): Path<String>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase.history_for_email(email).await {
        Ok(payouts) => (StatusCode::OK, Json(payouts)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn payout_status<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Path(payout_ref): Path<String>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase.provider_payout_status(payout_ref).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn txn_report<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Json(request): Json<DateRangeRequest>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase
        .provider_txn_report(request.start_date, request.end_date)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn statement<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Json(request): Json<DateRangeRequest>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    match usecase
        .provider_statement(request.start_date, request.end_date)
        .await
    {
        Ok(statement) => (StatusCode::OK, Json(statement)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

pub async fn initiate_manual<PO, U, PL, S, Pay>(
    State(usecase): State<Arc<PayoutUseCase<PO, U, PL, S, Pay>>>,
    auth: AuthUser,
    Json(request): Json<ManualPayoutRequest>,
) -> Response
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    if let Err(denied) = require_admin(&auth) {
        return denied;
    }

    let gateway = match request.gateway.as_deref() {
        Some(name) => match PaymentGateway::from_str(name) {
            Some(gateway) => Some(gateway),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown gateway: {name}"),
                );
            }
        },
        None => None,
    };

    match usecase
        .initiate_manual(request.email, request.amount, request.purpose, gateway)
        .await
    {
        Ok(payout) => (StatusCode::OK, Json(payout)).into_response(),
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
