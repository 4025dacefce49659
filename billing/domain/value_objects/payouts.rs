use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payouts::PayoutEntity,
    value_objects::enums::{payment_gateways::PaymentGateway, payout_statuses::PayoutStatus},
};

/// Bank details copied onto a payout at creation time. Later profile edits
/// must not retroactively alter an in-flight payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiarySnapshot {
    pub beneficiary_name: String,
    pub account_no: String,
    pub ifsc: String,
    pub bank_name: Option<String>,
    pub mobile: Option<String>,
}

/// Everything a payout gateway needs to move money to the beneficiary.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutDispatch {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub amount: Decimal,
    /// Internal idempotency/correlation key, stable across retries.
    pub payout_ref: String,
    pub purpose: String,
    pub beneficiary: BeneficiarySnapshot,
}

/// Normalized result of a provider payout initiation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayoutOutcome {
    pub status: PayoutStatus,
    pub txn_id: Option<String>,
    /// Raw provider response, retained verbatim for audit.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutDto {
    pub id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: Decimal,
    pub payout_ref: String,
    pub txn_id: Option<String>,
    pub status: PayoutStatus,
    pub gateway: Option<PaymentGateway>,
    pub purpose: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PayoutEntity> for PayoutDto {
    fn from(entity: PayoutEntity) -> Self {
        Self {
            id: entity.id,
            subscription_id: entity.subscription_id,
            amount: entity.amount,
            payout_ref: entity.payout_ref,
            txn_id: entity.txn_id,
            status: PayoutStatus::from_str(&entity.status),
            gateway: PaymentGateway::from_str(&entity.gateway),
            purpose: entity.purpose,
            created_at: entity.created_at,
        }
    }
}
