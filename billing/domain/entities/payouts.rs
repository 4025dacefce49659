use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payouts;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payouts)]
pub struct PayoutEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Absent for manual/admin-triggered payouts.
    pub subscription_id: Option<Uuid>,
    pub amount: Decimal,
    /// Internal idempotency/correlation key; provider txn ids are assigned
    /// only after provider acceptance.
    pub payout_ref: String,
    pub txn_id: Option<String>,
    pub status: String,
    pub gateway: String,
    pub beneficiary_name: Option<String>,
    pub account_no: Option<String>,
    pub ifsc: Option<String>,
    pub bank_name: Option<String>,
    pub purpose: Option<String>,
    pub mobile: Option<String>,
    /// Raw provider response, kept even on success for audit.
    pub response_json: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payouts)]
pub struct NewPayoutEntity {
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: Decimal,
    pub payout_ref: String,
    pub status: String,
    pub gateway: String,
    pub beneficiary_name: Option<String>,
    pub account_no: Option<String>,
    pub ifsc: Option<String>,
    pub bank_name: Option<String>,
    pub purpose: Option<String>,
    pub mobile: Option<String>,
}
