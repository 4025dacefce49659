use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::plans;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Nominal cycle label. Activation currently applies a fixed 30-day
    /// window regardless of this value.
    pub billing_cycle: String,
    /// Commission paid to the subscriber per activation; zero disables payouts.
    pub payout_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = plans)]
pub struct NewPlanEntity {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub billing_cycle: String,
    pub payout_amount: Decimal,
}
