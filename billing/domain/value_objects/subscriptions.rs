use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::{payments::PaymentEntity, plans::PlanEntity},
    value_objects::enums::{
        payment_gateways::PaymentGateway, payment_statuses::PaymentStatus,
        subscription_statuses::SubscriptionStatus,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub billing_cycle: String,
    pub payout_amount: Decimal,
}

impl From<PlanEntity> for PlanDto {
    fn from(entity: PlanEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            price: entity.price,
            billing_cycle: entity.billing_cycle,
            payout_amount: entity.payout_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubscriptionDto {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub gateway: Option<PaymentGateway>,
    pub txn_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            subscription_id: entity.subscription_id,
            gateway: PaymentGateway::from_str(&entity.gateway),
            txn_id: entity.txn_id,
            amount: entity.amount,
            status: PaymentStatus::from_str(&entity.status),
            created_at: entity.created_at,
        }
    }
}
