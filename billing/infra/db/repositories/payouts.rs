use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper, insert_into,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::payouts::{NewPayoutEntity, PayoutEntity},
        repositories::payouts::PayoutRepository,
        value_objects::enums::payout_statuses::PayoutStatus,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payouts},
};

pub struct PayoutPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PayoutPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PayoutRepository for PayoutPostgres {
    async fn create(&self, payout: NewPayoutEntity) -> Result<PayoutEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(payouts::table)
            .values(&payout)
            .returning(PayoutEntity::as_returning())
            .get_result::<PayoutEntity>(&mut conn)?;

        Ok(created)
    }

    async fn find_by_payout_ref(&self, payout_ref: String) -> Result<Option<PayoutEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payout = payouts::table
            .filter(payouts::payout_ref.eq(payout_ref))
            .select(PayoutEntity::as_select())
            .first::<PayoutEntity>(&mut conn)
            .optional()?;

        Ok(payout)
    }

    async fn record_dispatch_result(
        &self,
        payout_id: Uuid,
        status: PayoutStatus,
        txn_id: Option<String>,
        response_json: serde_json::Value,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(payouts::table.filter(payouts::id.eq(payout_id)))
            .set((
                payouts::status.eq(status.to_string()),
                payouts::txn_id.eq(txn_id),
                payouts::response_json.eq(Some(response_json)),
                payouts::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn finalize_if_in_flight(
        &self,
        payout_ref: String,
        status: PayoutStatus,
        txn_id: Option<String>,
        response_json: serde_json::Value,
    ) -> Result<Option<PayoutEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Same guarded-write shape as payments: a replayed webhook finds no
        // pending/processing row and commits nothing.
        let updated = diesel::update(
            payouts::table
                .filter(payouts::payout_ref.eq(payout_ref))
                .filter(payouts::status.eq_any(vec![
                    PayoutStatus::Pending.to_string(),
                    PayoutStatus::Processing.to_string(),
                ])),
        )
        .set((
            payouts::status.eq(status.to_string()),
            payouts::txn_id.eq(txn_id),
            payouts::response_json.eq(Some(response_json)),
            payouts::updated_at.eq(Utc::now()),
        ))
        .returning(PayoutEntity::as_returning())
        .get_result::<PayoutEntity>(&mut conn)
        .optional()?;

        Ok(updated)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PayoutEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payouts::table
            .filter(payouts::user_id.eq(user_id))
            .order(payouts::created_at.desc())
            .select(PayoutEntity::as_select())
            .load::<PayoutEntity>(&mut conn)?;

        Ok(result)
    }

    async fn list_all(&self) -> Result<Vec<PayoutEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payouts::table
            .order(payouts::created_at.desc())
            .select(PayoutEntity::as_select())
            .load::<PayoutEntity>(&mut conn)?;

        Ok(result)
    }
}
