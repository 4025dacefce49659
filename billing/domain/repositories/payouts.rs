use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payouts::{NewPayoutEntity, PayoutEntity},
    value_objects::enums::payout_statuses::PayoutStatus,
};

#[async_trait]
#[automock]
pub trait PayoutRepository {
    async fn create(&self, payout: NewPayoutEntity) -> Result<PayoutEntity>;

    async fn find_by_payout_ref(&self, payout_ref: String) -> Result<Option<PayoutEntity>>;

    /// Stores the provider's initiation verdict: status, provider txn id and
    /// the raw response body (kept regardless of outcome).
    async fn record_dispatch_result(
        &self,
        payout_id: Uuid,
        status: PayoutStatus,
        txn_id: Option<String>,
        response_json: serde_json::Value,
    ) -> Result<()>;

    /// Compare-and-swap finalization from a payout webhook: commits only when
    /// the row is still pending/processing. Returns the updated row when the
    /// transition happened.
    async fn finalize_if_in_flight(
        &self,
        payout_ref: String,
        status: PayoutStatus,
        txn_id: Option<String>,
        response_json: serde_json::Value,
    ) -> Result<Option<PayoutEntity>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PayoutEntity>>;

    async fn list_all(&self) -> Result<Vec<PayoutEntity>>;
}
