use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{NewPaymentEntity, PaymentEntity},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn create(&self, payment: NewPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_txn_id(&self, txn_id: String) -> Result<Option<PaymentEntity>>;

    /// Compare-and-swap transition: commits the new status only when the row
    /// is still pending, so concurrent webhook deliveries settle exactly one
    /// terminal state. Returns the updated row when the transition happened.
    async fn transition_if_pending(
        &self,
        txn_id: String,
        status: PaymentStatus,
    ) -> Result<Option<PaymentEntity>>;

    async fn find_latest_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<PaymentEntity>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>>;
}
