use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use billing::{
    domain::{
        entities::{
            payouts::{NewPayoutEntity, PayoutEntity},
            users::{UpdateBeneficiaryDetails, UserEntity},
        },
        repositories::{
            payments::PaymentRepository, payouts::PayoutRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            enums::{payment_gateways::PaymentGateway, payout_statuses::PayoutStatus},
            payouts::{BeneficiarySnapshot, PayoutDispatch, PayoutDto, ProviderPayoutOutcome},
        },
    },
    gateways::{GatewayError, paynpro_client::PaynproClient, razorpay_client::RazorpayClient},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Payout capability of a provider: initiate a transfer to the beneficiary
/// and report the account balance. One implementation per provider, selected
/// from a lookup table keyed by the gateway enum.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn initiate_payout(&self, dispatch: PayoutDispatch) -> AnyResult<ProviderPayoutOutcome>;

    async fn fetch_balance(&self) -> AnyResult<serde_json::Value>;
}

#[async_trait]
impl PayoutGateway for RazorpayClient {
    async fn initiate_payout(&self, dispatch: PayoutDispatch) -> AnyResult<ProviderPayoutOutcome> {
        // Three discrete steps. The contact reference and payout ref are
        // derived from stable internal ids, so a retried sequence converges
        // on the same provider-side objects instead of minting new ones.
        let contact_id = self
            .upsert_contact(
                &dispatch.user_name,
                &dispatch.user_email,
                dispatch.beneficiary.mobile.as_deref(),
                &format!("USER_{}", dispatch.user_id),
            )
            .await?;

        let fund_account_id = self
            .create_fund_account(
                &contact_id,
                &dispatch.beneficiary.beneficiary_name,
                &dispatch.beneficiary.ifsc,
                &dispatch.beneficiary.account_no,
            )
            .await?;

        let handle = self
            .trigger_payout(
                &fund_account_id,
                dispatch.amount,
                &dispatch.purpose,
                &dispatch.payout_ref,
            )
            .await?;

        Ok(ProviderPayoutOutcome {
            status: map_razorpay_payout_status(&handle.status),
            txn_id: Some(handle.id),
            raw: handle.raw,
        })
    }

    async fn fetch_balance(&self) -> AnyResult<serde_json::Value> {
        self.fetch_balance().await
    }
}

#[async_trait]
impl PayoutGateway for PaynproClient {
    async fn initiate_payout(&self, dispatch: PayoutDispatch) -> AnyResult<ProviderPayoutOutcome> {
        let raw = self.initiate_payout(&dispatch).await?;
        Ok(parse_paynpro_payout_response(raw))
    }

    async fn fetch_balance(&self) -> AnyResult<serde_json::Value> {
        self.fetch_balance().await
    }
}

/// Admin passthrough queries only the single-call provider offers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayoutReporting: Send + Sync {
    async fn payout_status(&self, payout_ref: String) -> AnyResult<serde_json::Value>;

    async fn txn_report(&self, start_date: String, end_date: String)
    -> AnyResult<serde_json::Value>;

    async fn statement(&self, start_date: String, end_date: String)
    -> AnyResult<serde_json::Value>;
}

#[async_trait]
impl PayoutReporting for PaynproClient {
    async fn payout_status(&self, payout_ref: String) -> AnyResult<serde_json::Value> {
        self.payout_status(&payout_ref).await
    }

    async fn txn_report(
        &self,
        start_date: String,
        end_date: String,
    ) -> AnyResult<serde_json::Value> {
        self.txn_report(&start_date, &end_date).await
    }

    async fn statement(
        &self,
        start_date: String,
        end_date: String,
    ) -> AnyResult<serde_json::Value> {
        self.statement(&start_date, &end_date).await
    }
}

/// Hook the payment orchestrator fires after a successful activation. Kept as
/// a trait so the payment flow never depends on payout wiring.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayoutTrigger: Send + Sync {
    async fn process_for_subscription(&self, subscription_id: Uuid) -> AnyResult<()>;
}

#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("user not found")]
    UserNotFound,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("plan not found")]
    PlanNotFound,
    #[error("user has no payout details configured")]
    MissingBankDetails,
    #[error("payout gateway not configured: {0}")]
    GatewayNotConfigured(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PayoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PayoutError::UserNotFound
            | PayoutError::SubscriptionNotFound
            | PayoutError::PlanNotFound => StatusCode::NOT_FOUND,
            PayoutError::MissingBankDetails | PayoutError::GatewayNotConfigured(_) => {
                StatusCode::BAD_REQUEST
            }
            PayoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type PayoutResult<T> = std::result::Result<T, PayoutError>;

pub struct PayoutUseCase<PO, U, PL, S, Pay>
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    payout_repo: Arc<PO>,
    user_repo: Arc<U>,
    plan_repo: Arc<PL>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<Pay>,
    payout_gateways: HashMap<PaymentGateway, Arc<dyn PayoutGateway>>,
    reporting: Arc<dyn PayoutReporting>,
}

impl<PO, U, PL, S, Pay> PayoutUseCase<PO, U, PL, S, Pay>
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(
        payout_repo: Arc<PO>,
        user_repo: Arc<U>,
        plan_repo: Arc<PL>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<Pay>,
        payout_gateways: HashMap<PaymentGateway, Arc<dyn PayoutGateway>>,
        reporting: Arc<dyn PayoutReporting>,
    ) -> Self {
        Self {
            payout_repo,
            user_repo,
            plan_repo,
            subscription_repo,
            payment_repo,
            payout_gateways,
            reporting,
        }
    }

    /// Commission payout triggered by a subscription activation. Precondition
    /// failures are recorded, never raised: the payment that triggered this
    /// is already confirmed and must not be unwound.
    pub async fn process_for_subscription(&self, subscription_id: Uuid) -> PayoutResult<()> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::SubscriptionNotFound)?;

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::PlanNotFound)?;

        if plan.payout_amount <= Decimal::ZERO {
            info!(
                %subscription_id,
                plan_name = %plan.name,
                "payouts: no payout amount defined for plan, skipping"
            );
            return Ok(());
        }

        let user = self
            .user_repo
            .find_by_id(subscription.user_id)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::UserNotFound)?;

        if !user.has_complete_payout_details() {
            warn!(
                %subscription_id,
                user_email = %user.email,
                "payouts: user has no payout details, recording failed placeholder"
            );
            self.payout_repo
                .create(NewPayoutEntity {
                    user_id: user.id,
                    subscription_id: Some(subscription.id),
                    amount: plan.payout_amount,
                    payout_ref: format!("POUT_ERR_{}", Utc::now().timestamp_millis()),
                    status: PayoutStatus::Failed.to_string(),
                    gateway: PaymentGateway::Paynpro.to_string(),
                    beneficiary_name: None,
                    account_no: None,
                    ifsc: None,
                    bank_name: None,
                    purpose: Some("Missing bank details".to_string()),
                    mobile: None,
                })
                .await
                .map_err(PayoutError::Internal)?;
            return Ok(());
        }

        // The commission rides the same rails the payment came in on.
        let gateway = self
            .payment_repo
            .find_latest_by_subscription(subscription.id)
            .await
            .map_err(PayoutError::Internal)?
            .and_then(|payment| PaymentGateway::from_str(&payment.gateway))
            .unwrap_or(PaymentGateway::Paynpro);

        let payout = self
            .create_payout_record(
                &user,
                Some(subscription.id),
                plan.payout_amount,
                format!("POUT_{}", short_ref()),
                format!("SaaS Plan Payout - {}", plan.name),
                gateway,
            )
            .await?;

        if let Err(err) = self.dispatch(&payout, &user, gateway).await {
            error!(
                %subscription_id,
                payout_ref = %payout.payout_ref,
                error = ?err,
                "payouts: dispatch failed after subscription activation"
            );
        }

        Ok(())
    }

    /// Admin-initiated payout. Unlike the activation path, precondition
    /// failures here surface to the caller.
    pub async fn initiate_manual(
        &self,
        email: String,
        amount: Decimal,
        purpose: Option<String>,
        gateway: Option<PaymentGateway>,
    ) -> PayoutResult<PayoutDto> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::UserNotFound)?;

        if !user.has_complete_payout_details() {
            let err = PayoutError::MissingBankDetails;
            warn!(
                user_email = %user.email,
                status = err.status_code().as_u16(),
                "payouts: manual payout requested without bank details"
            );
            return Err(err);
        }

        let gateway = gateway.unwrap_or(PaymentGateway::Paynpro);
        let payout = self
            .create_payout_record(
                &user,
                None,
                amount,
                format!("MAN_{}", short_ref()),
                purpose.unwrap_or_else(|| "Manual Admin Payout".to_string()),
                gateway,
            )
            .await?;

        if let Err(err) = self.dispatch(&payout, &user, gateway).await {
            error!(
                payout_ref = %payout.payout_ref,
                error = ?err,
                "payouts: manual dispatch failed"
            );
        }

        let refreshed = self
            .payout_repo
            .find_by_payout_ref(payout.payout_ref.clone())
            .await
            .map_err(PayoutError::Internal)?
            .unwrap_or(payout);

        Ok(PayoutDto::from(refreshed))
    }

    /// Reconciles an asynchronous payout status callback. Malformed payloads
    /// and unknown references are logged and acknowledged so the provider
    /// stops retrying; nothing is mutated for them.
    pub async fn handle_payout_webhook(&self, payload: serde_json::Value) -> PayoutResult<()> {
        let payout_ref = payload.get("PAYOUT_REF").and_then(|v| v.as_str());
        let status = payload.get("STATUS").and_then(|v| v.as_str());
        let txn_id = payload
            .get("TXN_ID")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());

        let (payout_ref, status) = match (payout_ref, status) {
            (Some(payout_ref), Some(status)) => (payout_ref.to_string(), status),
            _ => {
                warn!(
                    payload = %payload,
                    "payouts: webhook payload missing PAYOUT_REF or STATUS, acknowledging"
                );
                return Ok(());
            }
        };

        let mapped = if status.eq_ignore_ascii_case("success") {
            PayoutStatus::Success
        } else if status.eq_ignore_ascii_case("failed") {
            PayoutStatus::Failed
        } else {
            warn!(
                %payout_ref,
                status,
                "payouts: webhook carries unknown status, acknowledging"
            );
            return Ok(());
        };

        let updated = self
            .payout_repo
            .finalize_if_in_flight(payout_ref.clone(), mapped, txn_id, payload.clone())
            .await
            .map_err(PayoutError::Internal)?;

        match updated {
            Some(payout) => {
                info!(
                    %payout_ref,
                    status = %mapped,
                    payout_id = %payout.id,
                    "payouts: webhook finalized payout"
                );
            }
            None => {
                let known = self
                    .payout_repo
                    .find_by_payout_ref(payout_ref.clone())
                    .await
                    .map_err(PayoutError::Internal)?;
                if known.is_some() {
                    info!(%payout_ref, "payouts: webhook replay for terminal payout, no-op");
                } else {
                    warn!(%payout_ref, "payouts: webhook for unknown payout ref, acknowledging");
                }
            }
        }

        Ok(())
    }

    /// Aggregated balance across providers. A provider failure is reported
    /// in-line so one misbehaving gateway does not blank the whole view.
    pub async fn balances(&self) -> serde_json::Value {
        let mut balances = serde_json::Map::new();

        for gateway in [PaymentGateway::Razorpay, PaymentGateway::Paynpro] {
            let Some(client) = self.payout_gateways.get(&gateway) else {
                continue;
            };
            let entry = match client.fetch_balance().await {
                Ok(balance) => balance,
                Err(err) => {
                    warn!(gateway = %gateway, error = ?err, "payouts: balance inquiry failed");
                    json!({ "error": err.to_string() })
                }
            };
            balances.insert(gateway.to_string(), entry);
        }

        serde_json::Value::Object(balances)
    }

    pub async fn list_all(&self) -> PayoutResult<Vec<PayoutDto>> {
        let payouts = self
            .payout_repo
            .list_all()
            .await
            .map_err(PayoutError::Internal)?;
        Ok(payouts.into_iter().map(PayoutDto::from).collect())
    }

    pub async fn history_for_email(&self, email: String) -> PayoutResult<Vec<PayoutDto>> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::UserNotFound)?;

        let payouts = self
            .payout_repo
            .list_by_user(user.id)
            .await
            .map_err(PayoutError::Internal)?;
        Ok(payouts.into_iter().map(PayoutDto::from).collect())
    }

    pub async fn update_beneficiary_details(
        &self,
        email: String,
        account_no: String,
        ifsc: String,
        beneficiary_name: String,
        bank_name: String,
    ) -> PayoutResult<()> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await
            .map_err(PayoutError::Internal)?
            .ok_or(PayoutError::UserNotFound)?;

        self.user_repo
            .update_beneficiary_details(
                user.id,
                UpdateBeneficiaryDetails {
                    payout_account_no: Some(account_no),
                    payout_ifsc: Some(ifsc),
                    payout_beneficiary_name: Some(beneficiary_name),
                    payout_bank_name: Some(bank_name),
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(PayoutError::Internal)?;

        Ok(())
    }

    pub async fn provider_payout_status(
        &self,
        payout_ref: String,
    ) -> PayoutResult<serde_json::Value> {
        self.reporting
            .payout_status(payout_ref)
            .await
            .map_err(PayoutError::Internal)
    }

    pub async fn provider_txn_report(
        &self,
        start_date: String,
        end_date: String,
    ) -> PayoutResult<serde_json::Value> {
        self.reporting
            .txn_report(start_date, end_date)
            .await
            .map_err(PayoutError::Internal)
    }

    pub async fn provider_statement(
        &self,
        start_date: String,
        end_date: String,
    ) -> PayoutResult<serde_json::Value> {
        self.reporting
            .statement(start_date, end_date)
            .await
            .map_err(PayoutError::Internal)
    }

    async fn create_payout_record(
        &self,
        user: &UserEntity,
        subscription_id: Option<Uuid>,
        amount: Decimal,
        payout_ref: String,
        purpose: String,
        gateway: PaymentGateway,
    ) -> PayoutResult<PayoutEntity> {
        // Beneficiary details are snapshotted here; later profile edits must
        // not retroactively alter this payout.
        let payout = self
            .payout_repo
            .create(NewPayoutEntity {
                user_id: user.id,
                subscription_id,
                amount,
                payout_ref,
                status: PayoutStatus::Pending.to_string(),
                gateway: gateway.to_string(),
                beneficiary_name: Some(
                    user.payout_beneficiary_name
                        .clone()
                        .unwrap_or_else(|| user.name.clone()),
                ),
                account_no: user.payout_account_no.clone(),
                ifsc: user.payout_ifsc.clone(),
                bank_name: user.payout_bank_name.clone(),
                purpose: Some(purpose),
                mobile: user.mobile.clone(),
            })
            .await
            .map_err(PayoutError::Internal)?;

        info!(
            payout_ref = %payout.payout_ref,
            gateway = %gateway,
            amount = %amount,
            "payouts: payout record created"
        );

        Ok(payout)
    }

    /// Calls the provider and stores the verdict. Adapter failures are caught
    /// here and mapped to a failed row with the raw diagnostics attached;
    /// they never propagate into the flow that triggered the payout.
    async fn dispatch(
        &self,
        payout: &PayoutEntity,
        user: &UserEntity,
        gateway: PaymentGateway,
    ) -> PayoutResult<()> {
        let Some(client) = self.payout_gateways.get(&gateway) else {
            let raw = json!({ "error": format!("payout gateway {gateway} not configured") });
            self.payout_repo
                .record_dispatch_result(payout.id, PayoutStatus::Failed, None, raw)
                .await
                .map_err(PayoutError::Internal)?;
            return Err(PayoutError::GatewayNotConfigured(gateway.to_string()));
        };

        let dispatch = PayoutDispatch {
            user_id: user.id,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            amount: payout.amount,
            payout_ref: payout.payout_ref.clone(),
            purpose: payout
                .purpose
                .clone()
                .unwrap_or_else(|| "SaaS Plan Payout".to_string()),
            beneficiary: BeneficiarySnapshot {
                beneficiary_name: payout
                    .beneficiary_name
                    .clone()
                    .unwrap_or_else(|| user.name.clone()),
                account_no: payout.account_no.clone().unwrap_or_default(),
                ifsc: payout.ifsc.clone().unwrap_or_default(),
                bank_name: payout.bank_name.clone(),
                mobile: payout.mobile.clone(),
            },
        };

        match client.initiate_payout(dispatch).await {
            Ok(outcome) => {
                info!(
                    payout_ref = %payout.payout_ref,
                    gateway = %gateway,
                    status = %outcome.status,
                    txn_id = ?outcome.txn_id,
                    "payouts: provider accepted dispatch"
                );
                self.payout_repo
                    .record_dispatch_result(payout.id, outcome.status, outcome.txn_id, outcome.raw)
                    .await
                    .map_err(PayoutError::Internal)?;
            }
            Err(err) => {
                let raw = err
                    .downcast_ref::<GatewayError>()
                    .map(|gw| {
                        json!({
                            "status": gw.status,
                            "body": gw.body,
                            "message": gw.message,
                        })
                    })
                    .unwrap_or_else(|| json!({ "error": err.to_string() }));

                error!(
                    payout_ref = %payout.payout_ref,
                    gateway = %gateway,
                    error = ?err,
                    "payouts: provider dispatch failed"
                );
                self.payout_repo
                    .record_dispatch_result(payout.id, PayoutStatus::Failed, None, raw)
                    .await
                    .map_err(PayoutError::Internal)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<PO, U, PL, S, Pay> PayoutTrigger for PayoutUseCase<PO, U, PL, S, Pay>
where
    PO: PayoutRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    PL: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
{
    async fn process_for_subscription(&self, subscription_id: Uuid) -> AnyResult<()> {
        PayoutUseCase::process_for_subscription(self, subscription_id)
            .await
            .map_err(anyhow::Error::new)
    }
}

fn short_ref() -> String {
    Uuid::new_v4().to_string()[..8].to_uppercase()
}

fn map_razorpay_payout_status(status: &str) -> PayoutStatus {
    if status.eq_ignore_ascii_case("processed")
        || status.eq_ignore_ascii_case("processing")
        || status.eq_ignore_ascii_case("pending")
        || status.eq_ignore_ascii_case("queued")
    {
        PayoutStatus::Processing
    } else if status.eq_ignore_ascii_case("cancelled") || status.eq_ignore_ascii_case("rejected") {
        PayoutStatus::Failed
    } else {
        PayoutStatus::Pending
    }
}

fn parse_paynpro_payout_response(raw: serde_json::Value) -> ProviderPayoutOutcome {
    let status_code = raw.get("statusCode").and_then(|v| v.as_i64());
    let txn_id = raw
        .pointer("/Data/txn_id")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    let status = match (status_code, &txn_id) {
        (Some(200), Some(_)) => PayoutStatus::Processing,
        (Some(200), None) => PayoutStatus::Pending,
        _ => PayoutStatus::Failed,
    };

    ProviderPayoutOutcome {
        status,
        txn_id,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing::domain::{
        entities::{
            payments::PaymentEntity, plans::PlanEntity, subscriptions::SubscriptionEntity,
            users::UserEntity,
        },
        repositories::{
            payments::MockPaymentRepository, payouts::MockPayoutRepository,
            plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
            users::MockUserRepository,
        },
        value_objects::enums::{
            payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus,
        },
    };
    use rust_decimal_macros::dec;

    fn sample_plan(id: Uuid, payout_amount: Decimal) -> PlanEntity {
        PlanEntity {
            id,
            name: "Starter".to_string(),
            description: None,
            price: dec!(499.00),
            billing_cycle: "monthly".to_string(),
            payout_amount,
            created_at: Utc::now(),
        }
    }

    fn sample_user(id: Uuid, with_bank_details: bool) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id,
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            mobile: Some("9876543210".to_string()),
            payout_account_no: with_bank_details.then(|| "000111222333".to_string()),
            payout_ifsc: with_bank_details.then(|| "HDFC0001234".to_string()),
            payout_beneficiary_name: with_bank_details.then(|| "Asha Rao".to_string()),
            payout_bank_name: with_bank_details.then(|| "HDFC Bank".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_subscription(id: Uuid, user_id: Uuid, plan_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id,
            user_id,
            plan_id,
            status: SubscriptionStatus::Active.to_string(),
            starts_at: Some(now),
            ends_at: Some(now + chrono::Duration::days(30)),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_payment(subscription_id: Uuid, user_id: Uuid, gateway: &str) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            user_id,
            subscription_id,
            gateway: gateway.to_string(),
            txn_id: "order_abc123".to_string(),
            amount: dec!(499.00),
            status: PaymentStatus::Success.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_payout(user_id: Uuid, subscription_id: Option<Uuid>, new: NewPayoutEntity) -> PayoutEntity {
        let now = Utc::now();
        PayoutEntity {
            id: Uuid::new_v4(),
            user_id,
            subscription_id,
            amount: new.amount,
            payout_ref: new.payout_ref,
            txn_id: None,
            status: new.status,
            gateway: new.gateway,
            beneficiary_name: new.beneficiary_name,
            account_no: new.account_no,
            ifsc: new.ifsc,
            bank_name: new.bank_name,
            purpose: new.purpose,
            mobile: new.mobile,
            response_json: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct Mocks {
        payout_repo: MockPayoutRepository,
        user_repo: MockUserRepository,
        plan_repo: MockPlanRepository,
        subscription_repo: MockSubscriptionRepository,
        payment_repo: MockPaymentRepository,
        gateway: MockPayoutGateway,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                payout_repo: MockPayoutRepository::new(),
                user_repo: MockUserRepository::new(),
                plan_repo: MockPlanRepository::new(),
                subscription_repo: MockSubscriptionRepository::new(),
                payment_repo: MockPaymentRepository::new(),
                gateway: MockPayoutGateway::new(),
            }
        }

        fn into_usecase(
            self,
            gateway_kind: PaymentGateway,
        ) -> PayoutUseCase<
            MockPayoutRepository,
            MockUserRepository,
            MockPlanRepository,
            MockSubscriptionRepository,
            MockPaymentRepository,
        > {
            let mut payout_gateways: HashMap<PaymentGateway, Arc<dyn PayoutGateway>> =
                HashMap::new();
            payout_gateways.insert(gateway_kind, Arc::new(self.gateway));

            PayoutUseCase::new(
                Arc::new(self.payout_repo),
                Arc::new(self.user_repo),
                Arc::new(self.plan_repo),
                Arc::new(self.subscription_repo),
                Arc::new(self.payment_repo),
                payout_gateways,
                Arc::new(MockPayoutReporting::new()),
            )
        }
    }

    #[tokio::test]
    async fn missing_bank_details_record_failed_placeholder_without_dispatch() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let subscription_id = Uuid::new_v4();

        let mut mocks = Mocks::new();

        let subscription = sample_subscription(subscription_id, user_id, plan_id);
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });

        let plan = sample_plan(plan_id, dec!(50.00));
        mocks.plan_repo.expect_find_by_id().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });

        let user = sample_user(user_id, false);
        mocks.user_repo.expect_find_by_id().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        mocks
            .payout_repo
            .expect_create()
            .withf(|new| {
                new.status == "failed"
                    && new.payout_ref.starts_with("POUT_ERR_")
                    && new.purpose.as_deref() == Some("Missing bank details")
            })
            .returning(move |new| {
                let entity = sample_payout(user_id, new.subscription_id, new.clone());
                Box::pin(async move { Ok(entity) })
            });

        // No provider call may happen for a payout without bank details.
        mocks.gateway.expect_initiate_payout().never();

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);
        usecase
            .process_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn zero_payout_amount_skips_without_any_record() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let subscription_id = Uuid::new_v4();

        let mut mocks = Mocks::new();

        let subscription = sample_subscription(subscription_id, user_id, plan_id);
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });

        let plan = sample_plan(plan_id, Decimal::ZERO);
        mocks.plan_repo.expect_find_by_id().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });

        mocks.payout_repo.expect_create().never();
        mocks.gateway.expect_initiate_payout().never();

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);
        usecase
            .process_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn activation_payout_dispatches_on_the_payment_gateway() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let subscription_id = Uuid::new_v4();

        let mut mocks = Mocks::new();

        let subscription = sample_subscription(subscription_id, user_id, plan_id);
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });

        let plan = sample_plan(plan_id, dec!(50.00));
        mocks.plan_repo.expect_find_by_id().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });

        let user = sample_user(user_id, true);
        mocks.user_repo.expect_find_by_id().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        let payment = sample_payment(subscription_id, user_id, "razorpay");
        mocks
            .payment_repo
            .expect_find_latest_by_subscription()
            .returning(move |_| {
                let payment = payment.clone();
                Box::pin(async move { Ok(Some(payment)) })
            });

        mocks
            .payout_repo
            .expect_create()
            .withf(|new| {
                new.status == "pending"
                    && new.payout_ref.starts_with("POUT_")
                    && new.account_no.as_deref() == Some("000111222333")
            })
            .returning(move |new| {
                let entity = sample_payout(user_id, new.subscription_id, new.clone());
                Box::pin(async move { Ok(entity) })
            });

        mocks
            .gateway
            .expect_initiate_payout()
            .withf(|dispatch| {
                dispatch.beneficiary.ifsc == "HDFC0001234" && dispatch.amount == dec!(50.00)
            })
            .returning(|_| {
                Ok(ProviderPayoutOutcome {
                    status: PayoutStatus::Processing,
                    txn_id: Some("pout_xyz".to_string()),
                    raw: json!({ "id": "pout_xyz", "status": "processing" }),
                })
            });

        mocks
            .payout_repo
            .expect_record_dispatch_result()
            .withf(|_, status, txn_id, _| {
                *status == PayoutStatus::Processing && txn_id.as_deref() == Some("pout_xyz")
            })
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let usecase = mocks.into_usecase(PaymentGateway::Razorpay);
        usecase
            .process_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gateway_failure_is_caught_and_recorded_as_failed() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let subscription_id = Uuid::new_v4();

        let mut mocks = Mocks::new();

        let subscription = sample_subscription(subscription_id, user_id, plan_id);
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });

        let plan = sample_plan(plan_id, dec!(50.00));
        mocks.plan_repo.expect_find_by_id().returning(move |_| {
            let plan = plan.clone();
            Box::pin(async move { Ok(Some(plan)) })
        });

        let user = sample_user(user_id, true);
        mocks.user_repo.expect_find_by_id().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        let payment = sample_payment(subscription_id, user_id, "paynpro");
        mocks
            .payment_repo
            .expect_find_latest_by_subscription()
            .returning(move |_| {
                let payment = payment.clone();
                Box::pin(async move { Ok(Some(payment)) })
            });

        mocks.payout_repo.expect_create().returning(move |new| {
            let entity = sample_payout(user_id, new.subscription_id, new.clone());
            Box::pin(async move { Ok(entity) })
        });

        mocks
            .gateway
            .expect_initiate_payout()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        mocks
            .payout_repo
            .expect_record_dispatch_result()
            .withf(|_, status, txn_id, _| *status == PayoutStatus::Failed && txn_id.is_none())
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);

        // The activation flow must never see the provider failure.
        usecase
            .process_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn manual_payout_without_bank_details_is_rejected() {
        let mut mocks = Mocks::new();

        let user = sample_user(Uuid::new_v4(), false);
        mocks.user_repo.expect_find_by_email().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        mocks.payout_repo.expect_create().never();
        mocks.gateway.expect_initiate_payout().never();

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);
        let result = usecase
            .initiate_manual("asha@example.com".to_string(), dec!(100.00), None, None)
            .await;

        assert!(matches!(result, Err(PayoutError::MissingBankDetails)));
    }

    #[tokio::test]
    async fn webhook_with_unknown_ref_is_acknowledged_without_mutation() {
        let mut mocks = Mocks::new();

        mocks
            .payout_repo
            .expect_finalize_if_in_flight()
            .returning(|_, _, _, _| Box::pin(async { Ok(None) }));
        mocks
            .payout_repo
            .expect_find_by_payout_ref()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);
        usecase
            .handle_payout_webhook(json!({
                "PAYOUT_REF": "POUT_UNKNOWN1",
                "STATUS": "Success",
                "TXN_ID": "txn_1"
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn webhook_success_finalizes_in_flight_payout() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();

        mocks
            .payout_repo
            .expect_finalize_if_in_flight()
            .withf(|payout_ref, status, txn_id, _| {
                payout_ref == "POUT_AB12CD34"
                    && *status == PayoutStatus::Success
                    && txn_id.as_deref() == Some("txn_99")
            })
            .returning(move |payout_ref, status, _, _| {
                let entity = sample_payout(
                    user_id,
                    None,
                    NewPayoutEntity {
                        user_id,
                        subscription_id: None,
                        amount: dec!(50.00),
                        payout_ref,
                        status: status.to_string(),
                        gateway: "paynpro".to_string(),
                        beneficiary_name: None,
                        account_no: None,
                        ifsc: None,
                        bank_name: None,
                        purpose: None,
                        mobile: None,
                    },
                );
                Box::pin(async move { Ok(Some(entity)) })
            });

        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);
        usecase
            .handle_payout_webhook(json!({
                "PAYOUT_REF": "POUT_AB12CD34",
                "STATUS": "SUCCESS",
                "TXN_ID": "txn_99"
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn malformed_webhook_payload_is_acknowledged() {
        let mocks = Mocks::new();
        let usecase = mocks.into_usecase(PaymentGateway::Paynpro);

        // Neither lookup nor mutation may happen for an unparseable payload.
        usecase
            .handle_payout_webhook(json!({ "unexpected": "shape" }))
            .await
            .unwrap();
    }

    #[test]
    fn razorpay_status_strings_map_to_internal_statuses() {
        assert_eq!(
            map_razorpay_payout_status("processed"),
            PayoutStatus::Processing
        );
        assert_eq!(
            map_razorpay_payout_status("Processing"),
            PayoutStatus::Processing
        );
        assert_eq!(
            map_razorpay_payout_status("pending"),
            PayoutStatus::Processing
        );
        assert_eq!(map_razorpay_payout_status("cancelled"), PayoutStatus::Failed);
        assert_eq!(map_razorpay_payout_status("rejected"), PayoutStatus::Failed);
        assert_eq!(map_razorpay_payout_status("unheard-of"), PayoutStatus::Pending);
    }

    #[test]
    fn paynpro_payout_response_parsing() {
        let accepted = parse_paynpro_payout_response(json!({
            "statusCode": 200,
            "Data": { "txn_id": "txn_42" }
        }));
        assert_eq!(accepted.status, PayoutStatus::Processing);
        assert_eq!(accepted.txn_id.as_deref(), Some("txn_42"));

        let accepted_without_data = parse_paynpro_payout_response(json!({ "statusCode": 200 }));
        assert_eq!(accepted_without_data.status, PayoutStatus::Pending);

        let rejected = parse_paynpro_payout_response(json!({
            "statusCode": 400,
            "message": "insufficient balance"
        }));
        assert_eq!(rejected.status, PayoutStatus::Failed);
        assert!(rejected.txn_id.is_none());
    }
}
