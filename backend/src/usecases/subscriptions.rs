use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use billing::{
    domain::{
        entities::{payments::NewPaymentEntity, subscriptions::NewSubscriptionEntity},
        repositories::{
            payments::PaymentRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            checkout::{CheckoutParams, CreateOrderRequest},
            enums::{
                payment_gateways::PaymentGateway, payment_statuses::PaymentStatus,
                subscription_statuses::SubscriptionStatus,
            },
            subscriptions::{CurrentSubscriptionDto, PaymentDto, PlanDto},
        },
    },
    gateways::{
        paynpro_client::PaynproClient,
        razorpay_client::{RazorpayClient, RazorpayWebhookEvent},
    },
};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::usecases::payouts::PayoutTrigger;

/// Fixed activation window. The plan's nominal billing cycle is stored but
/// deliberately not consulted here; see DESIGN.md.
const SUBSCRIPTION_CYCLE_DAYS: i64 = 30;

/// Order capability of a provider: create an order for checkout and verify
/// the signatures on its callbacks. One implementation per provider, selected
/// from a lookup table keyed by the gateway enum.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Returns the provider transaction id and the client-facing checkout
    /// parameters.
    async fn create_order(&self, request: CreateOrderRequest)
    -> AnyResult<(String, CheckoutParams)>;

    /// Verifies a synchronous checkout callback. Mismatch is `Ok(false)`.
    fn verify_callback_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> AnyResult<bool>;

    /// Verifies an asynchronous webhook delivery against the provider's
    /// webhook secret. Any failure means "not authentic".
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;

    /// Best-effort verification of a `sign` checksum on a notification body,
    /// for the provider whose protocol uses the legacy checksum scheme.
    fn verify_notification_checksum(&self, params: &[(String, String)], sign: &str) -> bool;
}

#[async_trait]
impl OrderGateway for RazorpayClient {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> AnyResult<(String, CheckoutParams)> {
        let order = self.create_order(request.amount, &request.trade_ref).await?;
        let params = CheckoutParams::Order {
            order_id: order.id.clone(),
            amount: order.amount,
            currency: order.currency,
            key: self.key_id().to_string(),
            name: "SaaS Subscription".to_string(),
            description: format!("Subscription for {}", request.plan_name),
        };
        Ok((order.id, params))
    }

    fn verify_callback_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> AnyResult<bool> {
        self.verify_payment_signature(order_id, payment_id, signature)
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        RazorpayClient::verify_webhook_signature(self, payload, signature)
    }

    fn verify_notification_checksum(&self, _params: &[(String, String)], _sign: &str) -> bool {
        // Not part of this provider's protocol.
        false
    }
}

#[async_trait]
impl OrderGateway for PaynproClient {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> AnyResult<(String, CheckoutParams)> {
        let mobile = request.mobile.clone().unwrap_or_else(|| "0000000000".to_string());
        let order = self
            .create_order(
                request.amount,
                &request.trade_ref,
                &request.customer_name,
                &request.email,
                &mobile,
            )
            .await?;

        let trade_no = order.trade_no.clone();
        Ok((
            trade_no.clone(),
            CheckoutParams::Redirect {
                pay_url: order.pay_url,
                trade_no,
            },
        ))
    }

    fn verify_callback_signature(
        &self,
        _order_id: &str,
        _payment_id: &str,
        _signature: &str,
    ) -> AnyResult<bool> {
        // The hosted-page provider has no synchronous checkout callback.
        Ok(false)
    }

    fn verify_webhook_signature(&self, _payload: &[u8], _signature: &str) -> bool {
        false
    }

    fn verify_notification_checksum(&self, params: &[(String, String)], sign: &str) -> bool {
        let borrowed: Vec<(&str, &str)> = params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        self.verify_callback_checksum(&borrowed, sign)
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("user not found")]
    UserNotFound,
    #[error("plan not found")]
    PlanNotFound,
    #[error("payment gateway not configured: {0}")]
    GatewayNotConfigured(String),
    #[error("invalid payment signature")]
    SignatureRejected,
    #[error("payment record not found for {0}")]
    PaymentNotFound(String),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("provider order creation failed: {0}")]
    Provider(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::UserNotFound
            | SubscriptionError::PlanNotFound
            | SubscriptionError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::GatewayNotConfigured(_)
            | SubscriptionError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::SignatureRejected => StatusCode::UNAUTHORIZED,
            SubscriptionError::Provider(_) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<P, S, Pay, U>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<Pay>,
    user_repo: Arc<U>,
    order_gateways: HashMap<PaymentGateway, Arc<dyn OrderGateway>>,
    payout_trigger: Arc<dyn PayoutTrigger>,
}

impl<P, S, Pay, U> SubscriptionUseCase<P, S, Pay, U>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<Pay>,
        user_repo: Arc<U>,
        order_gateways: HashMap<PaymentGateway, Arc<dyn OrderGateway>>,
        payout_trigger: Arc<dyn PayoutTrigger>,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            payment_repo,
            user_repo,
            order_gateways,
            payout_trigger,
        }
    }

    pub async fn list_plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self
            .plan_repo
            .list_all()
            .await
            .map_err(SubscriptionError::Internal)?;
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    /// Creates a provider order, then persists Subscription(pending) and
    /// Payment(pending) keyed by the provider transaction id.
    pub async fn initiate(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        gateway: PaymentGateway,
    ) -> UseCaseResult<CheckoutParams> {
        info!(
            %user_id,
            %plan_id,
            gateway = %gateway,
            "subscriptions: initiate requested"
        );

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or(SubscriptionError::UserNotFound)?;

        let plan = self
            .plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or(SubscriptionError::PlanNotFound)?;

        let client = self
            .order_gateways
            .get(&gateway)
            .ok_or_else(|| SubscriptionError::GatewayNotConfigured(gateway.to_string()))?;

        // The trade reference exists before the provider call so the pending
        // rows always tie back to something we generated.
        let trade_ref = match gateway {
            PaymentGateway::Razorpay => format!("txn_{}", Utc::now().timestamp_millis()),
            PaymentGateway::Paynpro => format!("PNP_{}", Utc::now().timestamp_millis()),
        };

        let (txn_id, params) = client
            .create_order(CreateOrderRequest {
                amount: plan.price,
                trade_ref,
                plan_name: plan.name.clone(),
                customer_name: user.name.clone(),
                email: user.email.clone(),
                mobile: user.mobile.clone(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    gateway = %gateway,
                    error = ?err,
                    "subscriptions: provider order creation failed"
                );
                SubscriptionError::Provider(err.to_string())
            })?;

        let subscription = self
            .subscription_repo
            .create(NewSubscriptionEntity {
                user_id,
                plan_id,
                status: SubscriptionStatus::Pending.to_string(),
            })
            .await
            .map_err(SubscriptionError::Internal)?;

        self.payment_repo
            .create(NewPaymentEntity {
                user_id,
                subscription_id: subscription.id,
                gateway: gateway.to_string(),
                txn_id: txn_id.clone(),
                amount: plan.price,
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(SubscriptionError::Internal)?;

        info!(
            %user_id,
            %plan_id,
            subscription_id = %subscription.id,
            txn_id = %txn_id,
            gateway = %gateway,
            "subscriptions: pending subscription and payment created"
        );

        Ok(params)
    }

    /// Synchronous activation: the client posts back the provider callback.
    /// An invalid signature is rejected outright; state is never mutated on
    /// unverified input.
    pub async fn activate(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> UseCaseResult<()> {
        let payment = self
            .payment_repo
            .find_by_txn_id(order_id.to_string())
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or_else(|| SubscriptionError::PaymentNotFound(order_id.to_string()))?;

        let gateway = PaymentGateway::from_str(&payment.gateway)
            .ok_or_else(|| SubscriptionError::GatewayNotConfigured(payment.gateway.clone()))?;
        let client = self
            .order_gateways
            .get(&gateway)
            .ok_or_else(|| SubscriptionError::GatewayNotConfigured(gateway.to_string()))?;

        let valid = client
            .verify_callback_signature(order_id, payment_id, signature)
            .map_err(SubscriptionError::Internal)?;
        if !valid {
            warn!(
                order_id,
                payment_id,
                "subscriptions: activation rejected, invalid payment signature"
            );
            return Err(SubscriptionError::SignatureRejected);
        }

        self.finalize_payment_success(order_id).await
    }

    /// Asynchronous webhook from the card/order provider. The delivery is
    /// authenticated with the webhook-specific secret before anything is
    /// parsed out of it.
    pub async fn handle_razorpay_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<()> {
        let client = self
            .order_gateways
            .get(&PaymentGateway::Razorpay)
            .ok_or_else(|| {
                SubscriptionError::GatewayNotConfigured(PaymentGateway::Razorpay.to_string())
            })?;

        if !client.verify_webhook_signature(payload, signature) {
            warn!("subscriptions: razorpay webhook rejected, invalid signature");
            return Err(SubscriptionError::SignatureRejected);
        }

        let event: RazorpayWebhookEvent = serde_json::from_slice(payload).map_err(|err| {
            warn!(error = %err, "subscriptions: razorpay webhook payload unparseable");
            SubscriptionError::InvalidWebhook(err.to_string())
        })?;

        info!(event = %event.event, "subscriptions: razorpay webhook verified");

        match event.event.as_str() {
            "order.paid" => {
                let order_id = event
                    .payload
                    .order
                    .map(|order| order.entity.id)
                    .ok_or_else(|| {
                        SubscriptionError::InvalidWebhook("order entity missing".to_string())
                    })?;
                self.finalize_payment_success(&order_id).await
            }
            "payment.failed" => {
                let order_id = event
                    .payload
                    .payment
                    .map(|payment| payment.entity.order_id)
                    .ok_or_else(|| {
                        SubscriptionError::InvalidWebhook("payment entity missing".to_string())
                    })?;
                self.finalize_payment_failure(&order_id).await
            }
            other => {
                debug!(event = other, "subscriptions: unhandled razorpay event type");
                Ok(())
            }
        }
    }

    /// Asynchronous notification from the hosted-page provider, keyed by
    /// trade number. When the payload carries a `sign` checksum it is
    /// verified; the provider's protocol otherwise sends none.
    pub async fn handle_paynpro_webhook(&self, payload: serde_json::Value) -> UseCaseResult<()> {
        let status = payload
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SubscriptionError::InvalidWebhook("status missing".to_string()))?
            .to_string();
        let trade_no = payload
            .get("tradeNo")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SubscriptionError::InvalidWebhook("tradeNo missing".to_string()))?
            .to_string();

        if let Some(sign) = payload.get("sign").and_then(|v| v.as_str()) {
            let client = self
                .order_gateways
                .get(&PaymentGateway::Paynpro)
                .ok_or_else(|| {
                    SubscriptionError::GatewayNotConfigured(PaymentGateway::Paynpro.to_string())
                })?;

            let params = checksum_params(&payload);
            if !client.verify_notification_checksum(&params, sign) {
                warn!(
                    %trade_no,
                    "subscriptions: paynpro webhook rejected, checksum mismatch"
                );
                return Err(SubscriptionError::SignatureRejected);
            }
        }

        info!(%trade_no, %status, "subscriptions: paynpro webhook received");

        if status.eq_ignore_ascii_case("success") || status.eq_ignore_ascii_case("paid") {
            self.finalize_payment_success(&trade_no).await
        } else if status.eq_ignore_ascii_case("failed") {
            self.finalize_payment_failure(&trade_no).await
        } else {
            debug!(%trade_no, %status, "subscriptions: ignoring paynpro status");
            Ok(())
        }
    }

    pub async fn get_current_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<CurrentSubscriptionDto>> {
        let subscription = match self
            .subscription_repo
            .find_current_active_by_user(user_id)
            .await
            .map_err(SubscriptionError::Internal)?
        {
            Some(subscription) => subscription,
            None => return Ok(None),
        };

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or(SubscriptionError::PlanNotFound)?;

        Ok(Some(CurrentSubscriptionDto {
            id: subscription.id,
            plan_id: plan.id,
            plan_name: plan.name,
            status: SubscriptionStatus::from_str(&subscription.status),
            starts_at: subscription.starts_at,
            ends_at: subscription.ends_at,
        }))
    }

    pub async fn payment_history(&self, user_id: Uuid) -> UseCaseResult<Vec<PaymentDto>> {
        let payments = self
            .payment_repo
            .list_by_user(user_id)
            .await
            .map_err(SubscriptionError::Internal)?;
        Ok(payments.into_iter().map(PaymentDto::from).collect())
    }

    /// The success cascade. The payment transition is a guarded
    /// compare-and-swap, so a replayed confirmation finds nothing to do and
    /// the subscription window is set exactly once.
    async fn finalize_payment_success(&self, txn_id: &str) -> UseCaseResult<()> {
        let existing = self
            .payment_repo
            .find_by_txn_id(txn_id.to_string())
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or_else(|| SubscriptionError::PaymentNotFound(txn_id.to_string()))?;

        let transitioned = self
            .payment_repo
            .transition_if_pending(txn_id.to_string(), PaymentStatus::Success)
            .await
            .map_err(SubscriptionError::Internal)?;

        let payment = match transitioned {
            Some(payment) => payment,
            None => {
                info!(
                    txn_id,
                    current_status = %existing.status,
                    "subscriptions: payment already terminal, confirmation is a no-op"
                );
                return Ok(());
            }
        };

        let starts_at = Utc::now();
        let ends_at = starts_at + Duration::days(SUBSCRIPTION_CYCLE_DAYS);
        self.subscription_repo
            .activate(payment.subscription_id, starts_at, ends_at)
            .await
            .map_err(SubscriptionError::Internal)?;

        info!(
            txn_id,
            subscription_id = %payment.subscription_id,
            %starts_at,
            %ends_at,
            "subscriptions: payment confirmed, subscription activated"
        );

        // Best-effort: the confirmed payment is never unwound because the
        // commission could not be set up.
        if let Err(err) = self
            .payout_trigger
            .process_for_subscription(payment.subscription_id)
            .await
        {
            error!(
                txn_id,
                subscription_id = %payment.subscription_id,
                error = ?err,
                "subscriptions: payout trigger failed after activation"
            );
        }

        Ok(())
    }

    async fn finalize_payment_failure(&self, txn_id: &str) -> UseCaseResult<()> {
        let transitioned = self
            .payment_repo
            .transition_if_pending(txn_id.to_string(), PaymentStatus::Failed)
            .await
            .map_err(SubscriptionError::Internal)?;

        match transitioned {
            Some(payment) => {
                warn!(
                    txn_id,
                    subscription_id = %payment.subscription_id,
                    "subscriptions: payment marked failed"
                );
            }
            None => {
                // Missing or already terminal: tolerated for failure reports.
                info!(txn_id, "subscriptions: failure report had nothing to do");
            }
        }

        Ok(())
    }
}

fn checksum_params(payload: &serde_json::Value) -> Vec<(String, String)> {
    payload
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| key.as_str() != "sign")
                .map(|(key, value)| {
                    let rendered = match value.as_str() {
                        Some(text) => text.to_string(),
                        None => value.to_string(),
                    };
                    (key.clone(), rendered)
                })
                .collect()
        })
        .unwrap_or_default()
}
