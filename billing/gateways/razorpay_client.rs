use std::time::Duration;

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::warn;

use crate::gateways::{GatewayError, ensure_success, signing};

type HmacSha256 = Hmac<Sha256>;

const CURRENCY: &str = "INR";
const PAYOUT_MODE: &str = "IMPS";

/// Razorpay client: order creation for checkout, payment/webhook signature
/// verification and the three-step RazorpayX payout flow
/// (contact -> fund account -> payout).
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    account_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Provider-side payout handle returned from the final transfer step.
#[derive(Debug, Clone)]
pub struct RazorpayPayoutHandle {
    pub id: String,
    pub status: String,
    pub raw: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayWebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct RazorpayWebhookPayload {
    pub order: Option<RazorpayEntityEnvelope<RazorpayOrderEntity>>,
    pub payment: Option<RazorpayEntityEnvelope<RazorpayPaymentEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEntityEnvelope<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayOrderEntity {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayPaymentEntity {
    pub order_id: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: String,
        key_id: String,
        key_secret: String,
        webhook_secret: String,
        account_number: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build razorpay http client")?;

        Ok(Self {
            http,
            base_url,
            key_id,
            key_secret,
            webhook_secret,
            account_number,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Creates a capture-on-payment order the client completes in checkout.
    pub async fn create_order(&self, amount: Decimal, receipt: &str) -> Result<RazorpayOrder> {
        let body = json!({
            "amount": to_minor_units(amount)?,
            "currency": CURRENCY,
            "receipt": receipt,
            "payment_capture": 1,
        });

        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("razorpay create order request failed")?;
        let resp = ensure_success(resp, "razorpay create order").await?;

        let body = resp
            .text()
            .await
            .context("failed to read razorpay order response")?;
        let order: RazorpayOrder = serde_json::from_str(&body).map_err(|err| {
            GatewayError::malformed("razorpay create order", body, err.to_string())
        })?;

        Ok(order)
    }

    /// Verifies the synchronous checkout callback: HMAC-SHA256 over
    /// `"{order_id}|{payment_id}"` with the API secret. Mismatch is a normal
    /// outcome for untrusted input, so this returns `Ok(false)` rather than
    /// an error.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let expected =
            signing::hmac_sha256_hex(&self.key_secret, &[order_id, "|", payment_id])?;

        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        let expected = hex::decode(&expected).context("internal hex encoding failed")?;

        Ok(signing::constant_time_eq(&expected, &provided))
    }

    /// Verifies a webhook delivery against the webhook-specific secret
    /// (distinct from the API secret). Any failure means "not authentic".
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let mut mac = match HmacSha256::new_from_slice(self.webhook_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(err) => {
                warn!(error = %err, "razorpay webhook secret rejected by the runtime");
                return false;
            }
        };
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        signing::constant_time_eq(&expected, &provided)
    }

    /// Payout step 1: create or re-identify the contact. `reference_id` is
    /// derived from the user id, so retries converge on the same provider
    /// contact instead of minting duplicates.
    pub async fn upsert_contact(
        &self,
        name: &str,
        email: &str,
        mobile: Option<&str>,
        reference_id: &str,
    ) -> Result<String> {
        let body = json!({
            "name": name,
            "email": email,
            "contact": mobile.unwrap_or("9999999999"),
            "type": "customer",
            "reference_id": reference_id,
        });

        let resp = self
            .http
            .post(format!("{}/v1/contacts", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("razorpay contact request failed")?;
        let resp = ensure_success(resp, "razorpay create contact").await?;

        extract_id(resp, "razorpay create contact").await
    }

    /// Payout step 2: attach the beneficiary's bank account to the contact.
    pub async fn create_fund_account(
        &self,
        contact_id: &str,
        beneficiary_name: &str,
        ifsc: &str,
        account_no: &str,
    ) -> Result<String> {
        let body = json!({
            "contact_id": contact_id,
            "account_type": "bank_account",
            "bank_account": {
                "name": beneficiary_name,
                "ifsc": ifsc,
                "account_number": account_no,
            },
        });

        let resp = self
            .http
            .post(format!("{}/v1/fund_accounts", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("razorpay fund account request failed")?;
        let resp = ensure_success(resp, "razorpay create fund account").await?;

        extract_id(resp, "razorpay create fund account").await
    }

    /// Payout step 3: move the money. `payout_ref` doubles as the provider
    /// idempotency key, so a retried sequence settles on one transfer.
    pub async fn trigger_payout(
        &self,
        fund_account_id: &str,
        amount: Decimal,
        purpose: &str,
        payout_ref: &str,
    ) -> Result<RazorpayPayoutHandle> {
        let body = json!({
            "account_number": self.account_number,
            "fund_account_id": fund_account_id,
            "amount": to_minor_units(amount)?,
            "currency": CURRENCY,
            "mode": PAYOUT_MODE,
            "purpose": purpose,
            "queue_if_low_balance": true,
            "reference_id": payout_ref,
            "narration": purpose,
        });

        let resp = self
            .http
            .post(format!("{}/v1/payouts", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("X-Payout-Idempotency", payout_ref)
            .json(&body)
            .send()
            .await
            .context("razorpay payout request failed")?;
        let resp = ensure_success(resp, "razorpay trigger payout").await?;

        let body = resp
            .text()
            .await
            .context("failed to read razorpay payout response")?;
        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|err| {
            GatewayError::malformed("razorpay trigger payout", body.clone(), err.to_string())
        })?;

        let id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::malformed(
                    "razorpay trigger payout",
                    body,
                    "payout id missing in response".to_string(),
                )
            })?
            .to_string();
        let status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(RazorpayPayoutHandle { id, status, raw })
    }

    pub async fn fetch_balance(&self) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/payouts/accounts/{}/balance",
                self.base_url, self.account_number
            ))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .context("razorpay balance request failed")?;
        let resp = ensure_success(resp, "razorpay fetch balance").await?;

        let balance = resp
            .json::<serde_json::Value>()
            .await
            .context("razorpay balance response was not json")?;
        Ok(balance)
    }
}

async fn extract_id(resp: reqwest::Response, context: &'static str) -> Result<String> {
    let body = resp.text().await.context("failed to read response body")?;
    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|err| GatewayError::malformed(context, body.clone(), err.to_string()))?;

    let id = value.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
        GatewayError::malformed(context, body, "id missing in response".to_string())
    })?;

    Ok(id.to_string())
}

fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::from(100))
        .round_dp(0)
        .to_i64()
        .context("amount does not fit in minor units")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(
            "https://api.razorpay.com".to_string(),
            "rzp_test_key".to_string(),
            "rzp_test_secret".to_string(),
            "whsec_test".to_string(),
            "2323230041626905".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn converts_rupees_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(49900, 2)).unwrap(), 49900);
        assert_eq!(to_minor_units(Decimal::from(499)).unwrap(), 49900);
    }

    #[test]
    fn accepts_a_payment_signature_built_with_the_api_secret() {
        let client = client();
        let signature = signing::hmac_sha256_hex(
            "rzp_test_secret",
            &["order_123", "|", "pay_456"],
        )
        .unwrap();

        assert!(client
            .verify_payment_signature("order_123", "pay_456", &signature)
            .unwrap());
    }

    #[test]
    fn rejects_a_tampered_payment_signature() {
        let client = client();
        let signature = signing::hmac_sha256_hex(
            "rzp_test_secret",
            &["order_123", "|", "pay_456"],
        )
        .unwrap();

        assert!(!client
            .verify_payment_signature("order_999", "pay_456", &signature)
            .unwrap());
        assert!(!client
            .verify_payment_signature("order_123", "pay_456", "not-hex")
            .unwrap());
    }

    #[test]
    fn webhook_signature_uses_the_webhook_secret_not_the_api_secret() {
        let client = client();
        let payload = br#"{"event":"order.paid"}"#;

        let with_webhook_secret = {
            let mut mac = HmacSha256::new_from_slice(b"whsec_test").unwrap();
            mac.update(payload);
            hex::encode(mac.finalize().into_bytes())
        };
        let with_api_secret = {
            let mut mac = HmacSha256::new_from_slice(b"rzp_test_secret").unwrap();
            mac.update(payload);
            hex::encode(mac.finalize().into_bytes())
        };

        assert!(client.verify_webhook_signature(payload, &with_webhook_secret));
        assert!(!client.verify_webhook_signature(payload, &with_api_secret));
        assert!(!client.verify_webhook_signature(payload, "garbage"));
    }

    #[test]
    fn parses_order_paid_webhook_payload() {
        let payload = r#"{
            "event": "order.paid",
            "payload": {
                "order": { "entity": { "id": "order_abc123" } },
                "payment": { "entity": { "order_id": "order_abc123" } }
            }
        }"#;

        let event: RazorpayWebhookEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event, "order.paid");
        assert_eq!(event.payload.order.unwrap().entity.id, "order_abc123");
    }
}
