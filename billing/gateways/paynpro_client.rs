use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::{
    domain::value_objects::payouts::PayoutDispatch,
    gateways::{GatewayError, ensure_success, signing},
};

const CURRENCY: &str = "INR";
const TXN_TYPE: &str = "IMPS";

#[derive(Debug, Clone)]
pub struct PaynproSettings {
    pub base_url: String,
    pub payout_base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub encryption_key: String,
    pub salt_key: String,
    pub notify_url: String,
    pub return_url: String,
}

/// Paynpro client: AES-encrypted hosted-page order creation and the
/// single-call signed payout protocol.
pub struct PaynproClient {
    http: reqwest::Client,
    settings: PaynproSettings,
}

#[derive(Debug, Clone)]
pub struct PaynproOrder {
    pub pay_url: String,
    pub trade_no: String,
}

impl PaynproClient {
    pub fn new(settings: PaynproSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build paynpro http client")?;

        Ok(Self { http, settings })
    }

    /// Creates a hosted-page order. The signature covers the documented field
    /// order (key, secret, currency, amount, name, email, mobile); the signed
    /// JSON payload is AES-CBC encrypted with the configured key/salt and
    /// POSTed form-encoded as `key_id` + `data`.
    pub async fn create_order(
        &self,
        amount: Decimal,
        trade_no: &str,
        name: &str,
        email: &str,
        mobile: &str,
    ) -> Result<PaynproOrder> {
        let amount = amount.to_string();
        let signature = signing::hmac_sha256_hex(
            &self.settings.api_secret,
            &[
                &self.settings.api_key,
                &self.settings.api_secret,
                CURRENCY,
                &amount,
                name,
                email,
                mobile,
            ],
        )?;

        let payload = json!({
            "amount": amount,
            "tradeNo": trade_no,
            "key_id": self.settings.api_key,
            "key_secret": self.settings.api_secret,
            "mobile": mobile,
            "txnCurr": CURRENCY,
            "email": email,
            "name": name,
            "signature": signature,
            "notifyUrl": self.settings.notify_url,
            "returnUrl": self.settings.return_url,
        });

        let encrypted = signing::aes_cbc_encrypt_base64(
            &payload.to_string(),
            &self.settings.encryption_key,
            &self.settings.salt_key,
        )?;

        info!(trade_no, "paynpro: sending encrypted order request");

        let resp = self
            .http
            .post(format!(
                "{}/payment/gateway/test/request",
                self.settings.base_url
            ))
            .form(&[
                ("key_id", self.settings.api_key.as_str()),
                ("data", encrypted.as_str()),
            ])
            .send()
            .await
            .context("paynpro order request failed")?;
        let resp = ensure_success(resp, "paynpro create order").await?;

        let body = resp
            .text()
            .await
            .context("failed to read paynpro order response")?;
        let value: serde_json::Value = serde_json::from_str(&body).map_err(|err| {
            GatewayError::malformed("paynpro create order", body.clone(), err.to_string())
        })?;

        let pay_url = value
            .pointer("/data/payUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::malformed(
                    "paynpro create order",
                    body,
                    "payUrl missing in response".to_string(),
                )
            })?
            .to_string();

        Ok(PaynproOrder {
            pay_url,
            trade_no: trade_no.to_string(),
        })
    }

    /// Single-call payout. The provider's parser expects fixed arity, so
    /// absent optional fields go out as empty strings rather than being
    /// omitted.
    pub async fn initiate_payout(&self, dispatch: &PayoutDispatch) -> Result<serde_json::Value> {
        let amount = dispatch.amount.to_string();
        let signature = signing::hmac_sha256_hex(
            &self.settings.api_secret,
            &[
                &dispatch.beneficiary.beneficiary_name,
                &dispatch.user_email,
                &dispatch.user_name,
                &amount,
                &dispatch.payout_ref,
                TXN_TYPE,
            ],
        )?;

        let body = json!({
            "username": dispatch.user_name,
            "email_id": dispatch.user_email,
            "mob_no": dispatch.beneficiary.mobile.clone().unwrap_or_default(),
            "amount": amount,
            "payout_ref": dispatch.payout_ref,
            "txn_type": TXN_TYPE,
            "recv_bank_ifsc": dispatch.beneficiary.ifsc,
            "recv_name": dispatch.beneficiary.beneficiary_name,
            "recv_bank_name": dispatch.beneficiary.bank_name.clone().unwrap_or_default(),
            "purpose": dispatch.purpose,
            "recv_acc_no": dispatch.beneficiary.account_no,
            "signature": signature,
        });

        self.signed_payout_call("/payout/v1/transfer", "paynpro initiate payout", &body)
            .await
    }

    pub async fn payout_status(&self, payout_ref: &str) -> Result<serde_json::Value> {
        let signature = signing::hmac_sha256_hex(&self.settings.api_secret, &[payout_ref])?;
        let body = json!({
            "payout_ref": payout_ref,
            "signature": signature,
        });

        self.signed_payout_call("/payout/v1/getStatus", "paynpro payout status", &body)
            .await
    }

    pub async fn txn_report(&self, start_date: &str, end_date: &str) -> Result<serde_json::Value> {
        let body = json!({
            "startDate": start_date,
            "endDate": end_date,
        });

        self.signed_payout_call("/payout/v1/getTxnReport", "paynpro txn report", &body)
            .await
    }

    pub async fn statement(&self, start_date: &str, end_date: &str) -> Result<serde_json::Value> {
        let body = json!({
            "startDate": start_date,
            "endDate": end_date,
        });

        self.signed_payout_call("/payout/v1/getStatement", "paynpro statement", &body)
            .await
    }

    pub async fn fetch_balance(&self) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(format!(
                "{}/payout/v1/fetchBalance",
                self.settings.payout_base_url
            ))
            .header("X-APIKEY", &self.settings.api_key)
            .header("X-APISECRET", &self.settings.api_secret)
            .send()
            .await
            .context("paynpro balance request failed")?;
        let resp = ensure_success(resp, "paynpro fetch balance").await?;

        let balance = resp
            .json::<serde_json::Value>()
            .await
            .context("paynpro balance response was not json")?;
        Ok(balance)
    }

    /// Best-effort checksum verification for callbacks that carry a `sign`
    /// field. The checksum covers every other field, keys sorted, with the
    /// API secret as trailing salt.
    pub fn verify_callback_checksum(&self, params: &[(&str, &str)], provided_sign: &str) -> bool {
        let expected = signing::md5_checksum(&self.settings.api_secret, params);
        signing::constant_time_eq(expected.as_bytes(), provided_sign.to_lowercase().as_bytes())
    }

    async fn signed_payout_call(
        &self,
        path: &str,
        context: &'static str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(format!("{}{}", self.settings.payout_base_url, path))
            .header("X-APIKEY", &self.settings.api_key)
            .header("X-APISECRET", &self.settings.api_secret)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{context} request failed"))?;
        let resp = ensure_success(resp, context).await?;

        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read {context} response"))?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|err| GatewayError::malformed(context, body, err.to_string()))?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PaynproClient {
        PaynproClient::new(PaynproSettings {
            base_url: "https://pg.example.test".to_string(),
            payout_base_url: "https://payout.example.test".to_string(),
            api_key: "pnp_key".to_string(),
            api_secret: "pnp_secret".to_string(),
            encryption_key: "0123456789abcdef".to_string(),
            salt_key: "fedcba9876543210".to_string(),
            notify_url: "https://example.test/api/v1/webhooks/paynpro".to_string(),
            return_url: "https://example.test/dashboard".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn callback_checksum_accepts_matching_sign_in_any_field_order() {
        let client = client();
        let sign = signing::md5_checksum(
            "pnp_secret",
            &[("status", "SUCCESS"), ("tradeNo", "PNP_1")],
        );

        // Same fields presented in a different order verify identically.
        assert!(client.verify_callback_checksum(
            &[("tradeNo", "PNP_1"), ("status", "SUCCESS")],
            &sign
        ));
        assert!(!client.verify_callback_checksum(
            &[("tradeNo", "PNP_2"), ("status", "SUCCESS")],
            &sign
        ));
    }
}
