use serde::Serialize;

/// Client-facing parameters returned from a successful order creation.
///
/// The card/order provider hands back an order the client completes in an
/// embedded checkout; the encrypted-order provider hands back a hosted page
/// the client is redirected to. Field names follow each provider's checkout
/// integration contract.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CheckoutParams {
    Order {
        #[serde(rename = "orderId")]
        order_id: String,
        amount: i64,
        currency: String,
        key: String,
        name: String,
        description: String,
    },
    Redirect {
        #[serde(rename = "payUrl")]
        pay_url: String,
        #[serde(rename = "tradeNo")]
        trade_no: String,
    },
}

/// Input for creating a provider order during subscription initiation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderRequest {
    pub amount: rust_decimal::Decimal,
    /// Internal trade reference, generated before the provider call.
    pub trade_ref: String,
    pub plan_name: String,
    pub customer_name: String,
    pub email: String,
    pub mobile: Option<String>,
}
