use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A payment/payout provider integrated via its own signed HTTP protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentGateway {
    Razorpay,
    Paynpro,
}

impl PaymentGateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentGateway::Razorpay => "razorpay",
            PaymentGateway::Paynpro => "paynpro",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "razorpay" => Some(PaymentGateway::Razorpay),
            "paynpro" => Some(PaymentGateway::Paynpro),
            _ => None,
        }
    }
}

impl Display for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
