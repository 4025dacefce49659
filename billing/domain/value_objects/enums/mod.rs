pub mod payment_gateways;
pub mod payment_statuses;
pub mod payout_statuses;
pub mod subscription_statuses;
