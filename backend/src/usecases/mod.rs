pub mod payouts;
pub mod subscriptions;
