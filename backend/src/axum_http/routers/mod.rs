pub mod payments;
pub mod payouts;
pub mod subscriptions;
pub mod webhooks;
