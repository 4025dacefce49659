pub mod payments;
pub mod payouts;
pub mod plans;
pub mod subscriptions;
pub mod users;
