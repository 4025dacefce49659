pub mod checkout;
pub mod enums;
pub mod payouts;
pub mod subscriptions;
