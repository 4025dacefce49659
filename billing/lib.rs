pub mod domain;
pub mod gateways;
pub mod infra;
pub mod observability;
