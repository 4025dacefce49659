#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: Auth,
    pub razorpay: Razorpay,
    pub paynpro: Paynpro,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Razorpay {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Webhook deliveries are signed with their own secret, not the API one.
    pub webhook_secret: String,
    pub payout_account_number: String,
}

#[derive(Debug, Clone)]
pub struct Paynpro {
    pub base_url: String,
    pub payout_base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub encryption_key: String,
    pub salt_key: String,
    pub notify_url: String,
    pub return_url: String,
}
