use anyhow::{Ok, Result};

use super::config_model::{Auth, BackendServer, Database, DotEnvyConfig, Paynpro, Razorpay};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let auth = Auth {
        jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET is invalid"),
    };

    let razorpay = Razorpay {
        base_url: std::env::var("RAZORPAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
        key_id: std::env::var("RAZORPAY_API_KEY").expect("RAZORPAY_API_KEY is invalid"),
        key_secret: std::env::var("RAZORPAY_API_SECRET").expect("RAZORPAY_API_SECRET is invalid"),
        webhook_secret: std::env::var("RAZORPAY_WEBHOOK_SECRET")
            .expect("RAZORPAY_WEBHOOK_SECRET is invalid"),
        payout_account_number: std::env::var("RAZORPAY_ACCOUNT_NUMBER")
            .expect("RAZORPAY_ACCOUNT_NUMBER is invalid"),
    };

    let paynpro = Paynpro {
        base_url: std::env::var("PAYNPRO_BASE_URL").expect("PAYNPRO_BASE_URL is invalid"),
        payout_base_url: std::env::var("PAYNPRO_PAYOUT_URL")
            .expect("PAYNPRO_PAYOUT_URL is invalid"),
        api_key: std::env::var("PAYNPRO_API_KEY").expect("PAYNPRO_API_KEY is invalid"),
        api_secret: std::env::var("PAYNPRO_API_SECRET").expect("PAYNPRO_API_SECRET is invalid"),
        encryption_key: std::env::var("PAYNPRO_ENCRYPTION_KEY")
            .expect("PAYNPRO_ENCRYPTION_KEY is invalid"),
        salt_key: std::env::var("PAYNPRO_SALT_KEY").expect("PAYNPRO_SALT_KEY is invalid"),
        notify_url: std::env::var("PAYNPRO_NOTIFY_URL").expect("PAYNPRO_NOTIFY_URL is invalid"),
        return_url: std::env::var("PAYNPRO_RETURN_URL").expect("PAYNPRO_RETURN_URL is invalid"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        razorpay,
        paynpro,
    })
}
