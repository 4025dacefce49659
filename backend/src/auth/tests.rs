use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

fn set_env_vars() {
    unsafe {
        env::set_var("SERVER_PORT_BACKEND", "8080");
        env::set_var("SERVER_BODY_LIMIT", "10");
        env::set_var("SERVER_TIMEOUT", "30");
        env::set_var("DATABASE_URL", "postgres://localhost:5432/db");
        env::set_var("JWT_SECRET", "supersecretjwtsecretforunittesting123");
        env::set_var("RAZORPAY_API_KEY", "rzp_test_key");
        env::set_var("RAZORPAY_API_SECRET", "rzp_test_secret");
        env::set_var("RAZORPAY_WEBHOOK_SECRET", "whsec_test");
        env::set_var("RAZORPAY_ACCOUNT_NUMBER", "2323230041626905");
        env::set_var("PAYNPRO_BASE_URL", "https://pg.example.test");
        env::set_var("PAYNPRO_PAYOUT_URL", "https://payout.example.test");
        env::set_var("PAYNPRO_API_KEY", "pnp_key");
        env::set_var("PAYNPRO_API_SECRET", "pnp_secret");
        env::set_var("PAYNPRO_ENCRYPTION_KEY", "0123456789abcdef");
        env::set_var("PAYNPRO_SALT_KEY", "fedcba9876543210");
        env::set_var("PAYNPRO_NOTIFY_URL", "https://example.test/webhooks/paynpro");
        env::set_var("PAYNPRO_RETURN_URL", "https://example.test/dashboard");
    }
}

#[test]
fn test_validate_jwt_success() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 9999999999, // far future
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let claims = validate_jwt(&token).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_jwt_expired() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 1, // past
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_jwt(&token);
    assert!(result.is_err());
}

#[test]
fn test_validate_jwt_invalid_signature() {
    set_env_vars();
    let secret = "wrongsecret";
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        email: Some("test@example.com".to_string()),
        exp: 9999999999,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_jwt(&token);
    assert!(result.is_err());
}

#[test]
fn test_admin_role_detection() {
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        email: None,
        role: "admin".to_string(),
    };
    let user = AuthUser {
        user_id: Uuid::new_v4(),
        email: None,
        role: "user".to_string(),
    };

    assert!(admin.is_admin());
    assert!(!user.is_admin());
}
