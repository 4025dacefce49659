use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the caller-ordered concatenation of `parts`, lowercase
/// hex. The field order is part of each provider's protocol contract;
/// reordering or dropping a field produces a digest the provider rejects.
pub fn hmac_sha256_hex(secret: &str, parts: &[&str]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("HMAC key rejected by the runtime")?;
    for part in parts {
        mac.update(part.as_bytes());
    }
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Legacy checksum scheme: sort keys lexicographically, skip the key named
/// `sign`, concatenate values, append the secret as a trailing salt, MD5 to
/// lowercase hex. Retained for protocol compatibility only.
pub fn md5_checksum(secret: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let mut concatenated = String::new();
    for (key, value) in sorted {
        if *key == "sign" {
            continue;
        }
        concatenated.push_str(value);
    }
    concatenated.push_str(secret);

    format!("{:x}", md5::compute(concatenated.as_bytes()))
}

/// AES-CBC with PKCS#7 padding, base64-encoded for transport. The IV is the
/// raw bytes of `iv_seed`, which must therefore be exactly one cipher block
/// (16 bytes); the key must be 16, 24 or 32 bytes. A wrong length is a
/// configuration error and surfaces as `Err` -- a silently broken cipher
/// would make every request fail provider-side authentication.
pub fn aes_cbc_encrypt_base64(plaintext: &str, key: &str, iv_seed: &str) -> Result<String> {
    use aes::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

    let iv = iv_seed.as_bytes();
    if iv.len() != 16 {
        bail!(
            "AES IV seed must be exactly 16 bytes, got {} bytes",
            iv.len()
        );
    }

    let key_bytes = key.as_bytes();
    let ciphertext = match key_bytes.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key_bytes, iv)
            .context("AES-128 key rejected")?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key_bytes, iv)
            .context("AES-192 key rejected")?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key_bytes, iv)
            .context("AES-256 key rejected")?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
        other => bail!("AES key must be 16, 24 or 32 bytes, got {other} bytes"),
    };

    Ok(BASE64.encode(ciphertext))
}

/// Constant-time comparison for signature verification on untrusted input.
pub fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.ct_eq(right).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_matches_known_vector_and_is_deterministic() {
        // RFC-style vector: HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let digest =
            hmac_sha256_hex("key", &["The quick brown fox ", "jumps over the lazy dog"]).unwrap();
        assert_eq!(
            digest,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );

        let again =
            hmac_sha256_hex("key", &["The quick brown fox ", "jumps over the lazy dog"]).unwrap();
        assert_eq!(digest, again);
    }

    #[test]
    fn hmac_is_sensitive_to_field_order() {
        let ordered = hmac_sha256_hex("secret", &["alpha", "beta", "gamma"]).unwrap();
        let reordered = hmac_sha256_hex("secret", &["beta", "alpha", "gamma"]).unwrap();
        assert_ne!(ordered, reordered);
    }

    #[test]
    fn md5_checksum_sorts_keys_and_salts_with_secret() {
        // Values sorted by key concatenate to "ab", salt "c" appended: md5("abc").
        let digest = md5_checksum("c", &[("b", "b"), ("a", "a")]);
        assert_eq!(digest, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn md5_checksum_excludes_the_sign_field() {
        let without = md5_checksum("salt", &[("amount", "499.00"), ("order", "PNP_1")]);
        let with = md5_checksum(
            "salt",
            &[("amount", "499.00"), ("order", "PNP_1"), ("sign", "garbage")],
        );
        assert_eq!(without, with);
    }

    #[test]
    fn aes_roundtrip_recovers_plaintext() {
        use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

        let key = "0123456789abcdef";
        let iv_seed = "fedcba9876543210";
        let encoded = aes_cbc_encrypt_base64("{\"amount\":\"499.00\"}", key, iv_seed).unwrap();

        let ciphertext = BASE64.decode(&encoded).unwrap();
        let decrypted = cbc::Decryptor::<aes::Aes128>::new_from_slices(
            key.as_bytes(),
            iv_seed.as_bytes(),
        )
        .unwrap()
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .unwrap();

        assert_eq!(decrypted, b"{\"amount\":\"499.00\"}");
    }

    #[test]
    fn aes_rejects_bad_iv_and_key_lengths() {
        assert!(aes_cbc_encrypt_base64("data", "0123456789abcdef", "short-iv").is_err());
        assert!(aes_cbc_encrypt_base64("data", "short-key", "fedcba9876543210").is_err());
    }

    #[test]
    fn constant_time_eq_distinguishes_unequal_input() {
        assert!(constant_time_eq(b"same-digest", b"same-digest"));
        assert!(!constant_time_eq(b"same-digest", b"other-digest"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }
}
