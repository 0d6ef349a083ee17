//! HMAC-SHA256 hex signatures, the scheme the gateway uses for both client
//! capture callbacks and server-to-server webhooks. Verification fails
//! closed on any malformed input.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature. Invalid hex is just a failed
/// verification, never an error.
pub fn verify(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let claimed = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(message);
    mac.verify_slice(&claimed).is_ok()
}

/// The message a client capture callback signs: gateway order and payment
/// references joined by a pipe.
pub fn capture_message(order_ref: &str, payment_ref: &str) -> String {
    format!("{}|{}", order_ref, payment_ref)
}
