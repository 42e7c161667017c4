// src/utils/token.rs

use rand::{RngCore, rngs::OsRng};

/// Random lowercase hex string built from `bytes` random bytes.
fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Opaque single-use token for email verification and password reset links.
pub fn generate_token() -> String {
    random_hex(32)
}

/// Collision-resistant base name for stored uploads.
pub fn random_file_stem() -> String {
    random_hex(16)
}
