//! Token verification for method calls.
//!
//! Regular callers present `sha512(account + login + SALT)`. The admin login
//! presents `sha512(YYYYMMDDHH + ADMIN_SALT)` for the current local hour, so an
//! admin token stops working when the hour rolls over.

use crate::models::MethodEnvelope;
use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha512};

/// Salt appended to `account + login` for regular callers.
pub const SALT: &str = "Otus";

/// Salt appended to the hour stamp for the admin login.
pub const ADMIN_SALT: &str = "42";

const HOUR_STAMP_FORMAT: &str = "%Y%m%d%H";

/// Checks the envelope token against the current local time.
pub fn verify(envelope: &MethodEnvelope) -> bool {
    verify_at(envelope, Local::now().naive_local())
}

/// Checks the envelope token as of `now`.
pub fn verify_at(envelope: &MethodEnvelope, now: NaiveDateTime) -> bool {
    let Some(token) = envelope.token() else {
        return false;
    };

    let expected = if envelope.is_admin() {
        admin_token(now)
    } else {
        user_token(
            envelope.account().unwrap_or_default(),
            envelope.login().unwrap_or_default(),
        )
    };

    constant_time_compare(token, &expected)
}

/// Admin token valid during the hour containing `now`.
pub fn admin_token(now: NaiveDateTime) -> String {
    sha512_hex(&format!("{}{}", now.format(HOUR_STAMP_FORMAT), ADMIN_SALT))
}

/// Token of a regular caller.
pub fn user_token(account: &str, login: &str) -> String {
    sha512_hex(&format!("{}{}{}", account, login, SALT))
}

fn sha512_hex(content: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
