//! Authentication utilities for the LocalBitcoins API
//!
//! Private calls carry three headers: the API key, a nonce and an
//! HMAC-SHA256 signature. The signed message is
//!
//! ```text
//! nonce + api_key + "/api/" + path + "/" + form_encoded_params
//! ```
//!
//! and the signature is the upper-case hex digest keyed with the API secret.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::params::Params;

type HmacSha256 = Hmac<Sha256>;

/// Fixed API path prefix that is part of every signed message
pub const SIGNED_PATH_PREFIX: &str = "/api/";

/// API credentials container
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    otp: Option<String>,
}

impl Credentials {
    /// Create new credentials from API key and secret
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            otp: None,
        }
    }

    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }

    /// Create credentials from environment variables
    ///
    /// Looks for `LOCALBITCOINS_API_KEY`, `LOCALBITCOINS_API_SECRET` and the
    /// optional `LOCALBITCOINS_API_OTP`
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("LOCALBITCOINS_API_KEY")?;
        let api_secret = std::env::var("LOCALBITCOINS_API_SECRET")?;
        let otp = std::env::var("LOCALBITCOINS_API_OTP")
            .ok()
            .filter(|otp| !otp.is_empty());

        Ok(Self {
            api_key,
            api_secret,
            otp,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn otp(&self) -> Option<&str> {
        self.otp.as_deref()
    }

    /// Sign a request for `path` with these credentials
    pub fn sign(&self, path: &str, params: &Params, nonce: u64) -> String {
        sign_request(path, params, nonce, &self.api_key, &self.api_secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("otp", &self.otp.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Build the message that gets signed for a private call
pub fn signature_message(path: &str, params: &Params, nonce: u64, api_key: &str) -> String {
    format!(
        "{}{}{}{}/{}",
        nonce,
        api_key,
        SIGNED_PATH_PREFIX,
        path.trim_matches('/'),
        params.to_form_urlencoded()
    )
}

/// Generate the HMAC-SHA256 signature for a private call
///
/// `path` is the route without the `/api/` prefix, e.g. `contact_info/12`.
pub fn sign_request(
    path: &str,
    params: &Params,
    nonce: u64,
    api_key: &str,
    api_secret: &str,
) -> String {
    let message = signature_message(path, params, nonce, api_key);
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

/// Strictly increasing nonce source
///
/// Nonces are wall-clock milliseconds, bumped past the previous value when
/// two calls land in the same millisecond.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_nonce(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.next_after(now)
    }

    fn next_after(&self, now: u64) -> u64 {
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}
