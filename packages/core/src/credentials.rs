//! Application credentials and access tokens.
//!
//! Neither type ever prints its secret part through `Debug` or `Display`;
//! use [`App::secret`] or [`AccessToken::value`] when the raw string is
//! genuinely needed.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AdextError;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// An application registered with the API: its id and shared secret.
#[derive(Clone, PartialEq, Eq)]
pub struct App {
    id: String,
    secret: String,
}

impl App {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The app access token, `"{id}|{secret}"`.
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(format!("{}|{}", self.id, self.secret))
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("secret", &"<secret>")
            .finish()
    }
}

/// Parses the serialized `"id|secret"` form.
impl std::str::FromStr for App {
    type Err = AdextError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => Ok(App::new(id, secret)),
            _ => Err(AdextError::Config(
                "app must be serialized as \"<id>|<secret>\"".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// A bearer credential, optionally with a known expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    /// The raw token string as sent on the wire.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// App tokens have the form `id|secret`.
    pub fn is_app_access_token(&self) -> bool {
        self.value.contains('|')
    }

    /// `false` when no expiry is known.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at < Utc::now())
    }

    /// A token is long-lived when it expires more than two hours from now.
    pub fn is_long_lived(&self) -> bool {
        match self.expires_at {
            Some(at) => at > Utc::now() + Duration::hours(2),
            None => self.is_app_access_token(),
        }
    }

    /// HMAC-SHA256 of the token value keyed by `app_secret`, hex-encoded.
    pub fn app_secret_proof(&self, app_secret: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(app_secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(self.value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<secret>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl From<&str> for AccessToken {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for AccessToken {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_access_token_joins_id_and_secret() {
        let app = App::new("123", "foo_secret");
        let token = app.access_token();
        assert_eq!(token.value(), "123|foo_secret");
        assert!(token.is_app_access_token());
        assert!(token.is_long_lived());
    }

    #[test]
    fn app_round_trips_through_serialized_form() {
        let app: App = "123|s3cr3t".parse().unwrap();
        assert_eq!(app.id(), "123");
        assert_eq!(app.secret(), "s3cr3t");
        assert!("nosecret".parse::<App>().is_err());
        assert!("|x".parse::<App>().is_err());
    }

    #[test]
    fn debug_never_shows_secrets() {
        let app = App::new("123", "hunter2");
        assert!(!format!("{app:?}").contains("hunter2"));
        let token = AccessToken::new("EAAB-token");
        assert!(!format!("{token:?}").contains("EAAB"));
        assert_eq!(token.to_string(), "<secret>");
    }

    #[test]
    fn app_secret_proof_matches_known_hmac() {
        // HMAC-SHA256(key = "key", msg = "The quick brown fox jumps over the lazy dog")
        let token = AccessToken::new("The quick brown fox jumps over the lazy dog");
        assert_eq!(
            token.app_secret_proof("key"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn expiry_checks() {
        let past = AccessToken::with_expiry("t", Utc::now() - Duration::minutes(1));
        assert!(past.is_expired());
        assert!(!past.is_long_lived());

        let soon = AccessToken::with_expiry("t", Utc::now() + Duration::minutes(30));
        assert!(!soon.is_expired());
        assert!(!soon.is_long_lived());

        let later = AccessToken::with_expiry("t", Utc::now() + Duration::days(60));
        assert!(later.is_long_lived());

        assert!(!AccessToken::new("t").is_expired());
    }
}
