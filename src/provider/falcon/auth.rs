//! OAuth2 client-credentials flow against `/oauth2/token`.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Refresh tokens this long before Falcon says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// API client credentials. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct FalconCredentials {
    client_id: String,
    client_secret: String,
}

impl FalconCredentials {
    pub const fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(super) fn form(&self) -> [(&'static str, &str); 2] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
    }
}

impl fmt::Debug for FalconCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FalconCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// A bearer token and when to stop using it.
#[derive(Clone)]
pub(super) struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    pub fn new(response: TokenResponse) -> Self {
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        Self {
            value: response.access_token,
            refresh_at: Instant::now() + lifetime,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness() {
        let fresh = AccessToken::new(TokenResponse {
            access_token: "t".to_string(),
            expires_in: 1799,
        });
        assert!(fresh.is_fresh());

        let stale = AccessToken::new(TokenResponse {
            access_token: "t".to_string(),
            expires_in: 30,
        });
        assert!(!stale.is_fresh());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = FalconCredentials::new("id".to_string(), "s3cr3t".to_string());
        let debug = format!("{credentials:?}");
        assert!(debug.contains("id"));
        assert!(!debug.contains("s3cr3t"));
    }
}
