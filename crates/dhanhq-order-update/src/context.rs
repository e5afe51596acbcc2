/*
[INPUT]:  Caller-owned context holding client identity and access token
[OUTPUT]: Credential snapshot used for the login handshake
[POS]:    Auth layer - credential provider seam
[UPDATE]: When the login payload needs more identity fields
*/

use std::fmt;

/// Source of the two values the login handshake needs.
///
/// Read once when the client is constructed; nothing is validated locally,
/// the server is the only authority on whether the values are correct.
pub trait CredentialProvider {
    fn client_id(&self) -> String;
    fn access_token(&self) -> String;
}

/// Plain credential pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl CredentialProvider for Credentials {
    fn client_id(&self) -> String {
        self.client_id.clone()
    }

    fn access_token(&self) -> String {
        self.access_token.clone()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_provider_returns_values() {
        let credentials = Credentials::new("1100003626", "token-abc");
        assert_eq!(credentials.client_id(), "1100003626");
        assert_eq!(credentials.access_token(), "token-abc");
    }

    #[test]
    fn test_debug_hides_token() {
        let credentials = Credentials::new("1100003626", "token-abc");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("1100003626"));
        assert!(!rendered.contains("token-abc"));
    }
}
