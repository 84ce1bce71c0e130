/*
[INPUT]:  Error sources (signature recovery, tokens, storage, provider, config)
[OUTPUT]: Structured error types with retry hints and caller-facing next steps
[POS]:    Error handling layer - unified error type for the entire crate
[UPDATE]: When adding new error sources or changing boundary messages
*/

use thiserror::Error;

/// Main error type for keybridge
#[derive(Error, Debug)]
pub enum KeybridgeError {
    /// Signature could not be parsed or no address could be recovered from it
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    /// Claimed wallet address is not a 0x-prefixed 20-byte hex string
    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    /// Phone number is empty or not in international format
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// Recovered signer differs from the claimed wallet address
    #[error("Signature does not match wallet address")]
    SignatureMismatch,

    /// Wallet login failed; the specific reason is only traced, never returned
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// No account with the given identifier
    #[error("Account not found")]
    AccountNotFound,

    /// Bearer token is malformed, forged or unknown
    #[error("Invalid session token")]
    InvalidToken,

    /// Session or provider session is past its validity window
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Session was revoked by logout
    #[error("Session revoked, please sign in again")]
    SessionRevoked,

    /// Wallet has no linked provider account
    #[error("No provider account linked to this wallet, please link one first")]
    NotLinked,

    /// Wallet is linked but no provider session is cached
    #[error("Provider account not authenticated, please sign in to the provider")]
    NotAuthenticated,

    /// Provider refused the verification code or the sign-in
    #[error("Provider rejected the sign-in: {0}")]
    AuthenticationRejected(String),

    /// Provider could not be reached in time
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider credentials are missing or invalid
    #[error("Provider credentials not configured: {0}")]
    InvalidCredentialsConfigured(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential store rejected an operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid response from the provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KeybridgeError {
    /// Check if the caller may retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KeybridgeError::ProviderUnavailable(_)
                | KeybridgeError::Http(_)
                | KeybridgeError::InvalidResponse(_)
        )
    }

    /// Check if error indicates the caller's wallet session is unusable
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            KeybridgeError::AuthenticationFailed
                | KeybridgeError::InvalidToken
                | KeybridgeError::SessionExpired
                | KeybridgeError::SessionRevoked
        )
    }

    /// Actionable hint for linkage and session failures
    pub fn next_step(&self) -> Option<&'static str> {
        match self {
            KeybridgeError::NotLinked => Some("link a provider account"),
            KeybridgeError::NotAuthenticated | KeybridgeError::SessionExpired => {
                Some("request a new verification code and sign in again")
            }
            KeybridgeError::AuthenticationRejected(_) => {
                Some("check the verification code or request a new one")
            }
            KeybridgeError::ProviderUnavailable(_) => Some("retry later"),
            KeybridgeError::SessionRevoked | KeybridgeError::InvalidToken => {
                Some("sign in with your wallet again")
            }
            _ => None,
        }
    }
}

/// Result type alias for keybridge operations
pub type Result<T> = std::result::Result<T, KeybridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let unavailable = KeybridgeError::ProviderUnavailable("timeout".to_string());
        assert!(unavailable.is_retryable());

        assert!(!KeybridgeError::SessionRevoked.is_retryable());
        assert!(!KeybridgeError::NotLinked.is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        assert!(KeybridgeError::AuthenticationFailed.is_auth_error());
        assert!(KeybridgeError::SessionExpired.is_auth_error());
        assert!(!KeybridgeError::NotAuthenticated.is_auth_error());
    }

    #[test]
    fn test_boundary_messages_do_not_leak_detail() {
        let message = KeybridgeError::AuthenticationFailed.to_string();
        assert_eq!(message, "Authentication failed");
        assert_eq!(
            KeybridgeError::NotLinked.next_step(),
            Some("link a provider account")
        );
    }
}
