//! Classified security failures.

use thiserror::Error;

/// The single failure kind produced by the security pipeline.
///
/// Variants are listed in the order they can first occur while a request
/// travels through the kernel and the pipeline. `Display` renders the wire
/// code and nothing else, so logging a violation never leaks detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SecurityViolation {
    #[error("missing_requirements")]
    MissingRequirements,
    #[error("missing_header")]
    MissingHeader,
    #[error("authentication_failed")]
    AuthenticationFailed,
    #[error("nonce_invalid")]
    NonceInvalid,
    #[error("nonce_reuse")]
    NonceReuse,
    #[error("signature_invalid")]
    SignatureInvalid,
    #[error("encryption_key_missing")]
    EncryptionKeyMissing,
    #[error("encryption_invalid")]
    EncryptionInvalid,
    #[error("decryption_failed")]
    DecryptionFailed,
    #[error("scope_missing")]
    ScopeMissing,
    #[error("role_insufficient")]
    RoleInsufficient,
    #[error("rate_limited")]
    RateLimited,
}

impl SecurityViolation {
    /// Canonical wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequirements => "missing_requirements",
            Self::MissingHeader => "missing_header",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NonceInvalid => "nonce_invalid",
            Self::NonceReuse => "nonce_reuse",
            Self::SignatureInvalid => "signature_invalid",
            Self::EncryptionKeyMissing => "encryption_key_missing",
            Self::EncryptionInvalid => "encryption_invalid",
            Self::DecryptionFailed => "decryption_failed",
            Self::ScopeMissing => "scope_missing",
            Self::RoleInsufficient => "role_insufficient",
            Self::RateLimited => "rate_limited",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_code() {
        let all = [
            SecurityViolation::MissingRequirements,
            SecurityViolation::MissingHeader,
            SecurityViolation::AuthenticationFailed,
            SecurityViolation::NonceInvalid,
            SecurityViolation::NonceReuse,
            SecurityViolation::SignatureInvalid,
            SecurityViolation::EncryptionKeyMissing,
            SecurityViolation::EncryptionInvalid,
            SecurityViolation::DecryptionFailed,
            SecurityViolation::ScopeMissing,
            SecurityViolation::RoleInsufficient,
            SecurityViolation::RateLimited,
        ];
        for violation in all {
            assert_eq!(violation.to_string(), violation.code());
        }
    }
}
