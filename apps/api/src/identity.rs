//! Identity resolution — maps an inbound request to a stable principal.
//!
//! Verified account identity arrives on headers injected by the identity
//! provider at the edge; guest identity is a self-reported email (no proof
//! of ownership required, abuse is out of scope). Pure mapping, no side
//! effects.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::errors::AppError;

const ACCOUNT_ID_HEADER: &str = "x-account-id";
const ACCOUNT_EMAIL_HEADER: &str = "x-account-email";

/// The resolved identity a request is attributed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Account { id: String, email: String },
    Guest { email: String },
}

impl Principal {
    /// Normalized email — the canonical ledger key for both variants.
    pub fn email(&self) -> &str {
        match self {
            Principal::Account { email, .. } => email,
            Principal::Guest { email } => email,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Principal::Guest { .. })
    }
}

/// Lowercase + trim. Applied at every read and write site; a ledger keyed
/// by raw casing fragments per spelling.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Verified account identity as attested by the identity provider.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub id: String,
    pub email: String,
}

/// Extractor for the optional verified identity on a request.
/// Absence is not an error — guest flows carry no identity headers.
#[derive(Debug, Clone, Default)]
pub struct AuthContext(pub Option<AccountIdentity>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let identity = match (header(ACCOUNT_ID_HEADER), header(ACCOUNT_EMAIL_HEADER)) {
            (Some(id), Some(email)) => Some(AccountIdentity {
                id,
                email: normalize_email(&email),
            }),
            _ => None,
        };

        Ok(AuthContext(identity))
    }
}

/// Produces exactly one principal for a request: a verified account when
/// present, otherwise a guest keyed by the self-reported email.
pub fn resolve(auth: &AuthContext, guest_email: Option<&str>) -> Result<Principal, AppError> {
    if let Some(identity) = &auth.0 {
        return Ok(Principal::Account {
            id: identity.id.clone(),
            email: identity.email.clone(),
        });
    }

    match guest_email.map(normalize_email) {
        Some(email) if !email.is_empty() => Ok(Principal::Guest { email }),
        _ => Err(AppError::Unauthenticated),
    }
}

/// Variant for calls that require a verified account.
pub fn require_account(auth: &AuthContext) -> Result<Principal, AppError> {
    match &auth.0 {
        Some(identity) => Ok(Principal::Account {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }),
        None => Err(AppError::Unauthenticated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, email: &str) -> AuthContext {
        AuthContext(Some(AccountIdentity {
            id: id.to_string(),
            email: normalize_email(email),
        }))
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
        assert_eq!(normalize_email("a@b.com"), "a@b.com");
    }

    #[test]
    fn test_account_wins_over_guest_email() {
        let principal = resolve(&account("u1", "Owner@Example.com"), Some("other@x.com")).unwrap();
        assert_eq!(
            principal,
            Principal::Account {
                id: "u1".to_string(),
                email: "owner@example.com".to_string(),
            }
        );
        assert!(!principal.is_guest());
    }

    #[test]
    fn test_guest_email_is_normalized() {
        let principal = resolve(&AuthContext::default(), Some(" Jane@Mail.COM ")).unwrap();
        assert_eq!(principal.email(), "jane@mail.com");
        assert!(principal.is_guest());
    }

    #[test]
    fn test_no_identity_is_unauthenticated() {
        let err = resolve(&AuthContext::default(), None).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn test_blank_guest_email_is_unauthenticated() {
        let err = resolve(&AuthContext::default(), Some("   ")).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn test_require_account_rejects_guests() {
        assert!(require_account(&AuthContext::default()).is_err());
        assert!(require_account(&account("u1", "a@b.com")).is_ok());
    }
}
