pub mod clock;
pub mod signer;
pub mod store;

/// Reasons a presented token is refused.
///
/// The variants exist for diagnostics only; every one of them is reported to
/// the caller as the same "unauthorized" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token not active")]
    Revoked,
}
