use thiserror::Error;

/// Failures of portal operations that callers may want to tell apart.
///
/// Travels inside `anyhow::Error` and is recovered with `downcast_ref`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("Username or password is not set")]
    CredentialMissing,
    #[error("Could not log in to the portal : {0}")]
    AuthenticationFailed(String),
    #[error("Could not reach the portal : {0}")]
    TransportFailure(String),
    #[error("Portal answered not found : {0}")]
    TransientNotFound(String),
    #[error("Access denied by the portal")]
    AccessDenied,
    #[error("Received unexpected content from the portal : {0}")]
    MalformedResponse(String),
    #[error("Submission rejected before sending : {0}")]
    SubmissionRejected(String),
    #[error("Judge has no record of solution {0}")]
    JudgeUnavailable(String),
    #[error("Gave up waiting : {0}")]
    Timeout(String),
}

/// Finds a `PortalError` anywhere in the chain of `err`.
pub fn portal_error(err: &anyhow::Error) -> Option<&PortalError> {
    err.downcast_ref::<PortalError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<PortalError>()))
}
