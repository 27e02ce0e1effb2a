//! Cloud error types.

use thiserror::Error;

/// Errors from the remote document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Not signed in to cloud sync")]
    NotSignedIn,

    #[error("Cloud sync is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cloud request failed with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from cloud: {0}")]
    InvalidResponse(String),
}

/// Sign-in failures, classified so the user can be told the remedy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(
        "Sign-in origin is not authorized for this project ({0}). \
         Add it to the authorized domains in the project's authentication settings."
    )]
    UnauthorizedDomain(String),

    #[error("Could not open the sign-in window ({0}). Allow pop-ups or open a browser manually.")]
    PopupBlocked(String),

    #[error("Sign-in failed: {0}")]
    Other(String),
}
