//! Typed errors for session and template operations
//!
//! None of these are fatal. Each one maps to something the front end shows
//! the user, after which the session carries on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckError {
    /// Daily copy quota used up; recovered by waiting for the reset.
    #[error("daily copy limit reached, resets in {resets_in}")]
    QuotaExhausted { resets_in: String },

    #[error("no prompt matches '{0}'")]
    UnknownPrompt(String),

    #[error("chain is empty")]
    EmptyChain,

    #[error("nothing selected")]
    EmptySelection,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Mutation attempted without a signed-in identity.
    #[error("sign in required to save templates")]
    NotAuthenticated,

    #[error("template not found: {0}")]
    NotFound(String),

    /// Failure reported by the template store, passed through verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("malformed template data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DeckError {
    /// Whether this is the quota-exhausted condition
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }
}
