use serde::{Deserialize, Serialize};

/// A signed-in user as reported by the identity provider
///
/// The deck never authenticates anyone itself. A missing identity means
/// the user is a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}
