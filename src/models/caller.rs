//! Identity of whoever is calling the API.

use serde::{Deserialize, Serialize};

/// Authenticated caller resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedCaller {
    /// Stable owner identifier (token subject).
    pub id: String,
    pub email: Option<String>,
}
