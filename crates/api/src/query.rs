//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query string of a signed download link (`?expires=&signature=`).
#[derive(Debug, Deserialize)]
pub struct SignedLinkParams {
    pub expires: i64,
    pub signature: String,
}
