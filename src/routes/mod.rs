pub mod auth;
pub mod health;
pub mod history;
pub mod questions;
pub mod session;

use crate::error::{Error, Result};
use crate::models::identity::Identity;
use crate::AppState;

/// All data access is scoped to the reconciler's current identity. A guest
/// snapshot left in the artifact store counts as current and is re-adopted.
pub fn current_identity(state: &AppState) -> Result<Identity> {
    state
        .reconciler
        .current_or_restored()
        .ok_or_else(|| Error::Unauthorized("No current identity".to_string()))
}
