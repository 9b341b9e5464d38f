use crate::models::identity::Identity;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatusResponse {
    pub identity: Option<Identity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    /// False when the user dismissed the provider popup; not an error.
    pub signed_in: bool,
    pub identity: Option<Identity>,
}
