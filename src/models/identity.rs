use serde::{Deserialize, Serialize};

pub const GUEST_ID_PREFIX: &str = "guest-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Authenticated,
    Guest,
}

/// A user session identity. Either delivered by the external identity
/// provider (Authenticated) or synthesized locally (Guest). Guest identities
/// are never validated against the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
    pub kind: IdentityKind,
}

impl Identity {
    pub fn guest(id: String) -> Self {
        Self {
            id,
            display_name: "Guest".to_string(),
            email: String::new(),
            avatar_url: String::new(),
            kind: IdentityKind::Guest,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.kind == IdentityKind::Guest
    }
}
