use crate::error::{AuthError, Error, Result};
use crate::models::identity::{Identity, IdentityKind, GUEST_ID_PREFIX};
use crate::models::question::Question;
use crate::utils::token::random_suffix;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Boundary to the external identity provider. Sign-in/sign-out are request
/// driven; `updates` is the provider's push channel for authenticated
/// identity changes (`None` meaning "no authenticated user").
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> std::result::Result<Identity, AuthError>;
    async fn sign_out(&self) -> std::result::Result<(), AuthError>;
    fn updates(&self) -> broadcast::Receiver<Option<Identity>>;
}

#[derive(Debug, Deserialize)]
struct BrokerIdentity {
    id: String,
    display_name: String,
    email: String,
    #[serde(default)]
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct BrokerError {
    code: String,
    #[serde(default)]
    message: String,
}

/// Identity provider backed by the auth broker's HTTP API. Successful
/// sign-ins and sign-outs are echoed onto the push channel the same way the
/// broker's own listener would deliver them.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    origin: String,
    pushes: broadcast::Sender<Option<Identity>>,
}

impl HttpIdentityProvider {
    pub fn new(client: Client, base_url: String, origin: String) -> Self {
        let (pushes, _) = broadcast::channel(16);
        Self {
            client,
            base_url,
            origin,
            pushes,
        }
    }

    fn classify(&self, err: BrokerError) -> AuthError {
        match err.code.as_str() {
            "popup_closed_by_user" | "cancelled_popup_request" => AuthError::PopupDismissed,
            "unauthorized_domain" => AuthError::DomainUnauthorized {
                origin: self.origin.clone(),
            },
            other => AuthError::Unknown(format!("{}: {}", other, err.message)),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self) -> std::result::Result<Identity, AuthError> {
        let res = self
            .client
            .post(format!("{}/signin", self.base_url))
            .json(&serde_json::json!({ "origin": self.origin }))
            .send()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        if !res.status().is_success() {
            let err: BrokerError = res.json().await.unwrap_or(BrokerError {
                code: "broker_error".to_string(),
                message: String::new(),
            });
            return Err(self.classify(err));
        }

        let broker: BrokerIdentity = res
            .json()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        let identity = Identity {
            id: broker.id,
            display_name: broker.display_name,
            email: broker.email,
            avatar_url: broker.avatar_url,
            kind: IdentityKind::Authenticated,
        };
        let _ = self.pushes.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        self.client
            .post(format!("{}/signout", self.base_url))
            .send()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        let _ = self.pushes.send(None);
        Ok(())
    }

    fn updates(&self) -> broadcast::Receiver<Option<Identity>> {
        self.pushes.subscribe()
    }
}

#[derive(Debug, Clone)]
struct CachedQuestions {
    owner_id: String,
    questions: Vec<Question>,
}

/// The two local-only keyed blobs: the current guest identity snapshot and
/// the locally cached question list. Both are cleared in full on every
/// identity-kind transition so a new identity inherits zero local state.
#[derive(Default)]
pub struct ArtifactCache {
    guest: Mutex<Option<Identity>>,
    questions: Mutex<Option<CachedQuestions>>,
}

impl ArtifactCache {
    pub fn store_guest(&self, identity: &Identity) {
        *self.guest.lock().expect("artifact mutex poisoned") = Some(identity.clone());
    }

    pub fn guest_snapshot(&self) -> Option<Identity> {
        self.guest.lock().expect("artifact mutex poisoned").clone()
    }

    pub fn cache_questions(&self, owner_id: &str, questions: Vec<Question>) {
        *self.questions.lock().expect("artifact mutex poisoned") = Some(CachedQuestions {
            owner_id: owner_id.to_string(),
            questions,
        });
    }

    pub fn cached_questions(&self, owner_id: &str) -> Option<Vec<Question>> {
        self.questions
            .lock()
            .expect("artifact mutex poisoned")
            .as_ref()
            .filter(|c| c.owner_id == owner_id)
            .map(|c| c.questions.clone())
    }

    /// Drops only the cached question list, e.g. after an import makes it
    /// stale. The guest snapshot is untouched.
    pub fn invalidate_questions(&self) {
        *self.questions.lock().expect("artifact mutex poisoned") = None;
    }

    pub fn clear_all(&self) {
        *self.guest.lock().expect("artifact mutex poisoned") = None;
        *self.questions.lock().expect("artifact mutex poisoned") = None;
    }
}

/// Merges provider-pushed authenticated identity and the locally
/// materialized guest identity into one canonical current-identity signal.
///
/// Precedence: an authenticated identity, once observed, supersedes any
/// guest and destroys its local artifacts; a provider push of `None` is
/// ignored while a guest session is active, because "no authenticated user"
/// does not mean "no current identity".
pub struct IdentityReconciler {
    provider: Arc<dyn IdentityProvider>,
    artifacts: Arc<ArtifactCache>,
    current_tx: watch::Sender<Option<Identity>>,
}

impl IdentityReconciler {
    pub fn new(provider: Arc<dyn IdentityProvider>, artifacts: Arc<ArtifactCache>) -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            provider,
            artifacts,
            current_tx,
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current_tx.subscribe()
    }

    /// The current identity, re-adopting a stored guest snapshot when
    /// nothing is current. The snapshot is the guest's analog of a restored
    /// login session: it is only ever present for a guest that was current,
    /// so re-adoption cannot override another identity.
    pub fn current_or_restored(&self) -> Option<Identity> {
        if let Some(current) = self.current() {
            return Some(current);
        }
        let snapshot = self.artifacts.guest_snapshot()?;
        tracing::info!(guest_id = %snapshot.id, "restoring guest session from snapshot");
        self.current_tx.send_replace(Some(snapshot.clone()));
        Some(snapshot)
    }

    /// Materialize a fresh guest identity. Purely local, cannot fail.
    /// Stale artifacts from any prior session are discarded first.
    pub fn continue_as_guest(&self) -> Identity {
        let identity = Identity::guest(format!(
            "{}{}-{}",
            GUEST_ID_PREFIX,
            Utc::now().timestamp_millis(),
            random_suffix(6)
        ));
        self.artifacts.clear_all();
        self.artifacts.store_guest(&identity);
        tracing::info!(guest_id = %identity.id, "guest session materialized");
        self.current_tx.send_replace(Some(identity.clone()));
        identity
    }

    /// Interactive sign-in through the provider. A dismissed popup is not an
    /// error: the current identity is left untouched and `None` is returned.
    pub async fn sign_in(&self) -> Result<Option<Identity>> {
        match self.provider.sign_in().await {
            Ok(identity) => {
                self.apply_authenticated(identity.clone());
                Ok(Some(identity))
            }
            Err(AuthError::PopupDismissed) => {
                tracing::debug!("sign-in popup dismissed, keeping current identity");
                Ok(None)
            }
            Err(err) => Err(Error::Auth(err)),
        }
    }

    /// Sign out of the current identity. For a guest this is a pure local
    /// reset; for an authenticated identity the provider is told first.
    pub async fn sign_out(&self) -> Result<()> {
        let current = self.current();
        match current {
            None => Ok(()),
            Some(identity) if identity.is_guest() => {
                tracing::info!(guest_id = %identity.id, "guest sign-out, local reset only");
                self.artifacts.clear_all();
                self.current_tx.send_replace(None);
                Ok(())
            }
            Some(identity) => {
                self.provider.sign_out().await.map_err(Error::Auth)?;
                tracing::info!(user_id = %identity.id, "signed out of provider");
                self.artifacts.clear_all();
                self.current_tx.send_replace(None);
                Ok(())
            }
        }
    }

    /// Apply one push from the provider's listener channel.
    pub fn on_provider_push(&self, pushed: Option<Identity>) {
        match pushed {
            Some(identity) => self.apply_authenticated(identity),
            None => {
                self.current_tx.send_if_modified(|cur| match cur {
                    // A guest session is not ended by "no authenticated
                    // user"; the push only describes the provider's side.
                    Some(existing) if existing.kind == IdentityKind::Guest => false,
                    Some(_) => {
                        tracing::info!("provider reported sign-out, clearing session");
                        self.artifacts.clear_all();
                        *cur = None;
                        true
                    }
                    None => false,
                });
            }
        }
    }

    fn apply_authenticated(&self, identity: Identity) {
        self.current_tx.send_if_modified(|cur| {
            if let Some(existing) = cur {
                if existing.id == identity.id {
                    return false;
                }
            }
            // Entering an authenticated session always starts from zero
            // inherited local state; guest data is discarded, never merged.
            self.artifacts.clear_all();
            tracing::info!(user_id = %identity.id, "authenticated identity is now current");
            *cur = Some(identity);
            true
        });
    }

    /// Forward provider pushes into the reconciler until the provider's
    /// channel closes. The reconciler is the only component acting on these.
    pub fn listen_for_pushes(self: Arc<Self>) -> JoinHandle<()> {
        let mut updates = self.provider.updates();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(pushed) => self.on_provider_push(pushed),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "identity push listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
