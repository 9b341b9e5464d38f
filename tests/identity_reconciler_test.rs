mod common;

use async_trait::async_trait;
use common::InMemoryQuestionStore;
use mockall::mock;
use quizcraft_backend::error::{AuthError, Error};
use quizcraft_backend::models::identity::{Identity, IdentityKind};
use quizcraft_backend::services::identity_service::{
    ArtifactCache, IdentityProvider, IdentityReconciler,
};
use quizcraft_backend::services::question_service::QuestionStore;
use std::sync::Arc;
use tokio::sync::broadcast;

mock! {
    pub Provider {}

    #[async_trait]
    impl IdentityProvider for Provider {
        async fn sign_in(&self) -> std::result::Result<Identity, AuthError>;
        async fn sign_out(&self) -> std::result::Result<(), AuthError>;
        fn updates(&self) -> broadcast::Receiver<Option<Identity>>;
    }
}

fn authenticated(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        display_name: "Test User".to_string(),
        email: format!("{id}@example.com"),
        avatar_url: String::new(),
        kind: IdentityKind::Authenticated,
    }
}

fn reconciler_with(provider: MockProvider) -> (Arc<ArtifactCache>, IdentityReconciler) {
    let artifacts = Arc::new(ArtifactCache::default());
    let reconciler = IdentityReconciler::new(Arc::new(provider), artifacts.clone());
    (artifacts, reconciler)
}

#[test]
fn continue_as_guest_materializes_local_identity() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());

    let guest = reconciler.continue_as_guest();

    assert!(guest.is_guest());
    assert!(guest.id.starts_with("guest-"));
    let current = reconciler.current().expect("guest should be current");
    assert_eq!(current.id, guest.id);
    assert_eq!(
        artifacts.guest_snapshot().expect("snapshot stored").id,
        guest.id
    );
}

#[test]
fn consecutive_guests_get_distinct_ids() {
    let (_, reconciler) = reconciler_with(MockProvider::new());

    let first = reconciler.continue_as_guest();
    let second = reconciler.continue_as_guest();

    assert_ne!(first.id, second.id);
    assert_eq!(reconciler.current().unwrap().id, second.id);
}

#[test]
fn provider_null_push_is_ignored_while_guest() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    let guest = reconciler.continue_as_guest();
    artifacts.cache_questions(&guest.id, vec![common::question("q", &["a", "b"], "a", "t")]);

    reconciler.on_provider_push(None);
    reconciler.on_provider_push(None);

    let current = reconciler.current().expect("guest session must survive");
    assert_eq!(current.id, guest.id);
    assert!(artifacts.cached_questions(&guest.id).is_some());
}

#[test]
fn authenticated_push_supersedes_guest_and_clears_artifacts() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    let guest = reconciler.continue_as_guest();
    artifacts.cache_questions(&guest.id, vec![common::question("q", &["a", "b"], "a", "t")]);

    reconciler.on_provider_push(Some(authenticated("user-1")));

    let current = reconciler.current().expect("authenticated user is current");
    assert_eq!(current.id, "user-1");
    assert_eq!(current.kind, IdentityKind::Authenticated);
    assert!(artifacts.guest_snapshot().is_none());
    assert!(artifacts.cached_questions(&guest.id).is_none());
}

#[test]
fn duplicate_authenticated_push_keeps_artifacts() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    reconciler.on_provider_push(Some(authenticated("user-1")));
    artifacts.cache_questions("user-1", vec![common::question("q", &["a", "b"], "a", "t")]);

    reconciler.on_provider_push(Some(authenticated("user-1")));

    assert_eq!(reconciler.current().unwrap().id, "user-1");
    assert!(artifacts.cached_questions("user-1").is_some());
}

#[test]
fn provider_null_push_ends_authenticated_session() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    reconciler.on_provider_push(Some(authenticated("user-1")));
    artifacts.cache_questions("user-1", vec![common::question("q", &["a", "b"], "a", "t")]);

    reconciler.on_provider_push(None);

    assert!(reconciler.current().is_none());
    assert!(artifacts.cached_questions("user-1").is_none());
}

#[test]
fn stored_guest_snapshot_is_readopted_when_nothing_is_current() {
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    let guest = Identity::guest("guest-123-abc".to_string());
    artifacts.store_guest(&guest);
    assert!(reconciler.current().is_none());

    let restored = reconciler.current_or_restored().expect("guest restored");

    assert_eq!(restored.id, guest.id);
    assert_eq!(reconciler.current().unwrap().id, guest.id);
}

#[test]
fn restoration_never_overrides_a_current_identity() {
    let (_, reconciler) = reconciler_with(MockProvider::new());
    reconciler.on_provider_push(Some(authenticated("user-1")));

    let current = reconciler.current_or_restored().expect("already current");

    assert_eq!(current.id, "user-1");
}

#[tokio::test]
async fn dismissed_popup_is_not_an_error_and_keeps_current() {
    let mut provider = MockProvider::new();
    provider
        .expect_sign_in()
        .times(1)
        .returning(|| Err(AuthError::PopupDismissed));
    let (_, reconciler) = reconciler_with(provider);
    let guest = reconciler.continue_as_guest();

    let outcome = reconciler.sign_in().await.expect("dismissal is swallowed");

    assert!(outcome.is_none());
    assert_eq!(reconciler.current().unwrap().id, guest.id);
}

#[tokio::test]
async fn unauthorized_domain_error_carries_origin() {
    let mut provider = MockProvider::new();
    provider.expect_sign_in().times(1).returning(|| {
        Err(AuthError::DomainUnauthorized {
            origin: "https://quiz.example".to_string(),
        })
    });
    let (_, reconciler) = reconciler_with(provider);

    let err = reconciler.sign_in().await.expect_err("must surface");

    match err {
        Error::Auth(AuthError::DomainUnauthorized { origin }) => {
            assert_eq!(origin, "https://quiz.example");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(reconciler.current().is_none());
}

#[tokio::test]
async fn successful_sign_in_becomes_current() {
    let mut provider = MockProvider::new();
    provider
        .expect_sign_in()
        .times(1)
        .returning(|| Ok(authenticated("user-7")));
    let (_, reconciler) = reconciler_with(provider);
    reconciler.continue_as_guest();

    let identity = reconciler
        .sign_in()
        .await
        .expect("sign-in succeeds")
        .expect("identity returned");

    assert_eq!(identity.id, "user-7");
    assert_eq!(reconciler.current().unwrap().id, "user-7");
}

#[tokio::test]
async fn guest_sign_out_never_contacts_the_provider() {
    // No sign_out expectation: any provider call would panic the mock.
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());
    reconciler.continue_as_guest();

    reconciler.sign_out().await.expect("local reset");

    assert!(reconciler.current().is_none());
    assert!(artifacts.guest_snapshot().is_none());
}

#[tokio::test]
async fn authenticated_sign_out_notifies_the_provider() {
    let mut provider = MockProvider::new();
    provider.expect_sign_out().times(1).returning(|| Ok(()));
    let (artifacts, reconciler) = reconciler_with(provider);
    reconciler.on_provider_push(Some(authenticated("user-1")));
    artifacts.cache_questions("user-1", vec![common::question("q", &["a", "b"], "a", "t")]);

    reconciler.sign_out().await.expect("provider sign-out");

    assert!(reconciler.current().is_none());
    assert!(artifacts.cached_questions("user-1").is_none());
}

#[tokio::test]
async fn guest_store_state_does_not_leak_into_authenticated_session() {
    let store = Arc::new(InMemoryQuestionStore::default());
    let (artifacts, reconciler) = reconciler_with(MockProvider::new());

    let guest = reconciler.continue_as_guest();
    let inserted = store
        .bulk_insert(
            &guest.id,
            vec![common::question("q", &["a", "b"], "a", "t").doc()],
        )
        .await
        .unwrap();
    store
        .toggle_bookmark(&guest.id, inserted[0].id)
        .await
        .unwrap();
    artifacts.cache_questions(&guest.id, inserted);

    reconciler.on_provider_push(Some(authenticated("user-1")));

    assert!(artifacts.cached_questions(&guest.id).is_none());
    assert!(store.list_all("user-1").await.unwrap().is_empty());
    assert!(store.bookmarked_ids("user-1").await.unwrap().is_empty());
}

/// Provider double with a real push channel, for exercising the listener
/// task end to end.
struct PushOnlyProvider {
    pushes: broadcast::Sender<Option<Identity>>,
}

#[async_trait]
impl IdentityProvider for PushOnlyProvider {
    async fn sign_in(&self) -> std::result::Result<Identity, AuthError> {
        Err(AuthError::Unknown("not under test".to_string()))
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        Ok(())
    }

    fn updates(&self) -> broadcast::Receiver<Option<Identity>> {
        self.pushes.subscribe()
    }
}

#[tokio::test]
async fn push_listener_forwards_provider_updates() {
    let (pushes, _keepalive) = broadcast::channel(16);
    let provider = PushOnlyProvider {
        pushes: pushes.clone(),
    };
    let reconciler = Arc::new(IdentityReconciler::new(
        Arc::new(provider),
        Arc::new(ArtifactCache::default()),
    ));
    let listener = reconciler.clone().listen_for_pushes();
    let mut current = reconciler.subscribe();

    pushes.send(Some(authenticated("user-9"))).unwrap();
    current.changed().await.expect("push applied");

    assert_eq!(reconciler.current().unwrap().id, "user-9");
    listener.abort();
}
