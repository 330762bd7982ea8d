use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Identity;
use crate::store::Store;

type TokenSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Issues and caches the anonymous identity for one session.
///
/// The token is minted once per provider and reused for every subsequent
/// call, which is what gates voting to once per session. The display name is
/// always read through the store so a rename is visible immediately.
#[derive(Clone)]
pub struct IdentityProvider {
    store: Store,
    token_source: TokenSource,
    current: Arc<OnceCell<String>>,
}

impl IdentityProvider {
    pub fn new(store: Store) -> Self {
        Self::with_token_source(store, Arc::new(|| Uuid::new_v4().to_string()))
    }

    /// Provider with an injected token source. Tests use this to pin the
    /// identity to a known value.
    pub fn with_token_source(store: Store, token_source: TokenSource) -> Self {
        Self {
            store,
            token_source,
            current: Arc::new(OnceCell::new()),
        }
    }

    /// The session identity, minted on first call and stable afterwards.
    /// Never fails: an unstored identity resolves to the default display
    /// name.
    pub async fn get_or_create(&self) -> Identity {
        let id = self
            .current
            .get_or_init(|| async {
                let token = (self.token_source)();
                debug!(identity_id = %token, "issued session identity");
                token
            })
            .await
            .clone();
        self.store.get_user_info(&id).await
    }

    /// Persist a new display name for the session identity. Validation is
    /// the service's job; this just writes.
    pub async fn update_display_name(&self, username: &str) -> Result<(), StoreError> {
        let identity = self.get_or_create().await;
        self.store.update_username(&identity.id, username).await
    }
}
