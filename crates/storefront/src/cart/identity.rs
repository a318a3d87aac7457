//! Durable reference to the shopper's cart identity.
//!
//! The cart ID is the only cross-session state the storefront needs. In the
//! HTTP surface it lives in the session; tests use the in-memory variant.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tower_sessions::Session;

use storefront_cart_core::CartId;

use crate::models::session_keys;

/// Errors reading or writing the stored cart identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Where the current cart ID is persisted between visits.
#[async_trait]
pub trait CartIdentityStore: Send + Sync {
    /// The stored cart ID, if any.
    async fn load(&self) -> Result<Option<CartId>, IdentityError>;

    /// Remember a cart ID.
    async fn save(&self, cart_id: &CartId) -> Result<(), IdentityError>;

    /// Forget the cart ID (after checkout or expiry).
    async fn clear(&self) -> Result<(), IdentityError>;
}

/// Cart identity stored in the visitor's session.
#[derive(Clone)]
pub struct SessionCartIdentity {
    session: Session,
}

impl SessionCartIdentity {
    /// Wrap a request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CartIdentityStore for SessionCartIdentity {
    async fn load(&self) -> Result<Option<CartId>, IdentityError> {
        Ok(self.session.get::<CartId>(session_keys::CART_ID).await?)
    }

    async fn save(&self, cart_id: &CartId) -> Result<(), IdentityError> {
        self.session.insert(session_keys::CART_ID, cart_id).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), IdentityError> {
        self.session.remove::<CartId>(session_keys::CART_ID).await?;
        Ok(())
    }
}

/// Cart identity held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCartIdentity {
    cart_id: Mutex<Option<CartId>>,
}

impl MemoryCartIdentity {
    /// Start with a stored cart ID.
    #[must_use]
    pub const fn with_cart_id(cart_id: CartId) -> Self {
        Self {
            cart_id: Mutex::new(Some(cart_id)),
        }
    }

    /// The currently stored ID, without going through the async trait.
    #[must_use]
    pub fn current(&self) -> Option<CartId> {
        self.cart_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, cart_id: Option<CartId>) {
        *self.cart_id.lock().unwrap_or_else(PoisonError::into_inner) = cart_id;
    }
}

#[async_trait]
impl CartIdentityStore for MemoryCartIdentity {
    async fn load(&self) -> Result<Option<CartId>, IdentityError> {
        Ok(self.current())
    }

    async fn save(&self, cart_id: &CartId) -> Result<(), IdentityError> {
        self.set(Some(cart_id.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<(), IdentityError> {
        self.set(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_memory_identity_roundtrip() {
        let identity = MemoryCartIdentity::default();
        assert_eq!(identity.load().await.unwrap(), None);

        let id = CartId::new("gid://storefront/Cart/1");
        identity.save(&id).await.unwrap();
        assert_eq!(identity.load().await.unwrap(), Some(id));

        identity.clear().await.unwrap();
        assert_eq!(identity.current(), None);
    }

    #[tokio::test]
    async fn test_session_identity_roundtrip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let identity = SessionCartIdentity::new(session);
        assert_eq!(identity.load().await.unwrap(), None);

        let id = CartId::new("gid://storefront/Cart/7");
        identity.save(&id).await.unwrap();
        assert_eq!(identity.load().await.unwrap(), Some(id));

        identity.clear().await.unwrap();
        assert_eq!(identity.load().await.unwrap(), None);
    }
}
