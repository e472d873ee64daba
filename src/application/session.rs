use std::sync::{PoisonError, RwLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};

use crate::domain::{BranchId, Restaurant, RestaurantId};

use super::AppError;

/// Who is logged in to the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Session {
    Admin {
        username: String,
    },
    Restaurant {
        restaurant_id: RestaurantId,
        name: String,
        currency: String,
        branch_id: Option<BranchId>,
    },
}

impl Session {
    pub fn for_restaurant(restaurant: &Restaurant, branch_id: Option<BranchId>) -> Self {
        Session::Restaurant {
            restaurant_id: restaurant.id,
            name: restaurant.name.clone(),
            currency: restaurant.currency.clone(),
            branch_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Session::Admin { .. })
    }

    pub fn display_name(&self) -> &str {
        match self {
            Session::Admin { username } => username,
            Session::Restaurant { name, .. } => name,
        }
    }
}

/// The restaurant half of a session, handed to restaurant-scoped operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantScope {
    pub restaurant_id: RestaurantId,
    pub currency: String,
}

/// Holds the current session: set on login, cleared on logout.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&self, session: Session) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn clear(&self) -> Option<Session> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn require_admin(&self) -> Result<String, AppError> {
        match self.current() {
            Some(Session::Admin { username }) => Ok(username),
            Some(Session::Restaurant { .. }) => Err(AppError::AdminRequired),
            None => Err(AppError::NotAuthenticated),
        }
    }

    pub fn require_restaurant(&self) -> Result<RestaurantScope, AppError> {
        match self.current() {
            Some(Session::Restaurant {
                restaurant_id,
                currency,
                ..
            }) => Ok(RestaurantScope {
                restaurant_id,
                currency,
            }),
            Some(Session::Admin { .. }) => Err(AppError::RestaurantRequired),
            None => Err(AppError::NotAuthenticated),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn restaurant_session() -> Session {
        Session::Restaurant {
            restaurant_id: Uuid::new_v4(),
            name: "Sahil".into(),
            currency: "AZN".into(),
            branch_id: None,
        }
    }

    #[test]
    fn test_empty_store_is_unauthenticated() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated());
        assert!(matches!(
            store.require_restaurant(),
            Err(AppError::NotAuthenticated)
        ));
        assert!(matches!(
            store.require_admin(),
            Err(AppError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_login_then_logout() {
        let store = SessionStore::new();
        let session = restaurant_session();
        store.initialize(session.clone());

        let scope = store.require_restaurant().unwrap();
        assert_eq!(scope.currency, "AZN");
        assert!(matches!(store.require_admin(), Err(AppError::AdminRequired)));

        assert_eq!(store.clear(), Some(session));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_admin_session_cannot_act_as_restaurant() {
        let store = SessionStore::new();
        store.initialize(Session::Admin {
            username: "root".into(),
        });

        assert_eq!(store.require_admin().unwrap(), "root");
        assert!(matches!(
            store.require_restaurant(),
            Err(AppError::RestaurantRequired)
        ));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-hash"));
    }
}
