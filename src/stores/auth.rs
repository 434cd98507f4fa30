//! Signed-in user and user directory
//!
//! Passwords live in the `CredentialStore`; this store only holds profiles
//! and the session flag.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::credentials::{ADMIN_LOGIN_ID, CredentialStore};
use super::PersistedState;
use crate::error::StoreError;
use crate::persistence::{Namespace, NamespaceState, StorageManager};
use crate::platform::iso_timestamp;
use crate::types::{Role, User, UserProfile, UserStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub users: BTreeMap<String, User>,
    pub is_authenticated: bool,
    /// Base64 image chosen in place of the avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_icon: Option<String>,
}

impl AuthState {
    /// Signed out, with only the built-in admin account
    pub fn initial(joined_at: String) -> Self {
        let admin = admin_user(joined_at);
        Self {
            user: None,
            users: BTreeMap::from([(admin.id.clone(), admin)]),
            is_authenticated: false,
            custom_icon: None,
        }
    }
}

impl NamespaceState for AuthState {
    const NAMESPACE: Namespace = Namespace::Auth;
}

fn admin_user(joined_at: String) -> User {
    User {
        id: ADMIN_LOGIN_ID.to_string(),
        login_id: ADMIN_LOGIN_ID.to_string(),
        name: "管理者".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        points: 0,
        avatar_url: None,
        profile: None,
        last_login: None,
        status: UserStatus::Active,
        joined_at,
        total_earned: 0,
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub profile: Option<UserProfile>,
}

/// New worker account
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub login_id: String,
    pub password: String,
    pub name: String,
    pub email: String,
}

pub struct AuthStore {
    inner: PersistedState<AuthState>,
    credentials: Rc<CredentialStore>,
}

impl AuthStore {
    pub fn new(storage: Rc<StorageManager>, credentials: Rc<CredentialStore>) -> Self {
        let initial = AuthState::initial(iso_timestamp(storage.now()));
        Self {
            inner: PersistedState::new(storage, initial),
            credentials,
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.read(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read(|s| s.is_authenticated)
    }

    pub fn custom_icon(&self) -> Option<String> {
        self.inner.read(|s| s.custom_icon.clone())
    }

    pub fn users(&self) -> BTreeMap<String, User> {
        self.inner.read(|s| s.users.clone())
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.inner.read(|s| s.users.get(user_id).cloned())
    }

    /// Start a session for `user`, stamping its last login
    pub fn login(&self, mut user: User) -> bool {
        user.last_login = Some(self.inner.timestamp());
        self.inner.update(|s| {
            s.users.insert(user.id.clone(), user.clone());
            s.user = Some(user);
            s.is_authenticated = true;
        })
    }

    /// Check the password, then log the matching user in.
    ///
    /// If the session cannot be persisted it still holds in this tab, but
    /// `NotPersisted` is returned since other tabs will not see it.
    pub fn sign_in(&self, login_id: &str, password: &str) -> Result<User, StoreError> {
        if !self.credentials.verify(login_id, password) {
            return Err(StoreError::InvalidCredentials);
        }
        let user = self
            .inner
            .read(|s| s.users.values().find(|u| u.login_id == login_id).cloned())
            .ok_or_else(|| StoreError::UnknownUser {
                id: login_id.to_string(),
            })?;
        if !self.login(user) {
            return Err(StoreError::NotPersisted {
                namespace: Namespace::Auth,
            });
        }
        self.current_user().ok_or(StoreError::NotAuthenticated)
    }

    pub fn logout(&self) -> bool {
        self.inner.update(|s| {
            s.user = None;
            s.is_authenticated = false;
        })
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> Result<bool, StoreError> {
        self.update_current(|user| {
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(avatar_url) = update.avatar_url {
                user.avatar_url = Some(avatar_url);
            }
            if let Some(profile) = update.profile {
                user.profile = Some(profile);
            }
        })
    }

    pub fn update_icon(&self, base64: &str) -> bool {
        self.inner
            .update(|s| s.custom_icon = Some(base64.to_string()))
    }

    pub fn update_avatar(&self, avatar_url: &str) -> Result<bool, StoreError> {
        self.update_current(|user| user.avatar_url = Some(avatar_url.to_string()))
    }

    /// Set the signed-in user's balance; increases count toward total earned
    pub fn update_points(&self, points: i64) -> Result<bool, StoreError> {
        self.update_current(|user| {
            user.total_earned += (points - user.points).max(0);
            user.points = points;
        })
    }

    /// Set any user's balance (clamped at zero)
    pub fn update_user_points(&self, user_id: &str, points: i64) -> Result<bool, StoreError> {
        if self.get_user(user_id).is_none() {
            return Err(StoreError::UnknownUser {
                id: user_id.to_string(),
            });
        }
        Ok(self.inner.update_if(|s| {
            let Some(user) = s.users.get_mut(user_id) else {
                return false;
            };
            user.total_earned += (points - user.points).max(0);
            user.points = points.max(0);
            let updated = user.clone();
            if let Some(current) = s.user.as_mut().filter(|u| u.id == user_id) {
                *current = updated;
            }
            true
        }))
    }

    /// Create a worker account and its credential.
    ///
    /// Nothing is added to the user directory unless the credential was
    /// persisted first.
    pub fn register_user(&self, registration: Registration) -> Result<User, StoreError> {
        let Registration {
            login_id,
            password,
            name,
            email,
        } = registration;
        if self.get_user(&login_id).is_some() || self.credentials.contains(&login_id) {
            return Err(StoreError::UserExists { id: login_id });
        }

        if !self.credentials.add(&login_id, &password) {
            // Drop it from memory too so a retry is not refused as a duplicate
            self.credentials.remove(&login_id);
            return Err(StoreError::NotPersisted {
                namespace: Namespace::Credentials,
            });
        }
        let user = User {
            id: login_id.clone(),
            login_id,
            name,
            email,
            role: Role::Worker,
            points: 0,
            avatar_url: None,
            profile: None,
            last_login: None,
            status: UserStatus::Active,
            joined_at: self.inner.timestamp(),
            total_earned: 0,
        };
        let entry = user.clone();
        let saved = self.inner.update(move |s| {
            s.users.insert(entry.id.clone(), entry);
        });
        if !saved {
            return Err(StoreError::NotPersisted {
                namespace: Namespace::Auth,
            });
        }
        Ok(user)
    }

    /// Drop every account but the admin, and sign out
    pub fn reset(&self) -> bool {
        let credentials_reset = self.credentials.reset();
        let state_reset = self
            .inner
            .replace(AuthState::initial(self.inner.timestamp()));
        credentials_reset && state_reset
    }

    fn update_current(&self, f: impl FnOnce(&mut User)) -> Result<bool, StoreError> {
        if self.current_user().is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        Ok(self.inner.update_if(|s| {
            let Some(user) = s.user.as_mut() else {
                return false;
            };
            f(user);
            let updated = user.clone();
            s.users.insert(updated.id.clone(), updated);
            true
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryMedium;

    fn stores() -> (AuthStore, Rc<StorageManager>) {
        let storage = Rc::new(StorageManager::with_medium(Rc::new(MemoryMedium::new())));
        storage.initialize();
        let credentials = Rc::new(CredentialStore::new(Rc::clone(&storage)));
        (AuthStore::new(Rc::clone(&storage), credentials), storage)
    }

    fn register(store: &AuthStore, login_id: &str) -> User {
        store
            .register_user(Registration {
                login_id: login_id.to_string(),
                password: "pw".to_string(),
                name: format!("Worker {login_id}"),
                email: format!("{login_id}@example.com"),
            })
            .unwrap()
    }

    #[test]
    fn test_initial_state_has_admin() {
        let (store, _) = stores();
        assert!(!store.is_authenticated());
        assert_eq!(store.get_user("admin").unwrap().role, Role::Admin);
    }

    #[test]
    fn test_sign_in_admin() {
        let (store, _) = stores();
        assert_eq!(store.sign_in("admin", "nope"), Err(StoreError::InvalidCredentials));

        let user = store.sign_in("admin", "admin123").unwrap();
        assert!(store.is_authenticated());
        assert!(user.last_login.is_some());
        assert_eq!(store.current_user(), Some(user));
    }

    #[test]
    fn test_register_then_sign_in() {
        let (store, _) = stores();
        let user = register(&store, "worker1");
        assert_eq!(user.role, Role::Worker);
        assert_eq!(user.points, 0);

        let signed_in = store.sign_in("worker1", "pw").unwrap();
        assert_eq!(signed_in.id, "worker1");

        let dup = store.register_user(Registration {
            login_id: "worker1".to_string(),
            password: "other".to_string(),
            name: String::new(),
            email: String::new(),
        });
        assert_eq!(dup, Err(StoreError::UserExists { id: "worker1".to_string() }));
    }

    #[test]
    fn test_profile_updates_require_session() {
        let (store, _) = stores();
        assert_eq!(
            store.update_avatar("https://example.com/a.png"),
            Err(StoreError::NotAuthenticated)
        );

        store.sign_in("admin", "admin123").unwrap();
        let update = ProfileUpdate {
            name: Some("Boss".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(store.update_profile(update), Ok(true));
        assert_eq!(store.current_user().unwrap().name, "Boss");
        assert_eq!(store.get_user("admin").unwrap().name, "Boss");
    }

    #[test]
    fn test_update_points_tracks_total_earned() {
        let (store, _) = stores();
        store.sign_in("admin", "admin123").unwrap();
        store.update_points(100).unwrap();
        store.update_points(40).unwrap();
        store.update_points(70).unwrap();

        let user = store.current_user().unwrap();
        assert_eq!(user.points, 70);
        assert_eq!(user.total_earned, 130);
    }

    #[test]
    fn test_update_user_points_clamps_and_syncs_current() {
        let (store, _) = stores();
        register(&store, "worker1");
        store.sign_in("worker1", "pw").unwrap();

        assert_eq!(store.update_user_points("worker1", 50), Ok(true));
        assert_eq!(store.current_user().unwrap().points, 50);

        assert_eq!(store.update_user_points("worker1", -20), Ok(true));
        let user = store.get_user("worker1").unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.total_earned, 50);

        assert!(matches!(
            store.update_user_points("ghost", 1),
            Err(StoreError::UnknownUser { .. })
        ));
    }

    #[test]
    fn test_register_reports_unpersisted_credential() {
        let medium = Rc::new(MemoryMedium::new());
        let storage = Rc::new(StorageManager::with_medium(medium.clone()));
        storage.initialize();
        let credentials = Rc::new(CredentialStore::new(Rc::clone(&storage)));
        let store = AuthStore::new(Rc::clone(&storage), credentials);

        medium.set_unavailable(true);
        let result = store.register_user(Registration {
            login_id: "w1".to_string(),
            password: "pw".to_string(),
            name: "Worker One".to_string(),
            email: "w1@example.com".to_string(),
        });
        assert_eq!(
            result,
            Err(StoreError::NotPersisted {
                namespace: Namespace::Credentials
            })
        );
        assert!(store.get_user("w1").is_none());
        assert!(!store.credentials.contains("w1"));

        // Another tab opened afterwards cannot sign in with it
        medium.set_unavailable(false);
        let other = Rc::new(StorageManager::with_medium(medium));
        let other_credentials = Rc::new(CredentialStore::new(Rc::clone(&other)));
        let other_store = AuthStore::new(other, other_credentials);
        assert_eq!(
            other_store.sign_in("w1", "pw"),
            Err(StoreError::InvalidCredentials)
        );
    }

    #[test]
    fn test_sign_in_reports_unpersisted_session() {
        let medium = Rc::new(MemoryMedium::new());
        let storage = Rc::new(StorageManager::with_medium(medium.clone()));
        storage.initialize();
        let credentials = Rc::new(CredentialStore::new(Rc::clone(&storage)));
        let store = AuthStore::new(storage, credentials);

        medium.set_unavailable(true);
        assert_eq!(
            store.sign_in("admin", "admin123"),
            Err(StoreError::NotPersisted {
                namespace: Namespace::Auth
            })
        );
        // The session still holds in this tab
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_logout_and_reset() {
        let (store, storage) = stores();
        register(&store, "worker1");
        store.sign_in("worker1", "pw").unwrap();
        store.update_icon("data:image/png;base64,AAAA");
        assert!(store.logout());
        assert!(!store.is_authenticated());
        assert_eq!(store.custom_icon().as_deref(), Some("data:image/png;base64,AAAA"));

        assert!(store.reset());
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.custom_icon(), None);
        assert_eq!(store.sign_in("worker1", "pw"), Err(StoreError::InvalidCredentials));

        // Reset state is what a new store hydrates
        let credentials = Rc::new(CredentialStore::new(Rc::clone(&storage)));
        let fresh = AuthStore::new(storage, credentials);
        assert_eq!(fresh.users().len(), 1);
    }
}
