//! Holder of the single active session.
//!
//! The store keeps the session in memory and mirrors it to the `session`
//! slot of a [`SlotStorage`]. Storage failures never surface: after the first
//! failed write the store stays memory-only for its lifetime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::SharedClock;
use super::ports::SlotStorage;
use super::session::{Role, Session};

/// Storage slot holding the serialised session.
pub const SESSION_SLOT: &str = "session";

#[derive(Debug, Default)]
struct StoreState {
    current: Option<Session>,
    hydrated: bool,
    memory_only: bool,
}

/// Owner of the authenticated session.
///
/// All methods are synchronous and never touch the network.
pub struct SessionStore {
    storage: Arc<dyn SlotStorage>,
    clock: SharedClock,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Build a store over `storage`. Persisted data is read lazily on the
    /// first [`get`](Self::get).
    pub fn new(storage: Arc<dyn SlotStorage>, clock: SharedClock) -> Self {
        Self {
            storage,
            clock,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current session and persist it.
    pub fn set(&self, session: Session) {
        let mut state = self.lock();
        if !state.memory_only {
            let persisted = serde_json::to_string(&session)
                .map_err(|error| error.to_string())
                .and_then(|json| {
                    self.storage
                        .write(SESSION_SLOT, &json)
                        .map_err(|error| error.to_string())
                });
            if let Err(error) = persisted {
                warn!(error = %error, "session storage unavailable; keeping session in memory only");
                state.memory_only = true;
            }
        }
        state.current = Some(session);
        state.hydrated = true;
    }

    /// Current session, if one is active and unexpired.
    ///
    /// Structurally invalid persisted data is discarded. A credential whose
    /// `exp` claim has passed clears the session.
    pub fn get(&self) -> Option<Session> {
        let mut state = self.lock();
        if !state.hydrated {
            let restored = self.hydrate(&state);
            state.current = restored;
            state.hydrated = true;
        }

        let expired = state
            .current
            .as_ref()
            .is_some_and(|session| session.is_expired_at(self.clock.utc()));
        if expired {
            debug!("session credential expired; clearing");
            state.current = None;
            self.remove_slot(&state);
        }
        state.current.clone()
    }

    fn hydrate(&self, state: &StoreState) -> Option<Session> {
        if state.memory_only {
            return None;
        }
        let raw = match self.storage.read(SESSION_SLOT) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(error = %error, "failed to read persisted session");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(error) => {
                warn!(error = %error, "discarding corrupt persisted session");
                self.remove_slot(state);
                None
            }
        }
    }

    fn remove_slot(&self, state: &StoreState) {
        if state.memory_only {
            return;
        }
        if let Err(error) = self.storage.remove(SESSION_SLOT) {
            warn!(error = %error, "failed to remove persisted session");
        }
    }

    /// Drop the session from memory and durable storage.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.current = None;
        state.hydrated = true;
        self.remove_slot(&state);
    }

    /// Whether the active session holds `role`. False with no session.
    pub fn has_role(&self, role: Role) -> bool {
        self.get().is_some_and(|session| session.role() == role)
    }

    /// Whether the store is still mirroring to durable storage.
    pub fn is_durable(&self) -> bool {
        !self.lock().memory_only
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::credential::{BearerCredential, TokenClaims, synthesize_unsigned_token};
    use crate::domain::ports::{MockSlotStorage, SlotStorageError};
    use crate::outbound::storage::MemorySlotStorage;
    use crate::test_support::MutableClock;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn session_with(claims: TokenClaims, issued_at: DateTime<Utc>) -> Session {
        let credential = synthesize_unsigned_token(&claims).expect("encode");
        Session::from_credential(credential, issued_at)
    }

    fn demo_session(issued_at: DateTime<Utc>) -> Session {
        session_with(
            TokenClaims {
                user_id: Some("u-demo".to_owned()),
                name: Some("Demo User".to_owned()),
                ..TokenClaims::default()
            },
            issued_at,
        )
    }

    fn store(storage: Arc<dyn SlotStorage>, now: DateTime<Utc>) -> SessionStore {
        SessionStore::new(storage, Arc::new(MutableClock::new(now)))
    }

    #[rstest]
    fn set_then_get_returns_session(now: DateTime<Utc>) {
        let store = store(Arc::new(MemorySlotStorage::default()), now);
        let session = demo_session(now);
        store.set(session.clone());
        assert_eq!(store.get(), Some(session));
        assert!(store.has_role(Role::User));
        assert!(!store.has_role(Role::Admin));
    }

    #[rstest]
    fn clear_removes_session_everywhere(now: DateTime<Utc>) {
        let storage = Arc::new(MemorySlotStorage::default());
        let store = store(storage.clone(), now);
        store.set(demo_session(now));
        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(storage.read(SESSION_SLOT).expect("read"), None);
        assert!(!store.has_role(Role::User));
    }

    #[rstest]
    fn persisted_session_survives_a_new_store(now: DateTime<Utc>) {
        let storage = Arc::new(MemorySlotStorage::default());
        let session = demo_session(now);
        store(storage.clone(), now).set(session.clone());
        assert_eq!(store(storage, now).get(), Some(session));
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"role":"user","issuedAt":"2025-01-01T00:00:00Z"}"#)]
    #[case(r#"{"role":"user","credential":"","issuedAt":"2025-01-01T00:00:00Z"}"#)]
    #[case(r#"{"role":7,"credential":"t","issuedAt":"2025-01-01T00:00:00Z"}"#)]
    fn corrupt_persisted_data_is_discarded(now: DateTime<Utc>, #[case] raw: &str) {
        let storage = Arc::new(MemorySlotStorage::default());
        storage.write(SESSION_SLOT, raw).expect("seed");
        let store = store(storage.clone(), now);
        assert_eq!(store.get(), None);
        assert_eq!(storage.read(SESSION_SLOT).expect("read"), None);
    }

    #[rstest]
    fn persisted_role_is_rederived_from_the_credential(now: DateTime<Utc>) {
        let credential = synthesize_unsigned_token(&TokenClaims {
            user_id: Some("u1".to_owned()),
            is_admin: false,
            ..TokenClaims::default()
        })
        .expect("encode");
        let raw = serde_json::json!({
            "subjectId": "u1",
            "role": "admin",
            "credential": credential.as_str(),
            "issuedAt": "2025-01-01T00:00:00Z",
        })
        .to_string();
        let storage = Arc::new(MemorySlotStorage::default());
        storage.write(SESSION_SLOT, &raw).expect("seed");

        let store = store(storage, now);
        let session = store.get().expect("restored session");
        assert_eq!(session.role(), Role::User);
        assert!(!store.has_role(Role::Admin));
    }

    #[rstest]
    fn storage_failure_degrades_to_memory(now: DateTime<Utc>) {
        let mut storage = MockSlotStorage::new();
        storage
            .expect_write()
            .times(1)
            .returning(|_, _| Err(SlotStorageError::io("quota exceeded")));
        storage.expect_read().never();
        storage.expect_remove().never();

        let store = store(Arc::new(storage), now);
        let session = demo_session(now);
        store.set(session.clone());
        store.set(session.clone());
        assert!(!store.is_durable());
        assert_eq!(store.get(), Some(session));
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[rstest]
    fn expired_credentials_clear_the_session(now: DateTime<Utc>) {
        let clock = Arc::new(MutableClock::new(now));
        let storage = Arc::new(MemorySlotStorage::default());
        let store = SessionStore::new(storage.clone(), clock.clone());
        store.set(session_with(
            TokenClaims {
                user_id: Some("u1".to_owned()),
                exp: Some(now.timestamp() + 60),
                ..TokenClaims::default()
            },
            now,
        ));
        assert!(store.get().is_some());

        clock.advance_seconds(61);
        assert_eq!(store.get(), None);
        assert_eq!(storage.read(SESSION_SLOT).expect("read"), None);
    }

    #[rstest]
    fn opaque_credentials_never_expire(now: DateTime<Utc>) {
        let store = store(Arc::new(MemorySlotStorage::default()), now);
        let credential = BearerCredential::new("opaque").expect("token");
        store.set(Session::from_credential(credential, now));
        assert!(store.get().is_some());
    }
}
