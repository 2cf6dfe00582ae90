//! Session management
//!
//! Wraps the SQLite store with an in-memory cache of active sessions
//! and enforces the sliding inactivity expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::session::{ChatTurn, JourneyStage, Role, Session, SessionPatch, SessionStore};
use crate::{Error, Result};

/// Session manager that handles the session lifecycle
pub struct SessionManager {
    /// Persistent storage (wrapped in Mutex for thread safety)
    store: Arc<Mutex<SessionStore>>,
    /// In-memory cache for active sessions
    cache: Arc<RwLock<HashMap<String, Session>>>,
    /// Sliding inactivity expiry
    ttl: Duration,
    /// Maximum chat turns per session (0 = unlimited)
    max_turns: usize,
}

impl SessionManager {
    /// Create a new session manager with a database path
    pub fn new(db_path: &str, ttl_minutes: u64, max_turns: usize) -> Result<Self> {
        let store = SessionStore::new(db_path)?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes as i64),
            max_turns,
        })
    }

    /// Create an in-memory session manager (for testing)
    pub fn in_memory(ttl_minutes: u64, max_turns: usize) -> Result<Self> {
        let store = SessionStore::in_memory()?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes as i64),
            max_turns,
        })
    }

    /// Session time-to-live in seconds (for API responses)
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.num_seconds().max(0) as u64
    }

    /// Create and persist a new session
    pub async fn create(
        &self,
        language: impl Into<String>,
        role: Role,
        journey_stage: JourneyStage,
    ) -> Result<Session> {
        let session = Session::new(language, role, journey_stage);
        info!("Creating session: {}", session.id);

        {
            let store = self.store.lock().unwrap();
            store.save(&session)?;
        }

        let mut cache = self.cache.write().await;
        cache.insert(session.id.clone(), session.clone());

        Ok(session)
    }

    /// Get a session by ID, sliding its expiry window.
    ///
    /// An expired session behaves as missing and is removed lazily,
    /// whether or not the sweep has run.
    pub async fn get(&self, id: &str) -> Result<Option<Session>> {
        let session = self.peek(id).await?;

        match session {
            Some(session) if session.is_expired(self.ttl) => {
                debug!("Session {} expired, removing", id);
                self.remove(id).await?;
                Ok(None)
            }
            Some(mut session) => {
                session.touch();
                self.persist(session.clone()).await?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update to a session
    pub async fn update(&self, id: &str, patch: SessionPatch) -> Result<Session> {
        let mut session = self
            .get(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        session.apply_patch(patch);
        self.persist(session.clone()).await?;
        Ok(session)
    }

    /// Append chat turns to a session, trimming to the turn cap
    pub async fn append_turns(&self, id: &str, turns: Vec<ChatTurn>) -> Result<Session> {
        let mut session = self
            .get(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        for turn in turns {
            session.push_turn(turn);
        }
        session.trim_history(self.max_turns);

        self.persist(session.clone()).await?;
        Ok(session)
    }

    /// Delete a session. Returns true if it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        // An expired session must not be deletable as if it were live
        let existed = self.get(id).await?.is_some();
        if existed {
            self.remove(id).await?;
            info!("Deleted session: {}", id);
        }
        Ok(existed)
    }

    /// Remove every session idle longer than the TTL. Returns the count.
    pub async fn purge_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.ttl;

        {
            let mut cache = self.cache.write().await;
            cache.retain(|_, session| session.last_active_at >= cutoff);
        }

        let purged = {
            let store = self.store.lock().unwrap();
            store.purge_older_than(cutoff)?
        };

        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    /// Number of cached (active) sessions
    pub async fn active_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    /// Load from cache, falling back to the store
    async fn peek(&self, id: &str) -> Result<Option<Session>> {
        {
            let cache = self.cache.read().await;
            if let Some(session) = cache.get(id) {
                return Ok(Some(session.clone()));
            }
        }

        let loaded = {
            let store = self.store.lock().unwrap();
            store.load(id)?
        };

        if let Some(session) = &loaded {
            let mut cache = self.cache.write().await;
            cache.insert(id.to_string(), session.clone());
        }

        Ok(loaded)
    }

    /// Write a session through cache and store
    async fn persist(&self, session: Session) -> Result<()> {
        {
            let store = self.store.lock().unwrap();
            store.save(&session)?;
        }
        let mut cache = self.cache.write().await;
        cache.insert(session.id.clone(), session);
        Ok(())
    }

    /// Drop a session from cache and store
    async fn remove(&self, id: &str) -> Result<()> {
        {
            let mut cache = self.cache.write().await;
            cache.remove(id);
        }
        let store = self.store.lock().unwrap();
        store.delete(id)?;
        Ok(())
    }
}
