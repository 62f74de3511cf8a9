use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::{gateway::auth::Principal, models::now_sec};

pub const SESSION_COOKIE: &str = "SESSION";

struct Session {
    principal: Principal,
    expires_at: i64,
}

/// In-memory sessions keyed by an opaque random id. Each successful lookup slides the expiry
/// forward by the TTL.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl_seconds: i64,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self { sessions: DashMap::new(), ttl_seconds: ttl_minutes.max(1) * 60 }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn open(&self, principal: Principal) -> String {
        self.open_at(principal, now_sec())
    }

    pub fn resolve(&self, id: &str) -> Option<Principal> {
        self.resolve_at(id, now_sec())
    }

    /// Returns whether a live session was removed.
    pub fn invalidate(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drops expired sessions and returns how many went.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(now_sec())
    }

    fn purge_expired_at(&self, now: i64) -> usize {
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let live = session.expires_at > now;
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn open_at(&self, principal: Principal, now: i64) -> String {
        let id = Uuid::new_v4().simple().to_string();
        debug!(username = %principal.username, "opening session");
        self.sessions
            .insert(id.clone(), Session { principal, expires_at: now + self.ttl_seconds });
        id
    }

    fn resolve_at(&self, id: &str, now: i64) -> Option<Principal> {
        let principal = {
            let mut session = self.sessions.get_mut(id)?;
            if session.expires_at <= now {
                None
            } else {
                session.expires_at = now + self.ttl_seconds;
                Some(session.principal.clone())
            }
        };

        if principal.is_none() {
            debug!("dropping expired session");
            self.sessions.remove(id);
        }
        principal
    }
}
