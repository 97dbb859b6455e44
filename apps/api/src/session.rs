use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, PoisonError, RwLock};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "jobtrackr_session";

/// Sessions idle for longer than this are forgotten.
pub const SESSION_IDLE_HOURS: i64 = 12;

/// Upper bound on live sessions; the least recently seen are evicted first.
pub const MAX_SESSIONS: usize = 1024;

/// Per-browser state: the anti-forgery token issued when the session started.
/// The token never rotates for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    csrf_token: String,
    last_seen: DateTime<Utc>,
}

impl Session {
    fn start(now: DateTime<Utc>) -> Self {
        Session {
            id: Uuid::new_v4(),
            csrf_token: generate_token(),
            last_seen: now,
        }
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Checks the token echoed back by a mutating request.
    pub fn verify_csrf(&self, presented: Option<&str>) -> Result<(), AppError> {
        match presented {
            Some(token) if constant_time_eq(token.as_bytes(), self.csrf_token.as_bytes()) => Ok(()),
            _ => {
                tracing::warn!(session = %self.id, "rejected request with invalid CSRF token");
                Err(AppError::Forbidden)
            }
        }
    }
}

/// In-memory session registry keyed by the session cookie. Idle sessions
/// expire and the map never holds more than `max_sessions` entries.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(Duration::hours(SESSION_IDLE_HOURS), MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        SessionStore {
            sessions: Arc::default(),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Looks up the live session named by the request cookie and marks it seen.
    pub fn find(&self, jar: &CookieJar) -> Option<Session> {
        self.find_at(jar, Utc::now())
    }

    /// Returns the caller's session, starting a new one (and setting its
    /// cookie on the returned jar) when the request carries none.
    pub fn load_or_start(&self, jar: CookieJar) -> (CookieJar, Session) {
        self.load_or_start_at(jar, Utc::now())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn find_at(&self, jar: &CookieJar, now: DateTime<Utc>) -> Option<Session> {
        let id = jar.get(SESSION_COOKIE)?.value().parse::<Uuid>().ok()?;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        let session = sessions.get_mut(&id)?;
        if now - session.last_seen > self.idle_ttl {
            sessions.remove(&id);
            return None;
        }
        session.last_seen = now;
        Some(session.clone())
    }

    fn load_or_start_at(&self, jar: CookieJar, now: DateTime<Utc>) -> (CookieJar, Session) {
        if let Some(session) = self.find_at(&jar, now) {
            return (jar, session);
        }

        let session = Session::start(now);
        {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            sessions.retain(|_, s| now - s.last_seen <= self.idle_ttl);
            while sessions.len() >= self.max_sessions {
                let Some(oldest) = sessions
                    .values()
                    .min_by_key(|s| s.last_seen)
                    .map(|s| s.id)
                else {
                    break;
                };
                sessions.remove(&oldest);
            }
            sessions.insert(session.id, session.clone());
        }
        tracing::debug!(session = %session.id, "started new session");

        let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), session)
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes[..]);
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
