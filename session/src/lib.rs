//! Signed player sessions.
//!
//! ARCHITECTURE
//! ============
//! A session is an HS256 JWT carrying `{ username, createdAt, expiresAt }`
//! (milliseconds since the Unix epoch). The server verifies it from the
//! `session` cookie; clients hold it in a [`SessionStore`] and attach it to
//! credentialed requests.
//!
//! A session is valid iff its signature verifies and `expiresAt` lies in the
//! future. [`current_session`] purges anything else from the store, so an
//! invalid token is indistinguishable from no token at all.
//!
//! The signing secret is loaded once and passed around as a [`SessionKey`];
//! nothing here reads process-wide state on its own.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session token.
pub const COOKIE_NAME: &str = "session";

/// Env var holding the HS256 signing secret.
pub const SECRET_ENV: &str = "SESSION_SECRET";

/// Sessions last one day.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("SESSION_SECRET is not set")]
    MissingSecret,
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("failed to sign session: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("invalid session token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
    #[error("session expired at {expires_at}")]
    Expired { expires_at: i64 },
}

// =============================================================================
// SESSION
// =============================================================================

/// Session payload as carried inside the token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    /// Creation time, ms since epoch.
    pub created_at: i64,
    /// Expiry time, ms since epoch.
    pub expires_at: i64,
}

impl Session {
    /// Start a session for `username` at `now_ms` that lasts `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyUsername`] for a blank username.
    pub fn start(username: &str, now_ms: i64, ttl: Duration) -> Result<Self, SessionError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SessionError::EmptyUsername);
        }
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Ok(Self { username: username.to_owned(), created_at: now_ms, expires_at: now_ms.saturating_add(ttl_ms) })
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    session: Session,
    iat: i64,
    exp: i64,
}

// =============================================================================
// KEY
// =============================================================================

/// HS256 signing and verification key derived from the session secret.
#[derive(Clone)]
pub struct SessionKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl SessionKey {
    /// Build a key from a raw secret.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when the secret is empty.
    pub fn from_secret(secret: &str) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Build a key from `SESSION_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when the variable is unset or empty.
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = std::env::var(SECRET_ENV).map_err(|_| SessionError::MissingSecret)?;
        Self::from_secret(&secret)
    }

    /// Sign a session into a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sign`] if encoding fails.
    pub fn issue(&self, session: &Session) -> Result<String, SessionError> {
        let claims = Claims {
            session: session.clone(),
            iat: session.created_at.div_euclid(1000),
            exp: session.expires_at.div_euclid(1000),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(SessionError::Sign)
    }

    /// Verify a token's signature and expiry against `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidToken`] for bad signatures or malformed
    /// tokens and [`SessionError::Expired`] when `expiresAt` has passed.
    pub fn verify(&self, token: &str, now_ms: i64) -> Result<Session, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(SessionError::InvalidToken)?
            .claims;

        if claims.session.is_expired(now_ms) {
            return Err(SessionError::Expired { expires_at: claims.session.expires_at });
        }
        Ok(claims.session)
    }
}

/// Read a token's payload without checking its signature.
///
/// For clients that need their own username but do not hold the secret. The
/// result must never be used to authorize anything.
///
/// # Errors
///
/// Returns [`SessionError::InvalidToken`] when the token is not a decodable
/// HS256 JWT with a session payload.
pub fn read_unverified(token: &str) -> Result<Session, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.session)
        .map_err(SessionError::InvalidToken)
}

// =============================================================================
// STORE
// =============================================================================

/// Holder of the current session token (cookie jar, file, memory).
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn purge(&self);
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, token: &str) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
    }

    fn purge(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Token persisted in a single file, for command-line use.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }

    fn save(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            tracing::warn!(path = %self.path.display(), error = %e, "session: failed to write token file");
        }
    }

    fn purge(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "session: failed to remove token file"),
        }
    }
}

/// Load and verify the stored session, purging it when invalid or expired.
pub fn current_session(store: &dyn SessionStore, key: &SessionKey, now_ms: i64) -> Option<Session> {
    let token = store.load()?;
    match key.verify(&token, now_ms) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(error = %e, "session: purging invalid session");
            store.purge();
            None
        }
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
