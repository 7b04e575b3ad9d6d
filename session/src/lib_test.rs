use super::*;

const NOW: i64 = 1_700_000_000_000;

fn key() -> SessionKey {
    SessionKey::from_secret("test-secret").expect("key")
}

fn alice() -> Session {
    Session::start("Alice", NOW, DEFAULT_SESSION_TTL).expect("session")
}

// =============================================================
// Session
// =============================================================

#[test]
fn start_sets_one_day_expiry() {
    let session = alice();
    assert_eq!(session.username, "Alice");
    assert_eq!(session.created_at, NOW);
    assert_eq!(session.expires_at, NOW + 86_400_000);
}

#[test]
fn start_rejects_blank_username() {
    assert!(matches!(Session::start("  ", NOW, DEFAULT_SESSION_TTL), Err(SessionError::EmptyUsername)));
}

#[test]
fn expiry_boundary_counts_as_expired() {
    let session = alice();
    assert!(!session.is_expired(session.expires_at - 1));
    assert!(session.is_expired(session.expires_at));
}

// =============================================================
// Key
// =============================================================

#[test]
fn empty_secret_is_rejected() {
    assert!(matches!(SessionKey::from_secret(""), Err(SessionError::MissingSecret)));
}

#[test]
fn issued_token_verifies() {
    let token = key().issue(&alice()).expect("issue");
    let session = key().verify(&token, NOW + 1_000).expect("verify");
    assert_eq!(session, alice());
}

#[test]
fn token_payload_uses_camel_case_fields() {
    #[derive(Deserialize)]
    struct Raw {
        username: String,
        #[serde(rename = "createdAt")]
        created_at: i64,
        #[serde(rename = "expiresAt")]
        expires_at: i64,
        exp: i64,
    }

    let token = key().issue(&alice()).expect("issue");
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    let raw = jsonwebtoken::decode::<Raw>(&token, &DecodingKey::from_secret(b"test-secret"), &validation)
        .expect("decode")
        .claims;
    assert_eq!(raw.username, "Alice");
    assert_eq!(raw.created_at, NOW);
    assert_eq!(raw.exp, raw.expires_at / 1000);
}

#[test]
fn wrong_secret_fails_verification() {
    let token = key().issue(&alice()).expect("issue");
    let other = SessionKey::from_secret("other-secret").expect("key");
    assert!(matches!(other.verify(&token, NOW), Err(SessionError::InvalidToken(_))));
}

#[test]
fn expired_token_fails_verification() {
    let session = alice();
    let token = key().issue(&session).expect("issue");
    let err = key().verify(&token, session.expires_at + 1).expect_err("should be expired");
    assert!(matches!(err, SessionError::Expired { expires_at } if expires_at == session.expires_at));
}

#[test]
fn garbage_token_fails_verification() {
    assert!(matches!(key().verify("not-a-jwt", NOW), Err(SessionError::InvalidToken(_))));
}

#[test]
fn read_unverified_returns_payload_regardless_of_secret() {
    let token = SessionKey::from_secret("someone-else").expect("key").issue(&alice()).expect("issue");
    let session = read_unverified(&token).expect("decodable");
    assert_eq!(session, alice());
}

#[test]
fn read_unverified_rejects_garbage() {
    assert!(matches!(read_unverified("a.b.c"), Err(SessionError::InvalidToken(_))));
}

// =============================================================
// Store
// =============================================================

#[test]
fn current_session_returns_valid_session_and_keeps_token() {
    let token = key().issue(&alice()).expect("issue");
    let store = MemorySessionStore::with_token(&token);
    let session = current_session(&store, &key(), NOW).expect("session");
    assert_eq!(session.username, "Alice");
    assert_eq!(store.load(), Some(token));
}

#[test]
fn current_session_purges_expired_token() {
    let session = alice();
    let token = key().issue(&session).expect("issue");
    let store = MemorySessionStore::with_token(&token);
    assert!(current_session(&store, &key(), session.expires_at).is_none());
    assert!(store.load().is_none());
}

#[test]
fn current_session_purges_forged_token() {
    let forged = SessionKey::from_secret("attacker").expect("key").issue(&alice()).expect("issue");
    let store = MemorySessionStore::with_token(&forged);
    assert!(current_session(&store, &key(), NOW).is_none());
    assert!(store.load().is_none());
}

#[test]
fn current_session_without_token_is_none() {
    let store = MemorySessionStore::new();
    assert!(current_session(&store, &key(), NOW).is_none());
}

#[test]
fn file_store_round_trips_and_purges() {
    let path = std::env::temp_dir().join(format!("pixel-session-test-{}", std::process::id()));
    let store = FileSessionStore::new(&path);
    store.purge();
    assert!(store.load().is_none());

    store.save("token-123");
    assert_eq!(store.load().as_deref(), Some("token-123"));

    store.purge();
    assert!(store.load().is_none());
    assert!(!path.exists());
}
