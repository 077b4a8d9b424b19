//! End-to-end auth scenarios against the in-memory store: registration,
//! login, token checks, logout revocation and password changes.

use anyhow::{bail, Result};
use fintrack::{
    auth::{AuthConfig, AuthService, Origin, RejectReason},
    store::{MemoryStore, SessionRecord, Store},
    Error,
};
use secrecy::SecretString;
use std::sync::Arc;

const EMAIL: &str = "user@example.com";
const PASSWORD: &str = "password123";

fn service(enforce_revocation: bool) -> Result<(AuthService, Arc<dyn Store>)> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = AuthConfig::new(SecretString::from("integration-secret"))
        .with_enforce_revocation(enforce_revocation);
    Ok((AuthService::new(&config, store.clone())?, store))
}

fn origin() -> Origin {
    Origin::new(Some("203.0.113.9".to_string()), Some("it/1.0".to_string()))
}

async fn session_for(
    store: &Arc<dyn Store>,
    user_id: i64,
    jti: &str,
) -> Result<Option<SessionRecord>> {
    Ok(store
        .list_sessions(user_id)
        .await?
        .into_iter()
        .find(|session| session.jti == jti))
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn register_login_and_authenticate() -> Result<()> {
    let (auth, store) = service(true)?;

    let user = auth.register(EMAIL, PASSWORD).await?;
    assert_eq!(user.id, 1);
    assert!(user.is_active);
    assert_ne!(user.hashed_password, PASSWORD);

    let issued = auth.login(EMAIL, PASSWORD, &origin()).await?;
    assert_eq!(issued.claims.sub, "1");
    assert!(issued.claims.exp > issued.claims.iat);

    let session = session_for(&store, 1, &issued.claims.jti).await?;
    let Some(session) = session else {
        bail!("login did not record a session");
    };
    assert!(session.is_active);
    assert_eq!(session.user_id, 1);
    assert_eq!(session.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(session.user_agent.as_deref(), Some("it/1.0"));
    assert_eq!(session.expires_at, issued.claims.expires_at());

    let authenticated = auth.authenticate(Some(&bearer(&issued.token))).await?;
    assert_eq!(authenticated.user.email, EMAIL);
    assert_eq!(authenticated.claims.jti, issued.claims.jti);
    Ok(())
}

#[tokio::test]
async fn wrong_password_creates_no_session() -> Result<()> {
    let (auth, store) = service(true)?;
    let user = auth.register(EMAIL, PASSWORD).await?;

    let result = auth.login(EMAIL, "wrong-password", &origin()).await;
    assert!(matches!(result, Err(Error::BadCredentials)));

    let unknown = auth.login("nobody@example.com", PASSWORD, &origin()).await;
    assert!(matches!(unknown, Err(Error::BadCredentials)));

    assert!(store.list_sessions(user.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let (auth, _store) = service(true)?;
    auth.register(EMAIL, PASSWORD).await?;

    let again = auth.register(EMAIL, "another-password").await;
    assert!(matches!(again, Err(Error::EmailTaken)));

    let shouting = auth.register("USER@Example.com", PASSWORD).await;
    assert!(matches!(shouting, Err(Error::EmailTaken)));
    Ok(())
}

#[tokio::test]
async fn registration_rejects_bad_input() -> Result<()> {
    let (auth, _store) = service(true)?;
    assert!(matches!(
        auth.register("not-an-email", PASSWORD).await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        auth.register(EMAIL, "short").await,
        Err(Error::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn logout_revokes_token_when_enforced() -> Result<()> {
    let (auth, store) = service(true)?;
    auth.register(EMAIL, PASSWORD).await?;
    let issued = auth.login(EMAIL, PASSWORD, &origin()).await?;

    auth.logout(&issued.token).await?;

    let session = session_for(&store, 1, &issued.claims.jti).await?;
    assert!(session.is_some_and(|session| !session.is_active));

    let result = auth.authenticate(Some(&bearer(&issued.token))).await;
    assert!(matches!(
        result,
        Err(Error::Unauthorized(RejectReason::SessionRevoked))
    ));

    // A second logout is a no-op.
    auth.logout(&issued.token).await?;
    Ok(())
}

#[tokio::test]
async fn logout_leaves_token_valid_when_not_enforced() -> Result<()> {
    let (auth, store) = service(false)?;
    auth.register(EMAIL, PASSWORD).await?;
    let issued = auth.login(EMAIL, PASSWORD, &origin()).await?;

    auth.logout(&issued.token).await?;

    let session = session_for(&store, 1, &issued.claims.jti).await?;
    assert!(session.is_some_and(|session| !session.is_active));
    assert!(auth
        .authenticate(Some(&bearer(&issued.token)))
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn logout_ignores_garbage_tokens() -> Result<()> {
    let (auth, _store) = service(true)?;
    auth.logout("not.a.token").await?;
    auth.logout("").await?;
    Ok(())
}

#[tokio::test]
async fn sessions_are_independent() -> Result<()> {
    let (auth, _store) = service(true)?;
    let user = auth.register(EMAIL, PASSWORD).await?;
    let first = auth.login(EMAIL, PASSWORD, &origin()).await?;
    let second = auth.login(EMAIL, PASSWORD, &origin()).await?;
    assert_ne!(first.claims.jti, second.claims.jti);

    auth.logout(&first.token).await?;

    assert!(auth.authenticate(Some(&bearer(&first.token))).await.is_err());
    assert!(auth.authenticate(Some(&bearer(&second.token))).await.is_ok());

    let sessions = auth.sessions(&user).await?;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|session| session.is_active).count(), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_headers_are_rejected() -> Result<()> {
    let (auth, _store) = service(true)?;

    let cases = [
        (None, RejectReason::MissingHeader),
        (Some("Basic dXNlcjpwYXNz"), RejectReason::MalformedHeader),
        (Some("Bearer"), RejectReason::MalformedHeader),
        (Some("Bearer not-a-jwt"), RejectReason::InvalidToken),
    ];
    for (header, expected) in cases {
        match auth.authenticate(header).await {
            Err(Error::Unauthorized(reason)) => assert_eq!(reason, expected),
            other => bail!("unexpected outcome for {header:?}: {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn change_password_then_login() -> Result<()> {
    let (auth, _store) = service(true)?;
    auth.register(EMAIL, PASSWORD).await?;
    let issued = auth.login(EMAIL, PASSWORD, &origin()).await?;
    let me = auth.authenticate(Some(&bearer(&issued.token))).await?;

    let wrong = auth
        .change_password(&me.user, "not-my-password", "new-password-1")
        .await;
    assert!(matches!(wrong, Err(Error::BadOldPassword)));

    auth.change_password(&me.user, PASSWORD, "new-password-1").await?;

    assert!(matches!(
        auth.login(EMAIL, PASSWORD, &origin()).await,
        Err(Error::BadCredentials)
    ));
    assert!(auth.login(EMAIL, "new-password-1", &origin()).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn deactivation_blocks_login_and_existing_tokens() -> Result<()> {
    let (auth, _store) = service(false)?;
    auth.register(EMAIL, PASSWORD).await?;
    let issued = auth.login(EMAIL, PASSWORD, &origin()).await?;
    let me = auth.authenticate(Some(&bearer(&issued.token))).await?;

    auth.deactivate(&me.user).await?;

    assert!(matches!(
        auth.login(EMAIL, PASSWORD, &origin()).await,
        Err(Error::Inactive)
    ));
    assert!(matches!(
        auth.authenticate(Some(&bearer(&issued.token))).await,
        Err(Error::Unauthorized(RejectReason::InactiveUser))
    ));
    Ok(())
}
