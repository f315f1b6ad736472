//! # Auth Gateway
//!
//! Login, registration and logout against the identity endpoint.
//!
//! `login` is fail-closed: the session only changes after the server
//! accepted the credentials *and* issued a credential that decodes. Any
//! other outcome leaves the previous session exactly as it was.
//!
//! Two overlapping `login` calls are not serialized; whichever response
//! lands last wins. Callers disable their submit control while a login is
//! pending.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::claims::{self, Claims};
use crate::credential::{Credential, LoginForm};
use crate::error::{AuthError, AuthResult};
use crate::interceptor::{error_message, ApiClient};
use crate::session::SessionStore;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

/// Body of a successful login.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

/// Acquires credentials and publishes them into the session.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    api: ApiClient,
    session: SessionStore,
}

impl AuthGateway {
    /// Creates a gateway sending through `api` and writing into `session`.
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self { api, session }
    }

    /// The session this gateway publishes into.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Log in, returning whether a session was established.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.try_login(username, password).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Login failed");
                false
            }
        }
    }

    /// Log in and return the claims of the new session.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Transport`] - the request could not be sent
    /// * [`AuthError::Rejected`] - non-2xx response (e.g. 401 bad password)
    /// * [`AuthError::InvalidResponse`] - 2xx without an `access_token`
    /// * [`AuthError::Decode`] - the issued credential does not decode
    pub async fn try_login(&self, username: &str, password: &str) -> AuthResult<Claims> {
        let form = LoginForm::new(username, password);
        let res = self
            .api
            .execute(self.api.request(Method::POST, LOGIN_PATH).form(&form))
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            return Err(AuthError::Rejected {
                status,
                message: error_message(res).await,
            });
        }

        let body: TokenResponse = res
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        if body.access_token.is_empty() {
            return Err(AuthError::InvalidResponse("empty access_token".to_string()));
        }

        let credential = Credential::new(body.access_token);
        let claims = claims::decode(&credential)?;

        self.session.establish(credential, claims.clone());
        tracing::info!(subject = %claims.subject, role = %claims.role, "Logged in");

        Ok(claims)
    }

    /// Register an account, returning whether the server accepted it.
    ///
    /// Never signs in; call [`AuthGateway::login`] afterwards.
    pub async fn register(&self, username: &str, password: &str) -> bool {
        match self.try_register(username, password).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Registration failed");
                false
            }
        }
    }

    /// Register an account.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Transport`] - the request could not be sent
    /// * [`AuthError::Conflict`] - the username is taken (409)
    /// * [`AuthError::Rejected`] - any other non-2xx response
    pub async fn try_register(&self, username: &str, password: &str) -> AuthResult<()> {
        let form = LoginForm::new(username, password);
        let res = self
            .api
            .execute(self.api.request(Method::POST, REGISTER_PATH).form(&form))
            .await?;

        let status = res.status();
        if status.is_success() {
            tracing::info!(username = %username, "Registered account");
            return Ok(());
        }

        let message = error_message(res).await;
        if status == StatusCode::CONFLICT {
            return Err(AuthError::Conflict(message));
        }
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Drop the current session and its persisted credential.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// Change the signed-in user's password.
    ///
    /// Leaves the session untouched; the current credential stays valid
    /// until it expires.
    ///
    /// # Errors
    ///
    /// * [`AuthError::NotAuthenticated`] - no current credential
    /// * [`AuthError::Transport`] - the request could not be sent
    /// * [`AuthError::Rejected`] - wrong old password (400) or other failure
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> AuthResult<()> {
        if self.session.snapshot().credential().is_none() {
            return Err(AuthError::NotAuthenticated);
        }

        let req = ChangePasswordRequest {
            old_password,
            new_password,
        };
        let res = self
            .api
            .execute(
                self.api
                    .request(Method::POST, CHANGE_PASSWORD_PATH)
                    .json(&req),
            )
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            return Err(AuthError::Rejected {
                status,
                message: error_message(res).await,
            });
        }

        tracing::info!("Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Role;
    use crate::interceptor::RequestInterceptor;
    use crate::session::SessionStatus;
    use crate::store::{CredentialStore, MemoryCredentialStore};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(subject: &str, role: &str) -> String {
        let payload = json!({"sub": subject, "id": 7, "role": role, "exp": 2_000_000_000u64});
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(payload.to_string()))
    }

    fn gateway_for(server: &MockServer, store: &Arc<MemoryCredentialStore>) -> AuthGateway {
        let store = Arc::clone(store) as Arc<dyn CredentialStore>;
        let session = SessionStore::new(Arc::clone(&store));
        session.resolve_startup();
        let api = ApiClient::new(
            server.uri(),
            reqwest::Client::new(),
            RequestInterceptor::new(store),
        );
        AuthGateway::new(api, session)
    }

    #[tokio::test]
    async fn test_login_sends_form_and_establishes_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=admin"))
            .and(body_string_contains("password=adminpassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token("admin", "admin"),
                "token_type": "bearer"
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        assert!(gateway.login("admin", "adminpassword").await);
        assert_eq!(
            gateway.session().status(),
            SessionStatus::Authenticated(Role::Admin)
        );
        assert_eq!(store.get().unwrap().as_str(), token("admin", "admin"));
        assert_eq!(gateway.session().claims().unwrap().user_id, Some(7));
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Incorrect username or password"})),
            )
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.try_login("admin", "wrongpass").await.unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect username or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!gateway.login("admin", "wrongpass").await);
        assert_eq!(gateway.session().status(), SessionStatus::Unauthenticated);
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_prior_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let existing = token("bob", "user");
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
            existing.clone(),
        )));
        let gateway = gateway_for(&mock_server, &store);
        let before = gateway.session().snapshot();

        assert!(!gateway.login("admin", "adminpassword").await);
        assert_eq!(gateway.session().snapshot(), before);
        assert_eq!(store.get().unwrap().as_str(), existing);
    }

    #[tokio::test]
    async fn test_login_with_undecodable_token_fails_closed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "not-a-token"})),
            )
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.try_login("admin", "adminpassword").await.unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
        assert!(store.get().is_none());
        assert_eq!(gateway.session().status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_without_token_field() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.try_login("a", "b").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);
        drop(mock_server);

        let err = gateway.try_login("a", "b").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(gateway.session().status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_does_not_authenticate() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_string_contains("username=newuser"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "User created successfully"})),
            )
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        assert!(gateway.register("newuser", "pw123").await);
        assert_eq!(gateway.session().status(), SessionStatus::Unauthenticated);
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"detail": "Username already taken"})),
            )
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.try_register("admin", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref m) if m == "Username already taken"));
        assert!(!gateway.register("admin", "pw").await);
    }

    #[tokio::test]
    async fn test_register_other_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "Registration failed"})))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.try_register("x", "y").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(MemoryCredentialStore::new());
        let gateway = gateway_for(&mock_server, &store);

        let err = gateway.change_password("old", "new").await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_change_password_sends_bearer_and_json() {
        let mock_server = MockServer::start().await;
        let credential = token("bob", "user");

        Mock::given(method("POST"))
            .and(path("/auth/change-password"))
            .and(header("authorization", format!("Bearer {credential}").as_str()))
            .and(body_json(json!({"old_password": "old", "new_password": "new"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
            credential,
        )));
        let gateway = gateway_for(&mock_server, &store);

        gateway.change_password("old", "new").await.unwrap();
        assert_eq!(
            gateway.session().status(),
            SessionStatus::Authenticated(Role::User)
        );
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
            token("bob", "user"),
        )));
        let gateway = gateway_for(&mock_server, &store);
        assert_eq!(
            gateway.session().status(),
            SessionStatus::Authenticated(Role::User)
        );

        gateway.logout();

        assert_eq!(gateway.session().status(), SessionStatus::Unauthenticated);
        assert!(store.get().is_none());
    }
}
