//! Client-side session and authorization core for the Lakehouse dashboard.
//!
//! This crate provides:
//! - **CredentialStore**: durable persistence of the current bearer credential
//! - **Claims decoding**: structural, unverified parsing for display and routing
//! - **AuthGateway**: login, registration, logout and password change
//! - **RequestInterceptor**: one interception point attaching the credential
//! - **SessionStore**: the observable `{loading, credential, claims}` state
//! - **Route guard**: pure screen selection from the session
//!
//! The client never verifies credential signatures. Decoded claims only
//! choose screens; the server re-validates the credential on every request
//! and makes every binding authorization decision.
//!
//! # Example
//!
//! ```no_run
//! use lakehouse_session::{AppContext, ClientConfig, MemoryCredentialStore, Route};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), lakehouse_session::ApiError> {
//! let ctx = AppContext::new(&ClientConfig::default(), Arc::new(MemoryCredentialStore::new()))?;
//!
//! // Resolve before making any routing decision.
//! ctx.session.resolve_startup();
//!
//! if ctx.gateway.login("admin", "adminpassword").await {
//!     let decision = ctx.decide(Route::Dashboard);
//!     println!("{:?}", decision.screen());
//!     let metrics = ctx.dashboard.metrics().await?;
//!     println!("{metrics}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod config;
pub mod credential;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod interceptor;
pub mod route;
pub mod session;
pub mod store;

use std::sync::Arc;

pub use claims::{decode, Claims, Role};
pub use config::ClientConfig;
pub use credential::{Credential, LoginForm};
pub use dashboard::{DashboardClient, FileQuery, StatsKind};
pub use error::{ApiError, ApiResult, AuthError, AuthResult, DecodeError};
pub use gateway::AuthGateway;
pub use interceptor::{ApiClient, RequestInterceptor};
pub use route::{decide, Decision, Page, Route, Screen};
pub use session::{SessionState, SessionStatus, SessionStore};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

/// The session core wired together over one credential store.
///
/// Each consumer receives the component it needs from here instead of
/// reaching for global state.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Observable session state.
    pub session: SessionStore,
    /// Login, register and logout.
    pub gateway: AuthGateway,
    /// Collaborator endpoints.
    pub dashboard: DashboardClient,
    /// The intercepted HTTP client shared by the above.
    pub api: ApiClient,
}

impl AppContext {
    /// Build the components for `config` over `store`.
    ///
    /// The session starts in `Loading`; call
    /// [`SessionStore::resolve_startup`] before routing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lakehouse/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        let session = SessionStore::new(Arc::clone(&store));
        let api = ApiClient::new(config.api_url.clone(), http, RequestInterceptor::new(store));

        Ok(Self {
            gateway: AuthGateway::new(api.clone(), session.clone()),
            dashboard: DashboardClient::new(api.clone()),
            session,
            api,
        })
    }

    /// Build the components with the file-backed store from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be created.
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let store = FileCredentialStore::new(config.session_path());
        Self::new(config, Arc::new(store))
    }

    /// Route guard decision for `requested` against the current session.
    #[must_use]
    pub fn decide(&self, requested: Route) -> Decision {
        route::decide(requested, &self.session.snapshot())
    }
}
