//! # Request Interception
//!
//! Attaches the current credential to every outbound request.
//!
//! [`ApiClient::execute`] is the only path by which this crate sends HTTP
//! requests, and it runs [`RequestInterceptor::apply`] on the finished
//! request right before it leaves. Callers cannot opt out, so no
//! collaborator call goes out unauthenticated by accident.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::store::CredentialStore;

/// Reads the credential store and adds a bearer header when one is held.
#[derive(Clone)]
pub struct RequestInterceptor {
    store: Arc<dyn CredentialStore>,
}

impl RequestInterceptor {
    /// Intercept using the credential in `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// The `Authorization` value that would be attached right now.
    #[must_use]
    pub fn authorization(&self) -> Option<HeaderValue> {
        let credential = self.store.get()?;
        match HeaderValue::from_str(&credential.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(_) => {
                tracing::warn!("Stored credential is not a valid header value; sending without it");
                None
            }
        }
    }

    /// Attach the bearer header, or leave `headers` untouched when there
    /// is no credential.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.authorization() {
            headers.insert(AUTHORIZATION, value);
        }
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor").finish_non_exhaustive()
    }
}

/// HTTP client for the Lakehouse API.
///
/// The client is cheaply cloneable and can be shared across components.
///
/// # Examples
///
/// ```rust,ignore
/// let api = ApiClient::new("http://localhost:8000/api", http, interceptor);
/// let response = api.execute(api.request(Method::GET, "/health")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    interceptor: RequestInterceptor,
}

impl ApiClient {
    /// Creates a client for `base_url` that intercepts through `interceptor`.
    pub fn new(base_url: impl Into<String>, http: Client, interceptor: RequestInterceptor) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            interceptor,
        }
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/files`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request against an API path.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Send a request, attaching the current credential.
    ///
    /// The response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the request cannot be built or sent.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let mut request = request.build()?;
        self.interceptor.apply(request.headers_mut());

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            authenticated = request.headers().contains_key(AUTHORIZATION),
            "Outbound request"
        );

        self.http.execute(request).await
    }

    /// Send a request and require a success status.
    ///
    /// # Errors
    ///
    /// * [`ApiError::Network`] - Network request failed
    /// * [`ApiError::Server`] - Non-2xx status
    pub async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let res = self.execute(request).await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            return Err(ApiError::Server {
                status,
                message: error_message(res).await,
            });
        }

        Ok(res)
    }

    /// Send a request and parse a JSON body.
    ///
    /// # Errors
    ///
    /// * [`ApiError::Network`] - Network request failed
    /// * [`ApiError::Server`] - Non-2xx status
    /// * [`ApiError::InvalidResponse`] - Response could not be parsed
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Human-readable message from an error response.
///
/// The backend reports errors as `{"detail": "..."}`; anything else is
/// returned as raw text.
pub(crate) async fn error_message(res: Response) -> String {
    let text = res.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(text)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::credential::Credential;
    use crate::store::MemoryCredentialStore;
    use proptest::prelude::*;

    proptest! {
        /// Property: the attached header is exactly the stored credential
        #[test]
        fn prop_header_matches_stored_credential(token in "[A-Za-z0-9_.-]{1,120}") {
            let store: Arc<dyn CredentialStore> =
                Arc::new(MemoryCredentialStore::with_credential(Credential::new(token.clone())));
            let mut headers = HeaderMap::new();

            RequestInterceptor::new(store).apply(&mut headers);

            let expected = format!("Bearer {token}");
            prop_assert_eq!(headers.get(AUTHORIZATION).unwrap().to_str().unwrap(), expected.as_str());
        }
    }
}
