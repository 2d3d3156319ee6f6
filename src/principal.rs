//! Principal resolution and the local demo session.
//!
//! Every engine call acts as a [`Principal`]. Resolution order:
//! 1. an identity from the remote auth service ([`IdentityProvider`]);
//! 2. a demo identity persisted in the `"demo-user"` slot;
//! 3. the anonymous principal, which has no owner reference.
//!
//! Step 3 is the floor: [`PrincipalResolver::resolve`] cannot fail.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::providers::check_http_response;
use crate::providers::ProviderError;
use crate::store::demo::{demo_entries, DEMO_USER_ID};
use crate::store::local::LocalStore;
use crate::store::medium::LocalMedium;
use crate::store::{LocalError, DEMO_USER_SLOT, ENTRIES_SLOT};

/// Name of the cookie mirroring the demo-principal flag.
pub const DEMO_COOKIE: &str = "demo-user";

/// Lifetime of the demo cookie in seconds.
pub const DEMO_COOKIE_MAX_AGE_SECS: u64 = 86_400;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Free-form profile attached to an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A user identity, remote or demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Owner reference used to scope rows.
    pub id: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Profile metadata.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Identity {
    /// The built-in demo identity.
    pub fn demo() -> Self {
        Self {
            id: DEMO_USER_ID.to_owned(),
            email: Some("devpostdemo@example.com".to_owned()),
            user_metadata: UserMetadata {
                name: Some("Demo User".to_owned()),
            },
        }
    }
}

/// How the acting principal was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Signed in with the remote auth service.
    Authenticated,
    /// Signed in with the local demo credentials.
    Demo,
    /// Nobody signed in.
    Anonymous,
}

/// The acting identity for one engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// How the principal was established.
    pub kind: PrincipalKind,
    /// Identity, absent for anonymous principals.
    pub identity: Option<Identity>,
}

impl Principal {
    /// Remote-authenticated principal.
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            kind: PrincipalKind::Authenticated,
            identity: Some(identity),
        }
    }

    /// Demo principal.
    pub fn demo(identity: Identity) -> Self {
        Self {
            kind: PrincipalKind::Demo,
            identity: Some(identity),
        }
    }

    /// Anonymous principal with no owner reference.
    pub fn anonymous() -> Self {
        Self {
            kind: PrincipalKind::Anonymous,
            identity: None,
        }
    }

    /// Owner reference used to scope store operations.
    pub fn owner(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }

    /// Whether operations should go to local storage by default.
    pub fn is_local_preferred(&self) -> bool {
        self.kind != PrincipalKind::Authenticated
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from authentication and demo-session handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The auth service could not be reached or answered badly.
    #[error("auth service error: {0}")]
    Service(#[from] ProviderError),
    /// Demo credentials did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The local medium failed while reading or writing session slots.
    #[error(transparent)]
    Storage(#[from] LocalError),
}

// ---------------------------------------------------------------------------
// Identity providers
// ---------------------------------------------------------------------------

/// Source of remote-authenticated identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Service`] when the auth service cannot answer.
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError>;
}

/// Provider for setups with no remote auth service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

#[async_trait]
impl IdentityProvider for NoIdentity {
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        Ok(None)
    }
}

/// Supabase (GoTrue) identity lookup with a stored access token.
#[derive(Clone)]
pub struct SupabaseAuth {
    base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "__REDACTED__"),
            )
            .finish()
    }
}

impl SupabaseAuth {
    /// Create a lookup against `base_url`.
    pub fn new(base_url: String, api_key: Option<String>, access_token: Option<String>) -> Self {
        Self {
            base_url,
            api_key,
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        let Some(token) = &self.access_token else {
            return Ok(None);
        };

        let url = format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'));
        let mut request = self.client.get(&url).bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        let response = request.send().await.map_err(ProviderError::from)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("access token rejected by auth service");
            return Ok(None);
        }
        let body = check_http_response(response).await?;
        let identity: Identity =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(Some(identity))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves the acting principal for each engine call.
#[derive(Clone)]
pub struct PrincipalResolver {
    identity: Arc<dyn IdentityProvider>,
    medium: Arc<dyn LocalMedium>,
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver").finish_non_exhaustive()
    }
}

impl PrincipalResolver {
    /// Create a resolver reading demo state from `medium`.
    pub fn new(identity: Arc<dyn IdentityProvider>, medium: Arc<dyn LocalMedium>) -> Self {
        Self { identity, medium }
    }

    /// Resolve the principal. Never fails; anonymous is the floor.
    pub async fn resolve(&self) -> Principal {
        match self.identity.current_identity().await {
            Ok(Some(identity)) => return Principal::authenticated(identity),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "identity lookup failed; trying demo session"),
        }

        match self.medium.get_item(DEMO_USER_SLOT).await {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => return Principal::demo(identity),
                Err(err) => warn!(error = %err, "ignoring corrupt demo principal slot"),
            },
            Ok(None) => {}
            Err(err) => warn!(error = %err, "demo principal slot unreadable"),
        }

        Principal::anonymous()
    }
}

// ---------------------------------------------------------------------------
// Demo session
// ---------------------------------------------------------------------------

/// Credentials accepted for the local demo session.
#[derive(Clone, PartialEq, Eq)]
pub struct DemoCredentials {
    /// Demo username.
    pub username: String,
    /// Demo password.
    pub password: String,
}

impl std::fmt::Debug for DemoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoCredentials")
            .field("username", &self.username)
            .field("password", &"__REDACTED__")
            .finish()
    }
}

/// Signs the demo principal in and out of local storage.
#[derive(Debug, Clone)]
pub struct DemoSession {
    credentials: DemoCredentials,
    local: LocalStore,
}

impl DemoSession {
    /// Create a session manager over `local`'s medium.
    pub fn new(credentials: DemoCredentials, local: LocalStore) -> Self {
        Self { credentials, local }
    }

    /// Sign in with the demo credentials.
    ///
    /// Stores the demo identity, seeds the demo collection when local storage
    /// has none, and returns the `Set-Cookie` value for the marker cookie.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on mismatch and
    /// [`AuthError::Storage`] if the slots cannot be written.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username != self.credentials.username || password != self.credentials.password {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::demo();
        let raw = serde_json::to_string(&identity).map_err(LocalError::from)?;
        self.local
            .medium()
            .set_item(DEMO_USER_SLOT, &raw)
            .await?;

        if !self.local.is_initialized().await? {
            self.local.replace_all(&demo_entries(Utc::now())).await?;
            info!("demo entries seeded");
        }

        info!(user = %identity.id, "demo session started");
        Ok(demo_cookie())
    }

    /// Sign out: clear the demo principal and its entries.
    ///
    /// Returns the `Set-Cookie` value that expires the marker cookie.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the slots cannot be removed.
    pub async fn sign_out(&self) -> Result<String, AuthError> {
        let medium = self.local.medium();
        medium.remove_item(DEMO_USER_SLOT).await?;
        medium.remove_item(ENTRIES_SLOT).await?;
        info!("demo session cleared");
        Ok(clear_demo_cookie())
    }
}

/// `Set-Cookie` value marking a demo session.
pub fn demo_cookie() -> String {
    format!("{DEMO_COOKIE}=true; path=/; max-age={DEMO_COOKIE_MAX_AGE_SECS}")
}

/// `Set-Cookie` value expiring the demo marker.
pub fn clear_demo_cookie() -> String {
    format!("{DEMO_COOKIE}=; path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT")
}

/// Whether a request `Cookie` header carries a non-empty demo marker.
pub fn has_demo_cookie(cookie_header: &str) -> bool {
    cookie_header.split(';').any(|pair| {
        pair.trim()
            .split_once('=')
            .is_some_and(|(name, value)| name == DEMO_COOKIE && !value.is_empty())
    })
}
