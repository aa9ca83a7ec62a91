//! The authorization and token core shared by every provider.
//!
//! An [OpenIdProvider] turns validated authorization requests into sessions, issues
//! authorization codes and pre-authorized codes for them, and exchanges those codes for access
//! tokens at the token endpoint. What makes a request acceptable, and what a session records,
//! is decided by the [AuthorizationFlow] the provider is built with.
//!
//! Codes and access tokens are signed assertions binding a session identifier (`sub`), the
//! provider's issuer identity (`iss`) and the [TokenTarget] they were issued for (`aud`).

use std::{fmt::Debug, sync::Arc};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    config::{BaseUrl, ProviderConfig},
    core::{
        authorization_request::{
            parameters::{RequestUri, ResponseType},
            AuthorizationRequest,
        },
        credential::CredentialRequest,
        credential_offer::CredentialOffer,
        error::{
            AuthorizationError, AuthorizationErrorCode, CredentialError, CredentialErrorCode,
            CredentialErrorResponse, Error, TokenError, TokenErrorCode,
        },
        response::{AuthorizationResponse, PushedAuthorizationResponse, TokenResponse},
        token_request::{GrantType, TokenRequest},
        util::random_string,
    },
};

use self::{
    session::{AuthorizationSession, Session, SessionStore},
    signer::{TokenSigner, TokenTarget},
};

pub mod session;
pub mod signer;

/// Prefix of the `request_uri` handed out for pushed authorization requests.
pub const REQUEST_URI_PREFIX: &str = "urn:ietf:params:oauth:request_uri:";

pub const OPENID_CONFIGURATION_PATH: &str = ".well-known/openid-configuration";
pub const CREDENTIAL_ISSUER_METADATA_PATH: &str = ".well-known/openid-credential-issuer";

const C_NONCE_LENGTH: usize = 16;

pub fn openid_configuration_url(base_url: &BaseUrl) -> Result<Url> {
    base_url
        .join(OPENID_CONFIGURATION_PATH)
        .context("unable to build discovery URL")
}

pub fn credential_issuer_metadata_url(base_url: &BaseUrl) -> Result<Url> {
    base_url
        .join(CREDENTIAL_ISSUER_METADATA_PATH)
        .context("unable to build credential issuer metadata URL")
}

/// The policy a provider applies to authorization requests.
#[async_trait]
pub trait AuthorizationFlow<S: AuthorizationSession>: Debug + Send + Sync {
    /// Whether the request can be accepted by this provider.
    fn validate_authorization_request(&self, request: &AuthorizationRequest) -> bool;

    /// Description of the `invalid_request` error returned for requests that fail validation.
    fn invalid_request_message(&self) -> &str {
        "Invalid authorization request"
    }

    /// Build the session for a validated request.
    fn create_session(
        &self,
        id: String,
        request: AuthorizationRequest,
        expiration_timestamp: i64,
    ) -> Result<S>;

    /// Answer a token request for a verified session.
    ///
    /// Returning `None` lets the provider issue a bearer access token.
    async fn generate_token_response(
        &self,
        _session: &S,
        _request: &TokenRequest,
    ) -> Result<Option<TokenResponse>> {
        Ok(None)
    }
}

/// The OAuth 2.0 authorization code flow: any `code` request naming its client is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationCodeFlow;

impl AuthorizationFlow<Session> for AuthorizationCodeFlow {
    fn validate_authorization_request(&self, request: &AuthorizationRequest) -> bool {
        request.response_type() == Some(ResponseType::Code) && request.client_id().is_some()
    }

    fn create_session(
        &self,
        id: String,
        request: AuthorizationRequest,
        expiration_timestamp: i64,
    ) -> Result<Session> {
        Ok(Session {
            id,
            authorization_request: request,
            expiration_timestamp,
        })
    }
}

/// An OpenID provider, also known as the authorization server.
#[derive(Debug)]
pub struct OpenIdProvider<S, F> {
    config: ProviderConfig,
    flow: Arc<F>,
    session_store: Arc<dyn SessionStore<S> + Send + Sync>,
    signer: Arc<dyn TokenSigner + Send + Sync>,
}

impl<S, F> Clone for OpenIdProvider<S, F> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            flow: self.flow.clone(),
            session_store: self.session_store.clone(),
            signer: self.signer.clone(),
        }
    }
}

impl<S, F> OpenIdProvider<S, F> {
    /// Build a new provider.
    pub fn builder() -> OpenIdProviderBuilder<S, F> {
        OpenIdProviderBuilder::default()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn session_store(&self) -> &(dyn SessionStore<S> + Send + Sync) {
        self.session_store.as_ref()
    }

    pub fn signer(&self) -> &(dyn TokenSigner + Send + Sync) {
        self.signer.as_ref()
    }

    /// `<base_url>/.well-known/openid-configuration`
    pub fn discovery_url(&self) -> Result<Url> {
        openid_configuration_url(&self.config.base_url)
    }

    /// `<base_url>/.well-known/openid-credential-issuer`
    pub fn issuer_metadata_url(&self) -> Result<Url> {
        credential_issuer_metadata_url(&self.config.base_url)
    }
}

impl<S: AuthorizationSession, F: AuthorizationFlow<S>> OpenIdProvider<S, F> {
    /// Sign a token for `sub`, issued by this provider for `target`.
    pub async fn generate_token(
        &self,
        sub: &str,
        target: TokenTarget,
        token_id: Option<&str>,
    ) -> Result<String> {
        let mut payload = Map::new();
        payload.insert("sub".into(), sub.into());
        payload.insert("iss".into(), self.config.issuer.as_str().into());
        payload.insert("aud".into(), target.as_str().into());
        if let Some(token_id) = token_id {
            payload.insert("jti".into(), token_id.into());
        }
        self.signer
            .sign(target, &payload, None, None)
            .await
            .with_context(|| format!("unable to sign {target} token"))
    }

    /// Verify a token issued by this provider for `target`, returning its claims.
    ///
    /// A token with a valid signature is still rejected unless it names this provider as `iss`
    /// and `target` as `aud`.
    pub async fn verify_and_parse_token(
        &self,
        token: &str,
        target: TokenTarget,
    ) -> Option<Map<String, Json>> {
        if !self.signer.verify(target, token).await {
            debug!("{target} token signature could not be verified");
            return None;
        }
        let payload = match self.signer.parse_payload(token) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("verified {target} token has no readable payload: {e:#}");
                return None;
            }
        };

        let claim = |name| payload.get(name).and_then(Json::as_str);
        let bound = claim("sub").is_some()
            && claim("aud") == Some(target.as_str())
            && claim("iss") == Some(self.config.issuer.as_str());
        if !bound {
            debug!("{target} token is not bound to this provider and purpose");
            return None;
        }
        Some(payload)
    }

    pub async fn generate_authorization_code_for(&self, session: &S) -> Result<String> {
        self.generate_token(session.id(), TokenTarget::Token, None)
            .await
    }

    /// Pre-authorized codes share the shape of authorization codes, and are exchanged the same
    /// way.
    pub async fn generate_pre_authorized_code_for(&self, session: &S) -> Result<String> {
        self.generate_token(session.id(), TokenTarget::Token, None)
            .await
    }

    pub async fn validate_authorization_code(&self, code: &str) -> Option<Map<String, Json>> {
        self.verify_and_parse_token(code, TokenTarget::Token).await
    }

    /// Validate an authorization request and open a session for it, expiring in `expires_in`
    /// seconds.
    pub async fn initialize_authorization(
        &self,
        request: AuthorizationRequest,
        expires_in: i64,
    ) -> Result<S, Error> {
        if !self.flow.validate_authorization_request(&request) {
            let message = self.flow.invalid_request_message().to_owned();
            return Err(AuthorizationError::new(request, AuthorizationErrorCode::InvalidRequest)
                .with_message(message)
                .into());
        }

        let id = Uuid::new_v4().to_string();
        let expiration_timestamp = Utc::now().timestamp() + expires_in;
        let session = self
            .flow
            .create_session(id.clone(), request, expiration_timestamp)?;
        self.session_store.put(&id, session.clone()).await?;
        debug!("initialized authorization session {id}");
        Ok(session)
    }

    /// Issue the authorization code for a session, echoing the request's `state`.
    pub async fn continue_authorization(&self, session: &S) -> Result<AuthorizationResponse> {
        let code = self.generate_authorization_code_for(session).await?;
        let state = session.authorization_request().state().map(|state| state.0);
        Ok(AuthorizationResponse::success(code, state))
    }

    /// Answer a token request for a verified session.
    pub async fn generate_token_response(
        &self,
        session: &S,
        request: &TokenRequest,
    ) -> Result<TokenResponse> {
        if let Some(response) = self.flow.generate_token_response(session, request).await? {
            return Ok(response);
        }
        let access_token = self
            .generate_token(session.id(), TokenTarget::Access, None)
            .await?;
        Ok(TokenResponse::bearer(access_token))
    }

    /// Exchange an authorization code or pre-authorized code for a token.
    pub async fn process_token_request(
        &self,
        request: &TokenRequest,
    ) -> Result<TokenResponse, Error> {
        let reject = |code, message: &str| -> Error {
            TokenError::new(request.clone(), code)
                .with_message(message)
                .into()
        };

        let code = match &request.grant_type {
            GrantType::AuthorizationCode => request.code.as_deref().ok_or_else(|| {
                reject(
                    TokenErrorCode::InvalidGrant,
                    "No code parameter found on token request",
                )
            })?,
            GrantType::PreAuthorizedCode => {
                request.pre_authorized_code.as_deref().ok_or_else(|| {
                    reject(
                        TokenErrorCode::InvalidGrant,
                        "No pre-authorized_code parameter found on token request",
                    )
                })?
            }
            GrantType::Other(grant_type) => {
                debug!("rejecting token request with grant type {grant_type}");
                return Err(reject(
                    TokenErrorCode::UnsupportedGrantType,
                    "Grant type not supported",
                ));
            }
        };

        let session_id = self
            .validate_authorization_code(code)
            .await
            .and_then(|payload| payload.get("sub").and_then(Json::as_str).map(str::to_owned))
            .ok_or_else(|| {
                reject(
                    TokenErrorCode::InvalidGrant,
                    "Authorization code could not be verified",
                )
            })?;

        let now = Utc::now().timestamp();
        let session = if self.config.single_use_codes {
            self.session_store.take_unexpired(&session_id, now).await?
        } else {
            self.session_store.get_unexpired(&session_id, now).await?
        };
        let Some(session) = session else {
            return Err(reject(
                TokenErrorCode::InvalidRequest,
                "No authorization session found for given authorization code, or session expired.",
            ));
        };

        match self.generate_token_response(&session, request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if self.config.single_use_codes {
                    let id = session.id().to_owned();
                    warn!("token response failed, restoring session {id}");
                    self.session_store.put(&id, session).await?;
                }
                Err(e.into())
            }
        }
    }

    /// The response to a pushed authorization request, referring to `session` by request URI.
    pub fn pushed_authorization_success(&self, session: &S) -> PushedAuthorizationResponse {
        PushedAuthorizationResponse::success(
            format!("{REQUEST_URI_PREFIX}{}", session.id()),
            session.expires_in(),
        )
    }

    /// Find the session a request continuing a pushed authorization refers to.
    pub async fn resolve_pushed_authorization_session(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<S, Error> {
        let reject = |message: &str| -> Error {
            AuthorizationError::new(request.clone(), AuthorizationErrorCode::InvalidRequest)
                .with_message(message)
                .into()
        };

        let Some(RequestUri(request_uri)) = request.parameter::<RequestUri>().ok().flatten()
        else {
            return Err(reject(
                "Authorization request does not refer to a pushed authorization session",
            ));
        };
        let session_id = request_uri
            .strip_prefix(REQUEST_URI_PREFIX)
            .unwrap_or(request_uri.as_str());

        self.session_store
            .get_unexpired(session_id, Utc::now().timestamp())
            .await?
            .ok_or_else(|| reject("No session found for given request URI, or session expired"))
    }

    pub async fn validate_access_token(&self, access_token: &str) -> bool {
        self.verify_and_parse_token(access_token, TokenTarget::Access)
            .await
            .is_some()
    }

    /// A Credential Offer for `session`, carrying a pre-authorized code for it.
    pub async fn credential_offer_for(
        &self,
        session: &S,
        credentials: Vec<Json>,
        user_pin_required: bool,
    ) -> Result<CredentialOffer> {
        let code = self.generate_pre_authorized_code_for(session).await?;
        Ok(CredentialOffer::new(self.config.issuer.clone(), credentials)
            .with_pre_authorized_code(code, user_pin_required))
    }

    /// Reject a credential request, handing the holder a fresh `c_nonce` to retry with.
    pub fn credential_error(
        &self,
        request: CredentialRequest,
        code: CredentialErrorCode,
        description: Option<String>,
    ) -> CredentialError {
        let mut response = CredentialErrorResponse::new(code)
            .with_c_nonce(random_string(C_NONCE_LENGTH), self.config.nonce_expires_in);
        response.error_description = description;
        CredentialError::new(request, response)
    }
}

/// Builder struct for [OpenIdProvider].
#[derive(Debug)]
pub struct OpenIdProviderBuilder<S, F> {
    config: Option<ProviderConfig>,
    flow: Option<Arc<F>>,
    session_store: Option<Arc<dyn SessionStore<S> + Send + Sync>>,
    signer: Option<Arc<dyn TokenSigner + Send + Sync>>,
}

impl<S, F> Default for OpenIdProviderBuilder<S, F> {
    fn default() -> Self {
        Self {
            config: None,
            flow: None,
            session_store: None,
            signer: None,
        }
    }
}

impl<S, F> OpenIdProviderBuilder<S, F> {
    /// Build the provider.
    pub fn build(self) -> Result<OpenIdProvider<S, F>> {
        let Self {
            config,
            flow,
            session_store,
            signer,
        } = self;

        let Some(config) = config else {
            bail!("config is required, see `with_config`")
        };

        let Some(flow) = flow else {
            bail!("authorization flow is required, see `with_flow`")
        };

        let Some(session_store) = session_store else {
            bail!("session store is required, see `with_session_store`")
        };

        let Some(signer) = signer else {
            bail!("signer is required, see `with_signer`")
        };

        Ok(OpenIdProvider {
            config,
            flow,
            session_store,
            signer,
        })
    }

    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the [AuthorizationFlow] deciding which requests are accepted.
    pub fn with_flow(mut self, flow: F) -> Self {
        self.flow = Some(Arc::new(flow));
        self
    }

    /// Set the [SessionStore] that the [OpenIdProvider] will use to maintain authorization
    /// sessions across requests.
    pub fn with_session_store(
        mut self,
        session_store: Arc<dyn SessionStore<S> + Send + Sync>,
    ) -> Self {
        self.session_store = Some(session_store);
        self
    }

    /// Set the [TokenSigner] that signs and verifies codes and tokens.
    pub fn with_signer(mut self, signer: Arc<dyn TokenSigner + Send + Sync>) -> Self {
        self.signer = Some(signer);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::authorization_request::parameters::State;
    use session::MemoryStore;
    use signer::P256Signer;

    fn provider() -> OpenIdProvider<Session, AuthorizationCodeFlow> {
        let base_url = BaseUrl::try_from("https://issuer.example.com/oid4vc").unwrap();
        OpenIdProvider::<Session, AuthorizationCodeFlow>::builder()
            .with_config(ProviderConfig::new(base_url, "https://issuer.example.com"))
            .with_flow(AuthorizationCodeFlow)
            .with_session_store(Arc::new(MemoryStore::new()))
            .with_signer(Arc::new(P256Signer::random()))
            .build()
            .unwrap()
    }

    #[test]
    fn discovery_urls() {
        let provider = provider();
        assert_eq!(
            provider.discovery_url().unwrap().as_str(),
            "https://issuer.example.com/oid4vc/.well-known/openid-configuration"
        );
        assert_eq!(
            provider.issuer_metadata_url().unwrap().as_str(),
            "https://issuer.example.com/oid4vc/.well-known/openid-credential-issuer"
        );
    }

    #[test]
    fn builder_requires_signer() {
        let err = OpenIdProvider::<Session, AuthorizationCodeFlow>::builder()
            .with_config(ProviderConfig::new(
                BaseUrl::try_from("https://issuer.example.com").unwrap(),
                "https://issuer.example.com",
            ))
            .with_flow(AuthorizationCodeFlow)
            .with_session_store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "signer is required, see `with_signer`");
    }

    #[tokio::test]
    async fn tokens_are_bound_to_their_target() {
        let provider = provider();
        let token = provider
            .generate_token("session-1", TokenTarget::Access, Some("jti-1"))
            .await
            .unwrap();

        let payload = provider
            .verify_and_parse_token(&token, TokenTarget::Access)
            .await
            .unwrap();
        assert_eq!(payload["sub"], "session-1");
        assert_eq!(payload["iss"], "https://issuer.example.com");
        assert_eq!(payload["jti"], "jti-1");

        assert!(provider
            .verify_and_parse_token(&token, TokenTarget::Token)
            .await
            .is_none());
        assert!(!provider.validate_access_token("garbage").await);
    }

    #[tokio::test]
    async fn authorization_code_flow() {
        let provider = provider();
        let request = AuthorizationRequest::new(ResponseType::Code, "client-1")
            .with(State("af0ifjsldkj".into()));
        let session = provider
            .initialize_authorization(request, 300)
            .await
            .unwrap();

        let response = provider.continue_authorization(&session).await.unwrap();
        let AuthorizationResponse::Success(success) = response else {
            panic!("expected a successful authorization response")
        };
        assert_eq!(success.state.as_deref(), Some("af0ifjsldkj"));

        let token = provider
            .process_token_request(&TokenRequest::authorization_code(success.code))
            .await
            .unwrap();
        assert!(provider
            .validate_access_token(token.access_token().unwrap())
            .await);
    }

    #[tokio::test]
    async fn rejects_requests_the_flow_does_not_accept() {
        let provider = provider();
        let err = provider
            .initialize_authorization(AuthorizationRequest::new(ResponseType::VpToken, "c"), 300)
            .await
            .unwrap_err();
        let Error::Authorization(err) = err else {
            panic!("unexpected error: {err}")
        };
        assert_eq!(err.code, AuthorizationErrorCode::InvalidRequest);
        assert_eq!(err.message.as_deref(), Some("Invalid authorization request"));
    }

    #[test]
    fn credential_errors_carry_a_fresh_nonce() {
        let provider = provider();
        let err = provider.credential_error(
            CredentialRequest::new("jwt_vc_json", vec!["VerifiableCredential".into()]),
            CredentialErrorCode::InvalidOrMissingProof,
            None,
        );
        assert_eq!(err.response.c_nonce.as_ref().map(String::len), Some(16));
        assert_eq!(err.response.c_nonce_expires_in, Some(300));
    }
}
