//! Self-Issued OpenID Provider with Verifiable Presentations.
//!
//! The [PresentationExchange] flow accepts `vp_token` authorization requests whose Presentation
//! Definition this provider can satisfy, resolves parameters passed by reference, and answers
//! token requests with the presentations produced by a [PresentationGenerator]. It also issues
//! DID-bound proofs of possession for credential requests.

use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    core::{
        authorization_request::{
            parameters::{
                ClientMetadata, ClientMetadataUri, Nonce, PresentationDefinition,
                PresentationDefinitionUri, ResponseType,
            },
            AuthorizationRequest,
        },
        credential::ProofOfPossession,
        error::{AuthorizationError, AuthorizationErrorCode, Error},
        presentation_definition::PresentationDefinition as PresentationDefinitionParsed,
        presentation_submission::PresentationSubmission,
        response::{TokenResponse, TokenSuccess},
        token_request::TokenRequest,
        util::{random_string, JsonResolver},
    },
    provider::{
        session::AuthorizationSession,
        signer::TokenTarget,
        AuthorizationFlow, OpenIdProvider,
    },
};

const NONCE_LENGTH: usize = 16;

/// An authorization session for a presentation request.
#[derive(Debug, Clone, PartialEq)]
pub struct SiopSession {
    pub id: String,
    pub authorization_request: AuthorizationRequest,
    pub expiration_timestamp: i64,
    pub presentation_definition: Option<PresentationDefinitionParsed>,
    /// Challenge the presentations are bound to.
    pub nonce: String,
}

impl AuthorizationSession for SiopSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn authorization_request(&self) -> &AuthorizationRequest {
        &self.authorization_request
    }

    fn expiration_timestamp(&self) -> i64 {
        self.expiration_timestamp
    }
}

/// Resolves a DID to the identifier of the key that signs on its behalf.
#[async_trait]
pub trait DidResolver: Debug {
    async fn resolve(&self, did: &str) -> Result<String>;
}

/// Presentations answering a presentation request.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationResult {
    pub presentations: Vec<Json>,
    pub presentation_submission: PresentationSubmission,
}

impl PresentationResult {
    /// The `vp_token`: a single presentation as is, several as an array.
    pub fn vp_token(&self) -> Json {
        match self.presentations.as_slice() {
            [presentation] => presentation.clone(),
            presentations => Json::Array(presentations.to_vec()),
        }
    }
}

/// Builds the presentations for a session's Presentation Definition.
#[async_trait]
pub trait PresentationGenerator: Debug {
    async fn generate_presentation(
        &self,
        session: &SiopSession,
        request: &TokenRequest,
    ) -> Result<PresentationResult>;
}

/// Decides whether this provider can satisfy a Presentation Definition.
pub trait DefinitionSupport: Debug + Send + Sync {
    fn is_supported(&self, definition: &PresentationDefinitionParsed) -> bool;
}

/// Supports every Presentation Definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyDefinition;

impl DefinitionSupport for AnyDefinition {
    fn is_supported(&self, _definition: &PresentationDefinitionParsed) -> bool {
        true
    }
}

/// Supports Presentation Definitions that only ask for the listed claim formats.
///
/// A definition that restricts no format is supported.
#[derive(Debug, Clone, Default)]
pub struct SupportedFormats(BTreeSet<String>);

impl SupportedFormats {
    pub fn new<I, T>(formats: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(formats.into_iter().map(Into::into).collect())
    }
}

impl DefinitionSupport for SupportedFormats {
    fn is_supported(&self, definition: &PresentationDefinitionParsed) -> bool {
        definition
            .format_designations()
            .all(|designation| self.0.contains(designation))
    }
}

/// The presentation exchange authorization flow.
#[derive(Debug, Clone)]
pub struct PresentationExchange {
    json_resolver: Arc<dyn JsonResolver + Send + Sync>,
    did_resolver: Arc<dyn DidResolver + Send + Sync>,
    definition_support: Arc<dyn DefinitionSupport>,
    presentation_generator: Option<Arc<dyn PresentationGenerator + Send + Sync>>,
}

impl PresentationExchange {
    /// A flow supporting any Presentation Definition, and leaving token responses to the
    /// provider until a [PresentationGenerator] is set.
    pub fn new(
        json_resolver: Arc<dyn JsonResolver + Send + Sync>,
        did_resolver: Arc<dyn DidResolver + Send + Sync>,
    ) -> Self {
        Self {
            json_resolver,
            did_resolver,
            definition_support: Arc::new(AnyDefinition),
            presentation_generator: None,
        }
    }

    pub fn with_definition_support(mut self, support: Arc<dyn DefinitionSupport>) -> Self {
        self.definition_support = support;
        self
    }

    pub fn with_presentation_generator(
        mut self,
        generator: Arc<dyn PresentationGenerator + Send + Sync>,
    ) -> Self {
        self.presentation_generator = Some(generator);
        self
    }

    pub fn is_presentation_definition_supported(
        &self,
        definition: &PresentationDefinitionParsed,
    ) -> bool {
        self.definition_support.is_supported(definition)
    }
}

#[async_trait]
impl AuthorizationFlow<SiopSession> for PresentationExchange {
    fn validate_authorization_request(&self, request: &AuthorizationRequest) -> bool {
        if request.response_type() != Some(ResponseType::VpToken) {
            return false;
        }
        match request.parameter::<PresentationDefinition>() {
            Ok(Some(definition)) => {
                self.is_presentation_definition_supported(definition.parsed())
            }
            Ok(None) => false,
            Err(e) => {
                debug!("presentation_definition could not be parsed: {e:#}");
                false
            }
        }
    }

    fn invalid_request_message(&self) -> &str {
        "Invalid VP authorization request"
    }

    fn create_session(
        &self,
        id: String,
        request: AuthorizationRequest,
        expiration_timestamp: i64,
    ) -> Result<SiopSession> {
        let presentation_definition = request
            .parameter::<PresentationDefinition>()?
            .map(PresentationDefinition::into_parsed);
        let nonce = match request.parameter::<Nonce>()? {
            Some(Nonce(nonce)) => nonce,
            None => random_string(NONCE_LENGTH),
        };
        Ok(SiopSession {
            id,
            authorization_request: request,
            expiration_timestamp,
            presentation_definition,
            nonce,
        })
    }

    async fn generate_token_response(
        &self,
        session: &SiopSession,
        request: &TokenRequest,
    ) -> Result<Option<TokenResponse>> {
        let Some(generator) = &self.presentation_generator else {
            return Ok(None);
        };
        let result = generator
            .generate_presentation(session, request)
            .await
            .context("unable to generate presentation")?;
        Ok(Some(TokenResponse::Success(TokenSuccess {
            vp_token: Some(result.vp_token()),
            presentation_submission: Some(result.presentation_submission),
            state: session.authorization_request.state().map(|state| state.0),
            ..Default::default()
        })))
    }
}

/// A provider answering presentation requests.
pub type SiopProvider = OpenIdProvider<SiopSession, PresentationExchange>;

impl OpenIdProvider<SiopSession, PresentationExchange> {
    /// Whether the request asks for a `vp_token` against a supported Presentation Definition.
    pub fn validate_authorization_request(&self, request: &AuthorizationRequest) -> bool {
        self.flow().validate_authorization_request(request)
    }

    /// Resolve `presentation_definition_uri` and `client_metadata_uri`, returning a request that
    /// carries both values inline. Values already inline take precedence.
    pub async fn resolve_authorization_parameters(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationRequest, AuthorizationError> {
        let reject = |code, message: &str| {
            AuthorizationError::new(request.clone(), code).with_message(message)
        };
        let malformed = |e: anyhow::Error| {
            debug!("resolved parameter could not be decoded: {e:#}");
            AuthorizationError::new(
                request.clone(),
                AuthorizationErrorCode::InvalidPresentationDefinitionReference,
            )
        };
        let unresolvable_definition = || {
            reject(
                AuthorizationErrorCode::InvalidPresentationDefinitionUri,
                "Presentation definition URI cannot be resolved.",
            )
        };

        let presentation_definition = match request
            .parameter::<PresentationDefinition>()
            .map_err(malformed)?
        {
            Some(definition) => definition,
            None => {
                let uri = match request.parameter::<PresentationDefinitionUri>() {
                    Ok(Some(PresentationDefinitionUri(uri))) => uri,
                    Ok(None) => {
                        return Err(reject(
                            AuthorizationErrorCode::InvalidRequest,
                            "Presentation definition could not be resolved from \
                             presentation_definition or presentation_definition_uri parameters",
                        ))
                    }
                    Err(e) => {
                        debug!("presentation_definition_uri is not a URL: {e:#}");
                        return Err(unresolvable_definition());
                    }
                };
                let json = self
                    .flow()
                    .json_resolver
                    .resolve(&uri)
                    .await
                    .ok_or_else(|| {
                        warn!("presentation definition could not be fetched from {uri}");
                        unresolvable_definition()
                    })?;
                PresentationDefinition::try_from(json).map_err(malformed)?
            }
        };

        let client_metadata = match request.parameter::<ClientMetadata>().map_err(malformed)? {
            Some(metadata) => metadata,
            None => {
                let resolved = match request.parameter::<ClientMetadataUri>() {
                    Ok(Some(ClientMetadataUri(uri))) => {
                        self.flow().json_resolver.resolve(&uri).await
                    }
                    _ => None,
                };
                let json = resolved.ok_or_else(|| {
                    reject(
                        AuthorizationErrorCode::InvalidClient,
                        "Invalid client metadata or client metadata could not be resolved.",
                    )
                })?;
                ClientMetadata::try_from(json).map_err(malformed)?
            }
        };

        Ok(request
            .clone()
            .with(presentation_definition)
            .with(client_metadata))
    }

    /// Sign a proof that the holder of `did` controls its key, bound to `nonce` and addressed to
    /// `audience`.
    pub async fn generate_proof_of_possession(
        &self,
        did: &str,
        audience: &str,
        nonce: &str,
        client: Option<&ClientConfig>,
    ) -> Result<ProofOfPossession, Error> {
        let key_id = self
            .flow()
            .did_resolver
            .resolve(did)
            .await
            .with_context(|| format!("unable to resolve {did}"))?;

        let mut payload = Map::new();
        if let Some(client) = client {
            payload.insert("iss".into(), client.client_id.as_str().into());
        }
        payload.insert("aud".into(), audience.into());
        payload.insert("iat".into(), Utc::now().timestamp().into());
        payload.insert("nonce".into(), nonce.into());

        let mut header = Map::new();
        header.insert("kid".into(), key_id.as_str().into());

        let jwt = self
            .signer()
            .sign(
                TokenTarget::ProofOfPossession,
                &payload,
                Some(&header),
                Some(&key_id),
            )
            .await
            .context("unable to sign proof of possession")?;
        Ok(ProofOfPossession::jwt(jwt))
    }
}
