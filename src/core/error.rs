//! Protocol errors.
//!
//! Every rejection the protocol defines is a value pairing the object that was rejected, a code
//! from one of the closed enumerations below and an optional description. Each converts into the
//! response shape the protocol puts on the wire. Anything outside the taxonomy surfaces as
//! [Error::Other].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    authorization_request::AuthorizationRequest,
    credential::{BatchCredentialRequest, CredentialRequest},
    credential_offer::{CredentialOffer, CredentialOfferRequest},
    response::{
        credential::{BatchCredentialResponse, CredentialOfferResponse, CredentialResponse},
        AuthorizationResponse, PushedAuthorizationResponse, TokenResponse,
    },
    token_request::TokenRequest,
};

/// Declares a closed set of error codes serialized as their exact wire strings.
macro_rules! error_codes {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }
    };
}

error_codes!(
    /// Token endpoint error codes, see RFC 6749 section 5.2.
    TokenErrorCode {
        InvalidRequest => "invalid_request",
        InvalidClient => "invalid_client",
        /// The code is invalid, expired, revoked or was issued to another client.
        InvalidGrant => "invalid_grant",
        UnauthorizedClient => "unauthorized_client",
        UnsupportedGrantType => "unsupported_grant_type",
        InvalidScope => "invalid_scope",
    }
);

error_codes!(
    /// Authorization endpoint error codes, including those OpenID4VP adds.
    AuthorizationErrorCode {
        InvalidRequest => "invalid_request",
        UnauthorizedClient => "unauthorized_client",
        AccessDenied => "access_denied",
        UnsupportedResponseType => "unsupported_response_type",
        InvalidScope => "invalid_scope",
        ServerError => "server_error",
        TemporarilyUnavailable => "temporarily_unavailable",
        InvalidClient => "invalid_client",
        InvalidRequestUri => "invalid_request_uri",
        InvalidRequestObject => "invalid_request_object",
        VpFormatsNotSupported => "vp_formats_not_supported",
        /// The Presentation Definition URL cannot be reached.
        InvalidPresentationDefinitionUri => "invalid_presentation_definition_uri",
        /// The Presentation Definition URL can be reached, but the content found there is not a
        /// valid `presentation_definition`.
        InvalidPresentationDefinitionReference => "invalid_presentation_definition_reference",
    }
);

error_codes!(
    /// Credential, batch credential and deferred credential endpoint error codes.
    CredentialErrorCode {
        InvalidRequest => "invalid_request",
        InvalidToken => "invalid_token",
        InsufficientScope => "insufficient_scope",
        UnsupportedCredentialType => "unsupported_credential_type",
        UnsupportedCredentialFormat => "unsupported_credential_format",
        /// The proof is missing, or not bound to a `c_nonce` issued by the Credential Issuer.
        InvalidOrMissingProof => "invalid_or_missing_proof",
        InvalidEncryptionParameters => "invalid_encryption_parameters",
        IssuancePending => "issuance_pending",
        InvalidTransactionId => "invalid_transaction_id",
    }
);

error_codes!(
    /// Errors raised while receiving a Credential Offer.
    CredentialOfferErrorCode {
        InvalidRequest => "invalid_request",
        InvalidIssuer => "invalid_issuer",
    }
);

/// Wire shape of an OAuth 2.0 error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse<C> {
    pub error: C,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl<C> ErrorResponse<C> {
    pub fn new(error: C, error_description: Option<String>) -> Self {
        Self {
            error,
            error_description,
            error_uri: None,
            state: None,
        }
    }
}

impl<C: Serialize> ErrorResponse<C> {
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Encode for a redirect, as `error=...&error_description=...`.
    pub fn to_query(&self) -> anyhow::Result<String> {
        Ok(serde_urlencoded::to_string(self)?)
    }
}

/// Wire shape of a credential endpoint error response.
///
/// A rejected request can still hand the wallet a fresh `c_nonce` to retry with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialErrorResponse {
    pub error: CredentialErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
}

impl CredentialErrorResponse {
    pub fn new(error: CredentialErrorCode) -> Self {
        Self {
            error,
            error_description: None,
            error_uri: None,
            c_nonce: None,
            c_nonce_expires_in: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    pub fn with_error_uri(mut self, error_uri: impl Into<String>) -> Self {
        self.error_uri = Some(error_uri.into());
        self
    }

    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>, expires_in: i64) -> Self {
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_in = Some(expires_in);
        self
    }

    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_query(&self) -> anyhow::Result<String> {
        Ok(serde_urlencoded::to_string(self)?)
    }
}

fn describe(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// A Token Request was rejected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("token request rejected with {code}{}", describe(.message))]
pub struct TokenError {
    pub request: TokenRequest,
    pub code: TokenErrorCode,
    pub message: Option<String>,
}

impl TokenError {
    pub fn new(request: TokenRequest, code: TokenErrorCode) -> Self {
        Self {
            request,
            code,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn to_response(&self) -> TokenResponse {
        TokenResponse::error(self.code, self.message.clone())
    }
}

/// An Authorization Request, or a Pushed Authorization Request, was rejected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("authorization request rejected with {code}{}", describe(.message))]
pub struct AuthorizationError {
    pub request: AuthorizationRequest,
    pub code: AuthorizationErrorCode,
    pub message: Option<String>,
}

impl AuthorizationError {
    pub fn new(request: AuthorizationRequest, code: AuthorizationErrorCode) -> Self {
        Self {
            request,
            code,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The error response, echoing the request's `state`.
    pub fn to_response(&self) -> AuthorizationResponse {
        let mut response = ErrorResponse::new(self.code, self.message.clone());
        response.state = self.request.state().map(|state| state.0);
        AuthorizationResponse::Error(response)
    }

    pub fn to_pushed_authorization_response(&self) -> PushedAuthorizationResponse {
        PushedAuthorizationResponse::error(self.code, self.message.clone())
    }
}

/// A Credential Request was rejected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("credential request rejected with {}{}", .response.error, describe(&.response.error_description))]
pub struct CredentialError {
    pub request: CredentialRequest,
    pub response: CredentialErrorResponse,
}

impl CredentialError {
    pub fn new(request: CredentialRequest, response: CredentialErrorResponse) -> Self {
        Self { request, response }
    }

    pub fn code(&self) -> CredentialErrorCode {
        self.response.error
    }

    pub fn to_response(&self) -> CredentialResponse {
        CredentialResponse::Error(self.response.clone())
    }
}

/// A Deferred Credential Request was rejected, e.g. because issuance is still pending.
#[derive(Debug, Clone, thiserror::Error)]
#[error("deferred credential request rejected with {}{}", .response.error, describe(&.response.error_description))]
pub struct DeferredCredentialError {
    pub response: CredentialErrorResponse,
}

impl DeferredCredentialError {
    pub fn new(response: CredentialErrorResponse) -> Self {
        Self { response }
    }

    pub fn code(&self) -> CredentialErrorCode {
        self.response.error
    }

    pub fn to_response(&self) -> CredentialResponse {
        CredentialResponse::Error(self.response.clone())
    }
}

/// A Batch Credential Request was rejected as a whole.
#[derive(Debug, Clone, thiserror::Error)]
#[error("batch credential request rejected with {}{}", .response.error, describe(&.response.error_description))]
pub struct BatchCredentialError {
    pub request: BatchCredentialRequest,
    pub response: CredentialErrorResponse,
}

impl BatchCredentialError {
    pub fn new(request: BatchCredentialRequest, response: CredentialErrorResponse) -> Self {
        Self { request, response }
    }

    pub fn code(&self) -> CredentialErrorCode {
        self.response.error
    }

    pub fn to_response(&self) -> BatchCredentialResponse {
        BatchCredentialResponse::Error(self.response.clone())
    }
}

/// A Credential Offer could not be accepted.
///
/// Carries whichever of the offer request and the offer itself were available when the problem
/// was detected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("credential offer rejected with {code}{}", describe(.message))]
pub struct CredentialOfferError {
    pub offer_request: Option<CredentialOfferRequest>,
    pub offer: Option<CredentialOffer>,
    pub code: CredentialOfferErrorCode,
    pub message: Option<String>,
}

impl CredentialOfferError {
    pub fn new(
        offer_request: Option<CredentialOfferRequest>,
        offer: Option<CredentialOffer>,
        code: CredentialOfferErrorCode,
    ) -> Self {
        Self {
            offer_request,
            offer,
            code,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn to_response(&self) -> CredentialOfferResponse {
        CredentialOfferResponse::error(self.code, self.message.clone())
    }
}

/// Any failure of a provider operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    DeferredCredential(#[from] DeferredCredentialError),
    #[error(transparent)]
    BatchCredential(#[from] BatchCredentialError),
    #[error(transparent)]
    CredentialOffer(#[from] CredentialOfferError),
    /// A failure outside the protocol's error taxonomy, e.g. a collaborator that could not sign
    /// or a session store that could not be reached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether this failure maps to a protocol error response.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, Error::Other(_))
    }

    /// The wire error body for protocol errors, `None` for unclassified failures.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        let json = match self {
            Error::Token(e) => serde_json::to_value(e.to_response()),
            Error::Authorization(e) => serde_json::to_value(e.to_response()),
            Error::Credential(e) => serde_json::to_value(&e.response),
            Error::DeferredCredential(e) => serde_json::to_value(&e.response),
            Error::BatchCredential(e) => serde_json::to_value(&e.response),
            Error::CredentialOffer(e) => serde_json::to_value(e.to_response()),
            Error::Other(_) => return None,
        };
        json.ok()
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::core::token_request::GrantType;

    #[test]
    fn codes_serialize_to_wire_strings() {
        assert_eq!(
            serde_json::to_value(AuthorizationErrorCode::InvalidPresentationDefinitionReference)
                .unwrap(),
            json!("invalid_presentation_definition_reference")
        );
        assert_eq!(TokenErrorCode::UnsupportedGrantType.to_string(), "unsupported_grant_type");
        assert_eq!(
            serde_json::from_value::<CredentialOfferErrorCode>(json!("invalid_issuer")).unwrap(),
            CredentialOfferErrorCode::InvalidIssuer
        );
    }

    #[test]
    fn token_error_response() {
        let err = TokenError::new(
            TokenRequest::new(GrantType::Other("refresh_token".into())),
            TokenErrorCode::UnsupportedGrantType,
        )
        .with_message("Grant type not supported");

        assert_eq!(
            serde_json::to_value(err.to_response()).unwrap(),
            json!({
                "error": "unsupported_grant_type",
                "error_description": "Grant type not supported"
            })
        );
        assert_eq!(
            err.to_string(),
            "token request rejected with unsupported_grant_type: Grant type not supported"
        );
    }

    #[test]
    fn credential_error_carries_fresh_nonce() {
        let err = CredentialError::new(
            CredentialRequest::new("jwt_vc_json", vec!["VerifiableCredential".into()]),
            CredentialErrorResponse::new(CredentialErrorCode::InvalidOrMissingProof)
                .with_c_nonce("tZignsnFbp", 86400),
        );

        assert_eq!(
            Error::from(err).to_json().unwrap(),
            json!({
                "error": "invalid_or_missing_proof",
                "c_nonce": "tZignsnFbp",
                "c_nonce_expires_in": 86400
            })
        );
    }

    #[test]
    fn error_query_encoding() {
        let response = ErrorResponse::new(
            AuthorizationErrorCode::InvalidRequest,
            Some("Invalid request description".into()),
        );
        assert_eq!(
            response.to_query().unwrap(),
            "error=invalid_request&error_description=Invalid+request+description"
        );
    }

    #[test]
    fn unclassified_failures_have_no_wire_shape() {
        let err = Error::from(anyhow::anyhow!("signing key unavailable"));
        assert!(!err.is_protocol_error());
        assert!(err.to_json().is_none());
    }
}
