//! Success and error responses of the token, authorization and pushed authorization endpoints.
//!
//! Each response is an enum with one success arm and one error arm, so a value can never carry
//! both. Decoding rejects JSON objects that carry both a primary payload and an `error`, or
//! neither.

use anyhow::{bail, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as Json;

use super::{
    error::{AuthorizationErrorCode, ErrorResponse, TokenErrorCode},
    object::UntypedObject,
    presentation_submission::PresentationSubmission,
};

pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Split a decoded response object into its success or error payload.
pub(crate) fn decode_outcome<S, E>(object: UntypedObject, primary: &[&str]) -> Result<Result<S, E>>
where
    S: DeserializeOwned,
    E: DeserializeOwned,
{
    let success = primary.iter().any(|key| object.contains_key(key));
    let error = object.contains_key("error");
    let json = Json::from(object);
    match (success, error) {
        (true, false) => Ok(Ok(serde_json::from_value(json)?)),
        (false, true) => Ok(Err(serde_json::from_value(json)?)),
        (true, true) => bail!(
            "response carries both a success payload ({}) and an error",
            primary.join(", ")
        ),
        (false, false) => bail!(
            "response carries neither a success payload ({}) nor an error",
            primary.join(", ")
        ),
    }
}

/// Implements `Deserialize` for a two-armed response enum via [decode_outcome].
macro_rules! outcome_deserialize {
    ($name:ident, $success:ident, $error:ident, [$($primary:literal),+]) => {
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                use serde::de::Error as _;

                let object =
                    <$crate::core::object::UntypedObject as serde::Deserialize>::deserialize(d)?;
                $crate::core::response::decode_outcome(object, &[$($primary),+])
                    .map(|outcome| outcome.map_or_else(Self::$error, Self::$success))
                    .map_err(D::Error::custom)
            }
        }
    };
}

pub(crate) use outcome_deserialize;

pub mod credential;

/// Response of the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenResponse {
    Success(TokenSuccess),
    Error(ErrorResponse<TokenErrorCode>),
}

outcome_deserialize!(TokenResponse, Success, Error, ["access_token", "vp_token"]);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSuccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// A single presentation, or an array of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_submission: Option<PresentationSubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl TokenSuccess {
    pub fn with_expires_in(mut self, expires_in: i64) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>, expires_in: i64) -> Self {
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_in = Some(expires_in);
        self
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }
}

impl TokenResponse {
    /// A bearer access token.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self::Success(TokenSuccess {
            access_token: Some(access_token.into()),
            token_type: Some(BEARER_TOKEN_TYPE.into()),
            ..Default::default()
        })
    }

    /// A Verifiable Presentation answering a presentation request.
    pub fn presentation(vp_token: Json, presentation_submission: PresentationSubmission) -> Self {
        Self::Success(TokenSuccess {
            vp_token: Some(vp_token),
            presentation_submission: Some(presentation_submission),
            ..Default::default()
        })
    }

    pub fn error(code: TokenErrorCode, description: Option<String>) -> Self {
        Self::Error(ErrorResponse::new(code, description))
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Success(success) => success.access_token.is_some() || success.vp_token.is_some(),
            Self::Error(_) => false,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Success(success) => success.access_token.as_deref(),
            Self::Error(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<TokenErrorCode> {
        match self {
            Self::Success(_) => None,
            Self::Error(error) => Some(error.error),
        }
    }
}

/// Response of the authorization endpoint in the authorization code flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuthorizationResponse {
    Success(AuthorizationCodeResponse),
    Error(ErrorResponse<AuthorizationErrorCode>),
}

outcome_deserialize!(AuthorizationResponse, Success, Error, ["code"]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeResponse {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    pub fn success(code: impl Into<String>, state: Option<String>) -> Self {
        Self::Success(AuthorizationCodeResponse {
            code: code.into(),
            state,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Success(success) => Some(&success.code),
            Self::Error(_) => None,
        }
    }

    /// Encode as the query of the redirect back to the client.
    pub fn to_query(&self) -> Result<String> {
        Ok(serde_urlencoded::to_string(self)?)
    }
}

/// Response of the pushed authorization request endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PushedAuthorizationResponse {
    Success(PushedAuthorizationSuccess),
    Error(ErrorResponse<AuthorizationErrorCode>),
}

outcome_deserialize!(PushedAuthorizationResponse, Success, Error, ["request_uri"]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedAuthorizationSuccess {
    pub request_uri: String,
    /// Seconds until the pushed request expires.
    pub expires_in: i64,
}

impl PushedAuthorizationResponse {
    pub fn success(request_uri: impl Into<String>, expires_in: i64) -> Self {
        Self::Success(PushedAuthorizationSuccess {
            request_uri: request_uri.into(),
            expires_in,
        })
    }

    pub fn error(code: AuthorizationErrorCode, description: Option<String>) -> Self {
        Self::Error(ErrorResponse::new(code, description))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn request_uri(&self) -> Option<&str> {
        match self {
            Self::Success(success) => Some(&success.request_uri),
            Self::Error(_) => None,
        }
    }
}
