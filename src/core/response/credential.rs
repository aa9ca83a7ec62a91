//! Responses of the credential issuance endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::decode_outcome;
use crate::core::{
    credential_offer::CredentialOffer,
    error::{CredentialErrorResponse, CredentialOfferErrorCode, ErrorResponse},
    object::UntypedObject,
};

/// Response of the credential endpoint.
///
/// The credential is either issued immediately, or deferred and later fetched from the deferred
/// credential endpoint with the `acceptance_token`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CredentialResponse {
    Immediate(IssuedCredential),
    Deferred(DeferredCredential),
    Error(CredentialErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub format: String,
    pub credential: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub acceptance_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
}

impl<'de> Deserialize<'de> for CredentialResponse {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let object = UntypedObject::deserialize(d)?;
        if object.contains_key("credential") && object.contains_key("acceptance_token") {
            return Err(D::Error::custom(
                "response carries both a credential and an acceptance_token",
            ));
        }
        let outcome = if object.contains_key("acceptance_token") {
            decode_outcome::<DeferredCredential, CredentialErrorResponse>(
                object,
                &["acceptance_token"],
            )
            .map(|outcome| outcome.map_or_else(Self::Error, Self::Deferred))
        } else {
            decode_outcome::<IssuedCredential, CredentialErrorResponse>(object, &["credential"])
                .map(|outcome| outcome.map_or_else(Self::Error, Self::Immediate))
        };
        outcome.map_err(D::Error::custom)
    }
}

impl CredentialResponse {
    pub fn success(format: impl Into<String>, credential: Json) -> Self {
        Self::Immediate(IssuedCredential {
            format: format.into(),
            credential,
            c_nonce: None,
            c_nonce_expires_in: None,
        })
    }

    pub fn deferred(format: Option<String>, acceptance_token: impl Into<String>) -> Self {
        Self::Deferred(DeferredCredential {
            format,
            acceptance_token: acceptance_token.into(),
            c_nonce: None,
            c_nonce_expires_in: None,
        })
    }

    pub fn error(response: CredentialErrorResponse) -> Self {
        Self::Error(response)
    }

    /// Attach a fresh `c_nonce` for the holder's next proof.
    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>, expires_in: i64) -> Self {
        let c_nonce = Some(c_nonce.into());
        match &mut self {
            Self::Immediate(issued) => {
                issued.c_nonce = c_nonce;
                issued.c_nonce_expires_in = Some(expires_in);
            }
            Self::Deferred(deferred) => {
                deferred.c_nonce = c_nonce;
                deferred.c_nonce_expires_in = Some(expires_in);
            }
            Self::Error(error) => {
                error.c_nonce = c_nonce;
                error.c_nonce_expires_in = Some(expires_in);
            }
        }
        self
    }

    /// Whether a credential was issued with this response.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Immediate(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn credential(&self) -> Option<&Json> {
        match self {
            Self::Immediate(issued) => Some(&issued.credential),
            _ => None,
        }
    }

    pub fn acceptance_token(&self) -> Option<&str> {
        match self {
            Self::Deferred(deferred) => Some(&deferred.acceptance_token),
            _ => None,
        }
    }

    pub fn error_response(&self) -> Option<&CredentialErrorResponse> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Response of the batch credential endpoint.
///
/// The individual responses may mix issued, deferred and failed credentials, but the batch as a
/// whole either succeeds or fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchCredentialResponse {
    Success(BatchCredentialSuccess),
    Error(CredentialErrorResponse),
}

outcome_deserialize!(BatchCredentialResponse, Success, Error, ["credential_responses"]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCredentialSuccess {
    pub credential_responses: Vec<CredentialResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
}

impl BatchCredentialResponse {
    pub fn success(credential_responses: Vec<CredentialResponse>) -> Self {
        Self::Success(BatchCredentialSuccess {
            credential_responses,
            c_nonce: None,
            c_nonce_expires_in: None,
        })
    }

    pub fn error(response: CredentialErrorResponse) -> Self {
        Self::Error(response)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn credential_responses(&self) -> Option<&[CredentialResponse]> {
        match self {
            Self::Success(success) => Some(&success.credential_responses),
            Self::Error(_) => None,
        }
    }
}

/// The outcome of receiving a Credential Offer, as reported by a wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CredentialOfferResponse {
    Success(AcceptedCredentialOffer),
    Error(ErrorResponse<CredentialOfferErrorCode>),
}

outcome_deserialize!(CredentialOfferResponse, Success, Error, ["credential_offer"]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedCredentialOffer {
    pub credential_offer: CredentialOffer,
}

impl CredentialOfferResponse {
    pub fn success(credential_offer: CredentialOffer) -> Self {
        Self::Success(AcceptedCredentialOffer { credential_offer })
    }

    pub fn error(code: CredentialOfferErrorCode, description: Option<String>) -> Self {
        Self::Error(ErrorResponse::new(code, description))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn credential_offer(&self) -> Option<&CredentialOffer> {
        match self {
            Self::Success(success) => Some(&success.credential_offer),
            Self::Error(_) => None,
        }
    }
}
