//! Credential Offers, as sent from a Credential Issuer to a wallet.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;
use url::Url;

use super::{
    error::{CredentialOfferError, CredentialOfferErrorCode},
    util::JsonResolver,
};

pub const PRE_AUTHORIZED_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:pre-authorized_code";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialOffer {
    pub credential_issuer: String,
    /// Offered credentials, each either a metadata identifier string or an inline object.
    pub credentials: Vec<Json>,
    #[serde(default)]
    pub grants: Grants,
}

impl CredentialOffer {
    pub fn new(credential_issuer: impl Into<String>, credentials: Vec<Json>) -> Self {
        Self {
            credential_issuer: credential_issuer.into(),
            credentials,
            grants: Grants::default(),
        }
    }

    pub fn with_authorization_code(mut self, issuer_state: Option<String>) -> Self {
        self.grants.authorization_code = Some(AuthorizationCodeGrant { issuer_state });
        self
    }

    pub fn with_pre_authorized_code(
        mut self,
        pre_authorized_code: impl Into<String>,
        user_pin_required: bool,
    ) -> Self {
        self.grants.pre_authorized_code = Some(PreAuthorizedCodeGrant {
            pre_authorized_code: pre_authorized_code.into(),
            user_pin_required,
        });
        self
    }

    /// Check that the offer names a usable Credential Issuer.
    pub fn credential_issuer_url(&self) -> Result<Url> {
        anyhow::ensure!(
            !self.credential_issuer.is_empty(),
            "credential_issuer is empty"
        );
        Url::parse(&self.credential_issuer).context("credential_issuer is not a URL")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<AuthorizationCodeGrant>,
    #[serde(
        rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthorizedCodeGrant {
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,
    #[serde(default)]
    pub user_pin_required: bool,
}

/// The request by which a wallet receives a Credential Offer, by value or by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialOfferRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_offer: Option<CredentialOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_offer_uri: Option<Url>,
}

impl CredentialOfferRequest {
    pub fn by_value(offer: CredentialOffer) -> Self {
        Self {
            credential_offer: Some(offer),
            credential_offer_uri: None,
        }
    }

    pub fn by_reference(uri: Url) -> Self {
        Self {
            credential_offer: None,
            credential_offer_uri: Some(uri),
        }
    }

    /// Parse from the query of an offer URL, e.g. `openid-credential-offer://?credential_offer=...`.
    pub fn from_url(url: &Url) -> Result<Self> {
        let mut request = Self {
            credential_offer: None,
            credential_offer_uri: None,
        };
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "credential_offer" => {
                    request.credential_offer = Some(
                        serde_json::from_str(&value).context("credential_offer is not valid")?,
                    )
                }
                "credential_offer_uri" => {
                    request.credential_offer_uri =
                        Some(value.parse().context("credential_offer_uri is not a URL")?)
                }
                _ => {}
            }
        }
        Ok(request)
    }

    /// Encode as the query of an offer URL.
    pub fn to_query(&self) -> Result<String> {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(offer) = &self.credential_offer {
            serializer.append_pair("credential_offer", &serde_json::to_string(offer)?);
        }
        if let Some(uri) = &self.credential_offer_uri {
            serializer.append_pair("credential_offer_uri", uri.as_str());
        }
        Ok(serializer.finish())
    }
}

/// Obtain the Credential Offer a request carries, fetching it if passed by reference.
pub async fn resolve_credential_offer<R: JsonResolver + ?Sized>(
    request: &CredentialOfferRequest,
    resolver: &R,
) -> Result<CredentialOffer, CredentialOfferError> {
    let error = |code, message: &str| {
        CredentialOfferError::new(Some(request.clone()), None, code).with_message(message)
    };

    let offer = match (&request.credential_offer, &request.credential_offer_uri) {
        (Some(offer), _) => offer.clone(),
        (None, Some(uri)) => {
            let json = resolver.resolve(uri).await.ok_or_else(|| {
                error(
                    CredentialOfferErrorCode::InvalidRequest,
                    "Credential offer URI cannot be resolved.",
                )
            })?;
            serde_json::from_value(json).map_err(|e| {
                debug!("credential offer from {uri} could not be decoded: {e}");
                error(
                    CredentialOfferErrorCode::InvalidRequest,
                    "Credential offer could not be decoded.",
                )
            })?
        }
        (None, None) => {
            return Err(error(
                CredentialOfferErrorCode::InvalidRequest,
                "No credential_offer or credential_offer_uri parameter found",
            ))
        }
    };

    if let Err(e) = offer.credential_issuer_url() {
        debug!("rejecting credential offer: {e:#}");
        return Err(CredentialOfferError::new(
            Some(request.clone()),
            Some(offer),
            CredentialOfferErrorCode::InvalidIssuer,
        )
        .with_message("Credential offer does not name a valid credential issuer"));
    }

    Ok(offer)
}
