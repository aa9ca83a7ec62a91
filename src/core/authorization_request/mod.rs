use std::ops::Deref;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use url::Url;

use self::parameters::{ClientId, RequestUri, ResponseType, State};

use super::object::{TypedParameter, UntypedObject};

pub mod parameters;

/// An OAuth 2.0 / OpenID Authorization Request.
///
/// The request is kept as the JSON object it was received as, so parameters this library does
/// not model survive a round trip. Known parameters are read through [TypedParameter]s, see
/// [parameters]. The request is immutable once built: enrichment (for example resolving
/// `presentation_definition_uri`) produces a new request via [AuthorizationRequest::with].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "UntypedObject", into = "UntypedObject")]
pub struct AuthorizationRequest(UntypedObject);

impl AuthorizationRequest {
    pub fn new(response_type: ResponseType, client_id: impl Into<String>) -> Self {
        Self::default()
            .with(response_type)
            .with(ClientId(client_id.into()))
    }

    /// A request continuing a pushed authorization, referring to it by `request_uri`.
    pub fn pushed(client_id: impl Into<String>, request_uri: impl Into<String>) -> Self {
        Self::default()
            .with(ClientId(client_id.into()))
            .with(RequestUri(request_uri.into()))
    }

    /// Return a copy of this request with the parameter set, replacing any previous value.
    pub fn with<T: TypedParameter>(mut self, parameter: T) -> Self {
        // Any previous value is discarded, parseable or not.
        let _ = self.0.insert(parameter);
        self
    }

    /// Read a typed parameter.
    ///
    /// Returns `Ok(None)` when the parameter is absent (or `null`), and an error when it is
    /// present but cannot be parsed.
    pub fn parameter<T: TypedParameter>(&self) -> Result<Option<T>> {
        self.0.get::<T>().transpose()
    }

    pub fn response_type(&self) -> Option<ResponseType> {
        self.parameter().ok().flatten()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.parameter().ok().flatten()
    }

    pub fn state(&self) -> Option<State> {
        self.parameter().ok().flatten()
    }

    /// Parse from urlencoded query parameters.
    ///
    /// Values are kept as strings, except for `presentation_definition` and `client_metadata`
    /// which are JSON encoded when passed by value.
    /// ```
    /// # use openid4vc::core::authorization_request::AuthorizationRequest;
    /// # use openid4vc::core::authorization_request::parameters::ResponseType;
    /// let query = "response_type=vp_token&client_id=xyz&presentation_definition=%7B%22id%22%3A%22pd%22%2C%22input_descriptors%22%3A%5B%5D%7D";
    ///
    /// let request = AuthorizationRequest::from_query_params(query).unwrap();
    ///
    /// assert_eq!(request.response_type(), Some(ResponseType::VpToken));
    /// assert_eq!(request.client_id().unwrap().0, "xyz");
    /// ```
    pub fn from_query_params(query_params: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query_params)
            .context("unable to parse Authorization Request from query params")?;

        let object = pairs
            .into_iter()
            .map(|(key, value)| {
                let json_encoded = key == parameters::PresentationDefinition::KEY
                    || key == parameters::ClientMetadata::KEY;
                let value = if json_encoded {
                    serde_json::from_str(&value)
                        .with_context(|| format!("'{key}' is not valid JSON"))?
                } else {
                    Json::String(value)
                };
                Ok((key, value))
            })
            .collect::<Result<Map<String, Json>>>()?;

        Ok(Self(object.into()))
    }

    /// Parse from [Url] query parameters.
    pub fn from_url(url: &Url) -> Result<Self> {
        Self::from_query_params(url.query().unwrap_or_default())
    }

    /// Encode as urlencoded query parameters, JSON encoding any non-string value.
    pub fn to_query_params(&self) -> Result<String> {
        let pairs: Vec<(&str, String)> = self
            .0 .0
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| match value {
                Json::String(s) => (key.as_str(), s.clone()),
                other => (key.as_str(), other.to_string()),
            })
            .collect();
        serde_urlencoded::to_string(pairs).context("unable to encode Authorization Request")
    }
}

impl Deref for AuthorizationRequest {
    type Target = UntypedObject;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<UntypedObject> for AuthorizationRequest {
    fn from(value: UntypedObject) -> Self {
        Self(value)
    }
}

impl From<AuthorizationRequest> for UntypedObject {
    fn from(value: AuthorizationRequest) -> Self {
        value.0
    }
}
