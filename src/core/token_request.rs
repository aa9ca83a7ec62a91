use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

const AUTHORIZATION_CODE: &str = "authorization_code";
const PRE_AUTHORIZED_CODE: &str = "urn:ietf:params:oauth:grant-type:pre-authorized_code";
const PRE_AUTHORIZED_CODE_SHORT: &str = "pre_authorized_code";

/// The `grant_type` of a Token Request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum GrantType {
    AuthorizationCode,
    /// The OpenID4VCI pre-authorized code grant. Also accepted in its short
    /// `pre_authorized_code` form.
    PreAuthorizedCode,
    /// Any grant type this library does not handle, e.g. `refresh_token`.
    Other(String),
}

impl From<String> for GrantType {
    fn from(s: String) -> Self {
        match s.as_str() {
            AUTHORIZATION_CODE => GrantType::AuthorizationCode,
            PRE_AUTHORIZED_CODE | PRE_AUTHORIZED_CODE_SHORT => GrantType::PreAuthorizedCode,
            _ => GrantType::Other(s),
        }
    }
}

impl From<GrantType> for String {
    fn from(gt: GrantType) -> Self {
        match gt {
            GrantType::AuthorizationCode => AUTHORIZATION_CODE.into(),
            GrantType::PreAuthorizedCode => PRE_AUTHORIZED_CODE.into(),
            GrantType::Other(s) => s,
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantType::AuthorizationCode => AUTHORIZATION_CODE,
            GrantType::PreAuthorizedCode => PRE_AUTHORIZED_CODE,
            GrantType::Other(s) => s,
        }
        .fmt(f)
    }
}

/// A Token Request, as sent to the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(
        rename = "pre-authorized_code",
        alias = "pre_authorized_code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_authorized_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    /// Parameters not modelled above.
    #[serde(flatten)]
    pub custom_parameters: Map<String, Json>,
}

impl TokenRequest {
    pub fn new(grant_type: GrantType) -> Self {
        Self {
            grant_type,
            code: None,
            pre_authorized_code: None,
            user_pin: None,
            client_id: None,
            redirect_uri: None,
            code_verifier: None,
            custom_parameters: Map::new(),
        }
    }

    pub fn authorization_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::new(GrantType::AuthorizationCode)
        }
    }

    pub fn pre_authorized_code(code: impl Into<String>) -> Self {
        Self {
            pre_authorized_code: Some(code.into()),
            ..Self::new(GrantType::PreAuthorizedCode)
        }
    }

    /// Parse from a `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &str) -> Result<Self> {
        serde_urlencoded::from_str(body).context("unable to parse Token Request from form body")
    }

    /// Encode as a `application/x-www-form-urlencoded` body.
    pub fn to_form(&self) -> Result<String> {
        serde_urlencoded::to_string(self).context("unable to encode Token Request")
    }
}
