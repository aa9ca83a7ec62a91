use std::fmt;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use url::Url;

use crate::core::{
    object::{TypedParameter, UntypedObject},
    presentation_definition::PresentationDefinition as PresentationDefinitionParsed,
};

/// Declares a newtype parameter whose JSON form is a single string.
macro_rules! string_parameter {
    ($(#[$meta:meta])* $name:ident($inner:ty) = $key:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl TypedParameter for $name {
            const KEY: &'static str = $key;
        }

        impl TryFrom<Json> for $name {
            type Error = Error;

            fn try_from(value: Json) -> Result<Self, Self::Error> {
                Ok(Self(serde_json::from_value(value)?))
            }
        }

        impl From<$name> for Json {
            fn from(value: $name) -> Self {
                Json::String(value.0.to_string())
            }
        }
    };
}

string_parameter!(ClientId(String) = "client_id");
string_parameter!(Scope(String) = "scope");
string_parameter!(State(String) = "state");
string_parameter!(Nonce(String) = "nonce");
string_parameter!(
    /// `redirect_uri` field in the Authorization Request.
    RedirectUri(Url) = "redirect_uri"
);
string_parameter!(
    /// `presentation_definition_uri` field in the Authorization Request.
    PresentationDefinitionUri(Url) = "presentation_definition_uri"
);
string_parameter!(
    /// `client_metadata_uri` field in the Authorization Request.
    ClientMetadataUri(Url) = "client_metadata_uri"
);
string_parameter!(
    /// `request_uri` field of an Authorization Request continuing a pushed authorization.
    RequestUri(String) = "request_uri"
);

const CODE: &str = "code";
const ID_TOKEN: &str = "id_token";
const VP_TOKEN: &str = "vp_token";
const VP_TOKEN_ID_TOKEN: &str = "vp_token id_token";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(into = "String", from = "String")]
pub enum ResponseType {
    Code,
    IdToken,
    VpToken,
    VpTokenIdToken,
    Unsupported(String),
}

impl From<ResponseType> for String {
    fn from(rt: ResponseType) -> Self {
        match rt {
            ResponseType::Code => CODE.into(),
            ResponseType::IdToken => ID_TOKEN.into(),
            ResponseType::VpToken => VP_TOKEN.into(),
            ResponseType::VpTokenIdToken => VP_TOKEN_ID_TOKEN.into(),
            ResponseType::Unsupported(s) => s,
        }
    }
}

impl From<String> for ResponseType {
    fn from(s: String) -> Self {
        match s.as_str() {
            CODE => ResponseType::Code,
            ID_TOKEN => ResponseType::IdToken,
            VP_TOKEN => ResponseType::VpToken,
            VP_TOKEN_ID_TOKEN => ResponseType::VpTokenIdToken,
            _ => ResponseType::Unsupported(s),
        }
    }
}

impl TypedParameter for ResponseType {
    const KEY: &'static str = "response_type";
}

impl TryFrom<Json> for ResponseType {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let s: String = serde_json::from_value(value)?;
        Ok(s.into())
    }
}

impl From<ResponseType> for Json {
    fn from(rt: ResponseType) -> Self {
        Json::String(rt.into())
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseType::Code => CODE,
            ResponseType::IdToken => ID_TOKEN,
            ResponseType::VpToken => VP_TOKEN,
            ResponseType::VpTokenIdToken => VP_TOKEN_ID_TOKEN,
            ResponseType::Unsupported(u) => u,
        }
        .fmt(f)
    }
}

/// `client_metadata` field in the Authorization Request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMetadata(pub UntypedObject);

impl ClientMetadata {
    /// The `vp_formats` the client accepts, when declared.
    pub fn vp_formats(&self) -> Option<&Json> {
        self.0.get_raw("vp_formats")
    }
}

impl TypedParameter for ClientMetadata {
    const KEY: &'static str = "client_metadata";
}

impl From<ClientMetadata> for Json {
    fn from(cm: ClientMetadata) -> Self {
        cm.0.into()
    }
}

impl TryFrom<Json> for ClientMetadata {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let metadata = UntypedObject::try_from(value).map(ClientMetadata)?;
        if let Some(redirect_uris) = metadata.0.get_raw("redirect_uris") {
            serde_json::from_value::<Vec<Url>>(redirect_uris.clone())?;
        }
        if let Some(vp_formats) = metadata.vp_formats() {
            if !vp_formats.is_object() {
                anyhow::bail!("'vp_formats' must be an object")
            }
        }
        Ok(metadata)
    }
}

/// `presentation_definition` field in the Authorization Request, kept together with the JSON it
/// was parsed from.
#[derive(Debug, Clone)]
pub struct PresentationDefinition {
    raw: Json,
    parsed: PresentationDefinitionParsed,
}

impl PresentationDefinition {
    pub fn into_parsed(self) -> PresentationDefinitionParsed {
        self.parsed
    }

    pub fn parsed(&self) -> &PresentationDefinitionParsed {
        &self.parsed
    }
}

impl PartialEq for PresentationDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl TryFrom<PresentationDefinitionParsed> for PresentationDefinition {
    type Error = Error;

    fn try_from(parsed: PresentationDefinitionParsed) -> Result<Self, Self::Error> {
        let raw = serde_json::to_value(parsed.clone())?;
        Ok(Self { raw, parsed })
    }
}

impl TypedParameter for PresentationDefinition {
    const KEY: &'static str = "presentation_definition";
}

impl TryFrom<Json> for PresentationDefinition {
    type Error = Error;

    fn try_from(raw: Json) -> Result<Self, Self::Error> {
        let parsed = serde_json::from_value(raw.clone())?;
        Ok(Self { raw, parsed })
    }
}

impl From<PresentationDefinition> for Json {
    fn from(value: PresentationDefinition) -> Self {
        value.raw
    }
}
