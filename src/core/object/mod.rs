use anyhow::{Context, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// An untyped (JSON) Object from which [TypedParameters](TypedParameter) can be parsed.
///
/// Backs authorization requests, client metadata and the decoding of protocol responses.
/// A parameter explicitly set to `null` is treated the same as an absent one.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UntypedObject(pub(crate) Map<String, Json>);

/// A strongly typed parameter that can represent request parameters or metadata entries.
pub trait TypedParameter:
    TryFrom<Json, Error = anyhow::Error> + TryInto<Json> + Clone + std::fmt::Debug
{
    const KEY: &'static str;
}

impl UntypedObject {
    /// Get a [TypedParameter] from the Object.
    ///
    /// Note that this method clones the underlying data.
    pub fn get<T: TypedParameter>(&self) -> Option<Result<T>> {
        Some(self.present(T::KEY)?.clone().try_into().map_err(Into::into))
    }

    /// Remove a [TypedParameter] from the Object.
    pub fn remove<T: TypedParameter>(&mut self) -> Option<Result<T>> {
        match self.0.remove(T::KEY)? {
            Json::Null => None,
            value => Some(value.try_into().map_err(Into::into)),
        }
    }

    /// Insert a [TypedParameter].
    ///
    /// Returns the existing [TypedParameter] if one already exists.
    ///
    /// # Errors
    /// Returns an error if there was already an entry in the Object, but it could not be parsed from JSON.
    pub fn insert<T: TypedParameter>(&mut self, t: T) -> Option<Result<T>> {
        match t.try_into() {
            Err(_) => Some(Err(Error::msg("failed to serialize typed parameter"))),
            Ok(value) => match self.0.insert(T::KEY.to_owned(), value)? {
                Json::Null => None,
                previous => Some(previous.try_into().map_err(Into::into)),
            },
        }
    }

    /// Whether a non-null entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.present(key).is_some()
    }

    /// Raw access to an entry that has no [TypedParameter] representation.
    pub fn get_raw(&self, key: &str) -> Option<&Json> {
        self.present(key)
    }

    pub fn into_inner(self) -> Map<String, Json> {
        self.0
    }

    fn present(&self, key: &str) -> Option<&Json> {
        self.0.get(key).filter(|value| !value.is_null())
    }
}

impl From<Map<String, Json>> for UntypedObject {
    fn from(value: Map<String, Json>) -> Self {
        Self(value)
    }
}

impl From<UntypedObject> for Json {
    fn from(value: UntypedObject) -> Self {
        value.0.into()
    }
}

impl TryFrom<Json> for UntypedObject {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        match value {
            Json::Object(map) => Ok(Self(map)),
            other => anyhow::bail!("expected a JSON object, found: {other}"),
        }
    }
}

pub trait ParsingErrorContext {
    type T: TypedParameter;

    fn parsing_error(self) -> Result<Self::T>;
}

impl<T: TypedParameter> ParsingErrorContext for Option<Result<T>> {
    type T = T;

    fn parsing_error(self) -> Result<T> {
        self.context(format!("'{}' is missing", T::KEY))?
            .context(format!("'{}' could not be parsed", T::KEY))
    }
}

impl<T: TypedParameter> ParsingErrorContext for Result<T> {
    type T = T;

    fn parsing_error(self) -> Result<T> {
        self.context(format!("'{}' could not be parsed", T::KEY))
    }
}
