use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Claim format designations (e.g. `jwt_vc_json`, `ldp_vp`) mapped to their format-specific
/// algorithm or proof type requirements.
pub type ClaimFormatMap = BTreeMap<String, Json>;

/// A presentation definition is a JSON object that describes the information a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier)
/// requires of a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// Presentation Definitions are composed of inputs, which describe the forms and details of the
/// proofs they require, and optional sets of selection rules, to allow Holders flexibility
/// in cases where different types of proofs may satisfy an input requirement.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition)
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
pub struct PresentationDefinition {
    id: String,
    input_descriptors: Vec<InputDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission_requirements: Option<Vec<Json>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<ClaimFormatMap>,
}

impl PresentationDefinition {
    /// The Presentation Definition MUST contain an id property, and an input_descriptors
    /// property whose value is an array of [InputDescriptor]s.
    pub fn new(id: String, input_descriptor: InputDescriptor) -> Self {
        Self {
            id,
            input_descriptors: vec![input_descriptor],
            ..Default::default()
        }
    }

    pub fn id(&self) -> &String {
        &self.id
    }

    /// Add a new input descriptor to the presentation definition.
    pub fn add_input_descriptor(mut self, input_descriptor: InputDescriptor) -> Self {
        self.input_descriptors.push(input_descriptor);
        self
    }

    pub fn input_descriptors(&self) -> &Vec<InputDescriptor> {
        &self.input_descriptors
    }

    /// Look up an input descriptor by its id.
    pub fn input_descriptor(&self, id: &str) -> Option<&InputDescriptor> {
        self.input_descriptors
            .iter()
            .find(|descriptor| descriptor.id == id)
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// Attach a format to the presentation definition.
    ///
    /// If present, the value MUST be an object with one or more properties matching the
    /// registered Claim Format Designations (e.g., jwt, jwt_vc, jwt_vp, etc.).
    pub fn add_format(mut self, designation: impl Into<String>, value: Json) -> Self {
        self.format
            .get_or_insert_with(BTreeMap::new)
            .insert(designation.into(), value);
        self
    }

    pub fn format(&self) -> Option<&ClaimFormatMap> {
        self.format.as_ref()
    }

    pub fn submission_requirements(&self) -> Option<&Vec<Json>> {
        self.submission_requirements.as_ref()
    }

    /// Every claim format designation named by the definition or any of its input descriptors.
    pub fn format_designations(&self) -> impl Iterator<Item = &str> {
        self.format
            .iter()
            .chain(
                self.input_descriptors
                    .iter()
                    .filter_map(|descriptor| descriptor.format.as_ref()),
            )
            .flat_map(|map| map.keys().map(String::as_str))
    }
}

/// Input Descriptors describe the information a Verifier requires of a Holder.
///
/// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
pub struct InputDescriptor {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<ClaimFormatMap>,
    #[serde(default)]
    constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<Vec<String>>,
}

impl InputDescriptor {
    pub fn new(id: String, constraints: Constraints) -> Self {
        Self {
            id,
            constraints,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    pub fn add_format(mut self, designation: impl Into<String>, value: Json) -> Self {
        self.format
            .get_or_insert_with(BTreeMap::new)
            .insert(designation.into(), value);
        self
    }

    pub fn format(&self) -> Option<&ClaimFormatMap> {
        self.format.as_ref()
    }

    pub fn group(&self) -> Option<&Vec<String>> {
        self.group.as_ref()
    }
}

/// Constraints are objects that describe the properties the presented credentials must satisfy.
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<ConstraintsField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_disclosure: Option<ConstraintsLimitDisclosure>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constraint(mut self, field: ConstraintsField) -> Self {
        self.fields.get_or_insert_with(Vec::new).push(field);
        self
    }

    pub fn fields(&self) -> Option<&Vec<ConstraintsField>> {
        self.fields.as_ref()
    }

    pub fn set_limit_disclosure(mut self, limit_disclosure: ConstraintsLimitDisclosure) -> Self {
        self.limit_disclosure = Some(limit_disclosure);
        self
    }

    pub fn limit_disclosure(&self) -> Option<&ConstraintsLimitDisclosure> {
        self.limit_disclosure.as_ref()
    }

    /// Whether the Holder must satisfy at least one field of these constraints.
    pub fn is_required(&self) -> bool {
        self.fields
            .as_ref()
            .is_some_and(|fields| fields.iter().any(|field| field.is_required()))
    }
}

/// A single field constraint: a set of JSON paths and an optional JSON Schema filter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConstraintsField {
    path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent_to_retain: Option<bool>,
}

impl ConstraintsField {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: vec![path.into()],
            id: None,
            purpose: None,
            name: None,
            filter: None,
            optional: None,
            intent_to_retain: None,
        }
    }

    pub fn add_path(mut self, path: impl Into<String>) -> Self {
        self.path.push(path.into());
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn set_filter(mut self, filter: Json) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter(&self) -> Option<&Json> {
        self.filter.as_ref()
    }

    pub fn set_optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    pub fn is_required(&self) -> bool {
        !self.optional.unwrap_or(false)
    }

    pub fn set_retained(mut self, intent_to_retain: bool) -> Self {
        self.intent_to_retain = Some(intent_to_retain);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintsLimitDisclosure {
    Required,
    Preferred,
}
