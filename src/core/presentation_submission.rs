use serde::{Deserialize, Serialize};

use super::presentation_definition::PresentationDefinition;

/// Presentation Submissions express how the inputs presented as proofs to a Verifier are
/// provided in accordance with the requirements specified in a [PresentationDefinition].
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    id: String,
    definition_id: String,
    descriptor_map: Vec<DescriptorMap>,
}

impl PresentationSubmission {
    /// Build a submission answering `definition`.
    ///
    /// Every entry of `descriptor_map` must refer to an input descriptor of the definition, and
    /// every input descriptor with required constraints must be answered.
    pub fn new(
        definition: &PresentationDefinition,
        descriptor_map: Vec<DescriptorMap>,
    ) -> Result<Self, SubmissionError> {
        if let Some(undefined) = descriptor_map
            .iter()
            .find(|entry| definition.input_descriptor(&entry.id).is_none())
        {
            return Err(SubmissionError::UndefinedInputDescriptor(
                undefined.id.clone(),
            ));
        }

        if let Some(missing) = definition.input_descriptors().iter().find(|descriptor| {
            descriptor.constraints().is_required()
                && !descriptor_map.iter().any(|entry| entry.id == descriptor.id())
        }) {
            return Err(SubmissionError::MissingInputDescriptor(
                missing.id().to_owned(),
            ));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            definition_id: definition.id().clone(),
            descriptor_map,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The id of the [PresentationDefinition] this submission answers.
    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }

    pub fn descriptor_map(&self) -> &[DescriptorMap] {
        &self.descriptor_map
    }
}

/// Maps an input descriptor to the location of the matching credential in the presentation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    id: String,
    format: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_nested: Option<Box<DescriptorMap>>,
}

impl DescriptorMap {
    pub fn new(id: impl Into<String>, format: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path: path.into(),
            path_nested: None,
        }
    }

    pub fn set_path_nested(mut self, path_nested: DescriptorMap) -> Self {
        self.path_nested = Some(Box::new(path_nested));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_nested(&self) -> Option<&DescriptorMap> {
        self.path_nested.as_deref()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("undefined input descriptor: {0}")]
    UndefinedInputDescriptor(String),
    #[error("missing required input `{0}`")]
    MissingInputDescriptor(String),
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::core::presentation_definition::{Constraints, ConstraintsField, InputDescriptor};

    fn definition() -> PresentationDefinition {
        PresentationDefinition::new(
            "pd".into(),
            InputDescriptor::new(
                "id_card".into(),
                Constraints::new().add_constraint(ConstraintsField::new("$.type")),
            ),
        )
        .add_input_descriptor(InputDescriptor::new("optional".into(), Constraints::new()))
    }

    #[test]
    fn submission_answers_definition() {
        let submission = PresentationSubmission::new(
            &definition(),
            vec![DescriptorMap::new("id_card", "jwt_vp", "$")
                .set_path_nested(DescriptorMap::new(
                    "id_card",
                    "jwt_vc",
                    "$.verifiableCredential[0]",
                ))],
        )
        .unwrap();

        assert_eq!(submission.definition_id(), "pd");
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            value["descriptor_map"][0]["path_nested"],
            json!({ "id": "id_card", "format": "jwt_vc", "path": "$.verifiableCredential[0]" })
        );
    }

    #[test]
    fn undefined_descriptor_is_rejected() {
        let err = PresentationSubmission::new(
            &definition(),
            vec![
                DescriptorMap::new("id_card", "jwt_vp", "$"),
                DescriptorMap::new("passport", "jwt_vp", "$"),
            ],
        )
        .unwrap_err();
        assert_eq!(err, SubmissionError::UndefinedInputDescriptor("passport".into()));
    }

    #[test]
    fn required_descriptor_must_be_answered() {
        let err = PresentationSubmission::new(&definition(), vec![]).unwrap_err();
        assert_eq!(err, SubmissionError::MissingInputDescriptor("id_card".into()));
    }
}
