use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

const JWT_PROOF_TYPE: &str = "jwt";

/// A Credential Request, as sent to the credential endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofOfPossession>,
    #[serde(flatten)]
    pub custom_parameters: Map<String, Json>,
}

impl CredentialRequest {
    pub fn new(format: impl Into<String>, types: Vec<String>) -> Self {
        Self {
            format: format.into(),
            types: Some(types),
            proof: None,
            custom_parameters: Map::new(),
        }
    }

    pub fn with_proof(mut self, proof: ProofOfPossession) -> Self {
        self.proof = Some(proof);
        self
    }
}

/// A Batch Credential Request, requesting several credentials at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCredentialRequest {
    pub credential_requests: Vec<CredentialRequest>,
}

/// Proof that the holder controls the key the credential will be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfPossession {
    pub proof_type: String,
    pub jwt: String,
}

impl ProofOfPossession {
    pub fn jwt(jwt: impl Into<String>) -> Self {
        Self {
            proof_type: JWT_PROOF_TYPE.into(),
            jwt: jwt.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn credential_request_with_proof() {
        let request = CredentialRequest::new(
            "jwt_vc_json",
            vec!["VerifiableCredential".into(), "UniversityDegreeCredential".into()],
        )
        .with_proof(ProofOfPossession::jwt("eyJ0eXAiOiJvcGVuaWQ0dmNpLXByb29mK2p3dCJ9"));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "format": "jwt_vc_json",
                "types": ["VerifiableCredential", "UniversityDegreeCredential"],
                "proof": {
                    "proof_type": "jwt",
                    "jwt": "eyJ0eXAiOiJvcGVuaWQ0dmNpLXByb29mK2p3dCJ9"
                }
            })
        );
    }
}
