use std::fmt::{self, Debug};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::prelude::*;
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use serde_json::{Map, Value as Json};

/// The purpose a signed token is issued for.
///
/// Placed in the `aud` claim, so that a token issued for one purpose is never accepted for
/// another even though the same key signs them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTarget {
    /// Authorization codes and pre-authorized codes.
    Token,
    /// Access tokens.
    Access,
    ProofOfPossession,
}

impl TokenTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenTarget::Token => "TOKEN",
            TokenTarget::Access => "ACCESS",
            TokenTarget::ProofOfPossession => "PROOF_OF_POSSESSION",
        }
    }
}

impl fmt::Display for TokenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces and checks the signed tokens a provider issues.
///
/// Implementations may be backed by remote key material; callers should bound the time they
/// wait on them.
#[async_trait]
pub trait TokenSigner: Debug {
    /// Sign `payload` as a compact JWS.
    ///
    /// Entries of `header` are added to the protected header. `key_id`, when given, selects the
    /// signing key and is advertised as `kid`; signing fails if no such key is held.
    async fn sign(
        &self,
        target: TokenTarget,
        payload: &Map<String, Json>,
        header: Option<&Map<String, Json>>,
        key_id: Option<&str>,
    ) -> Result<String>;

    /// Whether the token's signature is valid. Claims are not checked.
    async fn verify(&self, target: TokenTarget, token: &str) -> bool;

    /// Read the payload of a compact JWS without verifying it.
    fn parse_payload(&self, token: &str) -> Result<Map<String, Json>> {
        decode_payload(token)
    }
}

pub fn decode_payload(token: &str) -> Result<Map<String, Json>> {
    let payload = token.split('.').nth(1).context("token is not a compact JWS")?;
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .context("token payload is not base64url encoded")?;
    serde_json::from_slice(&bytes).context("token payload is not a JSON object")
}

/// Signs ES256 tokens with a single P-256 key.
#[derive(Debug, Clone)]
pub struct P256Signer {
    key: SigningKey,
    verifying_key: VerifyingKey,
    key_id: Option<String>,
}

impl P256Signer {
    pub fn new(key: SigningKey) -> Self {
        let verifying_key = *key.verifying_key();
        Self {
            key,
            verifying_key,
            key_id: None,
        }
    }

    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Only sign when asked for this key, and advertise it as `kid` by default.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// The public key as a JWK.
    pub fn jwk(&self) -> Result<Json> {
        let pk: p256::PublicKey = self.verifying_key.into();
        Ok(serde_json::from_str(&pk.to_jwk_string())?)
    }
}

#[async_trait]
impl TokenSigner for P256Signer {
    async fn sign(
        &self,
        _target: TokenTarget,
        payload: &Map<String, Json>,
        header: Option<&Map<String, Json>>,
        key_id: Option<&str>,
    ) -> Result<String> {
        let kid = match (key_id, self.key_id.as_deref()) {
            (Some(requested), own) if own != Some(requested) => {
                bail!("signer does not hold key '{requested}'")
            }
            (_, own) => own,
        };

        let mut protected = Map::new();
        if let Some(header) = header {
            protected.extend(header.clone());
        }
        protected.insert("alg".into(), "ES256".into());
        protected.entry("typ").or_insert_with(|| "JWT".into());
        if let Some(kid) = kid {
            protected.insert("kid".into(), kid.into());
        }

        let header_b64 = serde_json::to_vec(&protected).map(|b| BASE64_URL_SAFE_NO_PAD.encode(b))?;
        let body_b64 = serde_json::to_vec(payload).map(|b| BASE64_URL_SAFE_NO_PAD.encode(b))?;
        let signing_input = [header_b64.as_bytes(), b".", body_b64.as_bytes()].concat();
        let signature: Signature = self.key.sign(&signing_input);
        let signature_b64 = BASE64_URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{header_b64}.{body_b64}.{signature_b64}"))
    }

    async fn verify(&self, _target: TokenTarget, token: &str) -> bool {
        let Some((signing_input, signature_b64)) = token.rsplit_once('.') else {
            return false;
        };
        let Ok(signature) = BASE64_URL_SAFE_NO_PAD.decode(signature_b64) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&signature) else {
            return false;
        };
        self.verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .is_ok()
    }
}
