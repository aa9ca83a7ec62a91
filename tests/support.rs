#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use openid4vc::{
    config::{BaseUrl, ProviderConfig},
    core::{
        authorization_request::AuthorizationRequest,
        presentation_submission::{DescriptorMap, PresentationSubmission},
        token_request::TokenRequest,
        util::JsonResolver,
    },
    provider::{
        session::{MemoryStore, Session},
        signer::P256Signer,
        AuthorizationCodeFlow, OpenIdProvider,
    },
    siop::{
        DidResolver, PresentationExchange, PresentationGenerator, PresentationResult,
        SiopProvider, SiopSession,
    },
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as Json};
use url::Url;

pub const ISSUER: &str = "https://issuer.example.com";
pub const HOLDER_DID: &str = "did:key:zDnaerx9CtbPJ1q36T5Ln5wYt3MQYeGRG5ehnPAmxcf5mDZpv";
pub const HOLDER_KEY_ID: &str = "did:key:zDnaerx9CtbPJ1q36T5Ln5wYt3MQYeGRG5ehnPAmxcf5mDZpv#zDnaerx9CtbPJ1q36T5Ln5wYt3MQYeGRG5ehnPAmxcf5mDZpv";
pub const PD_URI: &str = "https://verifier.example.com/presentation-definitions/postal-code";
pub const CLIENT_METADATA_URI: &str = "https://verifier.example.com/client-metadata";

pub fn config() -> ProviderConfig {
    ProviderConfig::new(BaseUrl::try_from(ISSUER).unwrap(), ISSUER)
}

pub fn code_provider(
    config: ProviderConfig,
) -> (
    OpenIdProvider<Session, AuthorizationCodeFlow>,
    Arc<MemoryStore<Session>>,
) {
    let store = Arc::new(MemoryStore::new());
    let provider = OpenIdProvider::<Session, AuthorizationCodeFlow>::builder()
        .with_config(config)
        .with_flow(AuthorizationCodeFlow)
        .with_session_store(store.clone())
        .with_signer(Arc::new(P256Signer::random()))
        .build()
        .unwrap();
    (provider, store)
}

pub fn siop_provider(
    resolver: StaticResolver,
    generator: Option<Arc<dyn PresentationGenerator + Send + Sync>>,
) -> (SiopProvider, Arc<MemoryStore<SiopSession>>) {
    let flow = PresentationExchange::new(Arc::new(resolver), Arc::new(StaticDidResolver));
    let flow = match generator {
        Some(generator) => flow.with_presentation_generator(generator),
        None => flow,
    };
    let store = Arc::new(MemoryStore::new());
    let provider = SiopProvider::builder()
        .with_config(config())
        .with_flow(flow)
        .with_session_store(store.clone())
        .with_signer(Arc::new(P256Signer::random().with_key_id(HOLDER_KEY_ID)))
        .build()
        .unwrap();
    (provider, store)
}

/// Decode a fixture, reporting the path of the offending field on failure.
pub fn decode<T: DeserializeOwned>(json: Json) -> T {
    serde_path_to_error::deserialize(json).unwrap()
}

pub fn authorization_request(json: Json) -> AuthorizationRequest {
    decode(json)
}

pub fn presentation_definition() -> Json {
    json!({
        "id": "0b4dd017-efa6-4a05-a269-9790fa3c22c2",
        "input_descriptors": [
            {
                "id": "064255e8-a0fa-4e0b-a4f2-8ee6d8a8ac8b",
                "constraints": {
                    "fields": [
                        {
                            "path": ["$.vp.verifiableCredential[0].credentialSubject.postalCode"],
                            "name": "Check Postal Code",
                            "purpose": "Check whether you live within our school district."
                        }
                    ]
                },
                "name": "School District Proof",
                "purpose": "We need to know if you live within our school district.",
                "format": {
                    "jwt_vp_json": {
                        "alg": ["ES256"]
                    }
                }
            }
        ]
    })
}

pub fn client_metadata() -> Json {
    json!({
        "redirect_uris": ["https://verifier.example.com/callback"],
        "vp_formats": {
            "jwt_vp_json": { "alg": ["ES256"] }
        }
    })
}

/// Serves fixed documents.
#[derive(Debug, Default)]
pub struct StaticResolver(HashMap<String, Json>);

impl StaticResolver {
    pub fn with(mut self, url: &str, json: Json) -> Self {
        self.0.insert(url.to_owned(), json);
        self
    }
}

#[async_trait]
impl JsonResolver for StaticResolver {
    async fn resolve(&self, url: &Url) -> Option<Json> {
        self.0.get(url.as_str()).cloned()
    }
}

/// Knows a single DID.
#[derive(Debug)]
pub struct StaticDidResolver;

#[async_trait]
impl DidResolver for StaticDidResolver {
    async fn resolve(&self, did: &str) -> Result<String> {
        if did != HOLDER_DID {
            bail!("unknown DID: {did}")
        }
        Ok(HOLDER_KEY_ID.to_owned())
    }
}

/// Answers every input descriptor with one presentation bound to the session nonce.
#[derive(Debug)]
pub struct NoncePresentations;

#[async_trait]
impl PresentationGenerator for NoncePresentations {
    async fn generate_presentation(
        &self,
        session: &SiopSession,
        _request: &TokenRequest,
    ) -> Result<PresentationResult> {
        let definition = session
            .presentation_definition
            .as_ref()
            .context("session has no presentation definition")?;
        let descriptor_map = definition
            .input_descriptors()
            .iter()
            .map(|descriptor| DescriptorMap::new(descriptor.id(), "jwt_vp_json", "$"))
            .collect();
        Ok(PresentationResult {
            presentations: vec![json!({
                "holder": HOLDER_DID,
                "nonce": session.nonce,
            })],
            presentation_submission: PresentationSubmission::new(definition, descriptor_map)?,
        })
    }
}

/// Fails the first presentation it is asked for, then defers to [NoncePresentations].
#[derive(Debug, Default)]
pub struct FailsOnce(AtomicBool);

#[async_trait]
impl PresentationGenerator for FailsOnce {
    async fn generate_presentation(
        &self,
        session: &SiopSession,
        request: &TokenRequest,
    ) -> Result<PresentationResult> {
        if !self.0.swap(true, Ordering::SeqCst) {
            bail!("wallet unavailable")
        }
        NoncePresentations.generate_presentation(session, request).await
    }
}
