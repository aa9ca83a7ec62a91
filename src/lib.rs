//! This library provides the protocol core of an [OpenID for Verifiable Credentials] provider:
//! the authorization and token state machine shared by [OID4VCI] issuers and [OID4VP]
//! verifiers, the credential issuance response model, and the Self-Issued OpenID Provider
//! presentation exchange flow.
//!
//! [OpenID for Verifiable Credentials]: <https://openid.net/sg/openid4vc/>
//! [OID4VCI]: <https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html>
//! [OID4VP]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//!
//! # Provider Usage
//!
//! A provider is built from a [`ProviderConfig`], an [`AuthorizationFlow`] deciding which
//! authorization requests are accepted, a [`SessionStore`] and a [`TokenSigner`]:
//!
//! ```ignore
//! use openid4vc::config::{BaseUrl, ProviderConfig};
//! use openid4vc::provider::{AuthorizationCodeFlow, OpenIdProvider};
//! use openid4vc::provider::session::MemoryStore;
//! use openid4vc::provider::signer::P256Signer;
//!
//! let base_url = BaseUrl::try_from("https://issuer.example.com")?;
//! let provider = OpenIdProvider::builder()
//!     .with_config(ProviderConfig::new(base_url, "https://issuer.example.com"))
//!     .with_flow(AuthorizationCodeFlow)
//!     .with_session_store(Arc::new(MemoryStore::new()))
//!     .with_signer(Arc::new(P256Signer::random()))
//!     .build()?;
//!
//! // Authorization endpoint.
//! let session = provider.initialize_authorization(request, 300).await?;
//! let response = provider.continue_authorization(&session).await?;
//!
//! // Token endpoint.
//! let token_response = match provider.process_token_request(&token_request).await {
//!     Ok(response) => response,
//!     Err(Error::Token(e)) => e.to_response(),
//!     Err(e) => return Err(e.into()),
//! };
//! ```
//!
//! Protocol failures are returned as [`Error`] values carrying the rejected request, an error
//! code and a description. Each converts into the error response the protocol puts on the wire,
//! leaving the choice of transport to the caller.
//!
//! # Pushed Authorization Requests
//!
//! A session opened for a pushed request is referred to by
//! `urn:ietf:params:oauth:request_uri:<session id>`, see
//! [`OpenIdProvider::pushed_authorization_success`]. The follow-up authorization request is
//! matched back to its session with
//! [`OpenIdProvider::resolve_pushed_authorization_session`].
//!
//! # Credential Offers
//!
//! Issuers hand out pre-authorized codes through a [`CredentialOffer`], see
//! [`OpenIdProvider::credential_offer_for`]. Wallets receive them with
//! [`resolve_credential_offer`].
//!
//! # Presentation Exchange
//!
//! A [`SiopProvider`] accepts `vp_token` requests carrying a DIF Presentation Definition, by
//! value or by reference. References are resolved through a [`JsonResolver`]; token requests
//! are answered with the presentations a [`PresentationGenerator`] builds.
//!
//! [`ProviderConfig`]: crate::config::ProviderConfig
//! [`AuthorizationFlow`]: crate::provider::AuthorizationFlow
//! [`SessionStore`]: crate::provider::session::SessionStore
//! [`TokenSigner`]: crate::provider::signer::TokenSigner
//! [`Error`]: crate::core::error::Error
//! [`OpenIdProvider::pushed_authorization_success`]: crate::provider::OpenIdProvider::pushed_authorization_success
//! [`OpenIdProvider::resolve_pushed_authorization_session`]: crate::provider::OpenIdProvider::resolve_pushed_authorization_session
//! [`OpenIdProvider::credential_offer_for`]: crate::provider::OpenIdProvider::credential_offer_for
//! [`CredentialOffer`]: crate::core::credential_offer::CredentialOffer
//! [`resolve_credential_offer`]: crate::core::credential_offer::resolve_credential_offer
//! [`SiopProvider`]: crate::siop::SiopProvider
//! [`JsonResolver`]: crate::core::util::JsonResolver
//! [`PresentationGenerator`]: crate::siop::PresentationGenerator

pub mod config;
pub mod core;
pub mod provider;
pub mod siop;
