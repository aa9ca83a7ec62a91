use chrono::Utc;
use openid4vc::{
    core::{
        authorization_request::{
            parameters::{ResponseType, State},
            AuthorizationRequest,
        },
        credential_offer::{resolve_credential_offer, CredentialOffer, CredentialOfferRequest},
        error::{
            AuthorizationErrorCode, CredentialOfferErrorCode, Error, TokenError, TokenErrorCode,
        },
        response::{
            credential::{BatchCredentialResponse, CredentialResponse},
            AuthorizationResponse,
        },
        token_request::{GrantType, TokenRequest},
    },
    provider::{
        session::{AuthorizationSession, Session, SessionStore},
        signer::TokenTarget,
        REQUEST_URI_PREFIX,
    },
};
use serde_json::json;

mod support;

use support::{code_provider, config, StaticResolver, ISSUER};

fn session(id: &str, expires_in: i64) -> Session {
    Session {
        id: id.into(),
        authorization_request: AuthorizationRequest::new(ResponseType::Code, "client-1"),
        expiration_timestamp: Utc::now().timestamp() + expires_in,
    }
}

fn token_error(err: Error) -> TokenError {
    match err {
        Error::Token(err) => err,
        other => panic!("expected a token error, got: {other}"),
    }
}

#[tokio::test]
async fn pre_authorized_code_is_exchanged_for_access_token() {
    let (provider, store) = code_provider(config());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();

    let code = provider.generate_pre_authorized_code_for(&s1).await.unwrap();
    let response = provider
        .process_token_request(&TokenRequest::pre_authorized_code(code))
        .await
        .unwrap();

    assert!(response.is_success());
    let access_token = response.access_token().unwrap().to_owned();
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "access_token": access_token, "token_type": "bearer" })
    );

    let claims = provider
        .verify_and_parse_token(&access_token, TokenTarget::Access)
        .await
        .unwrap();
    assert_eq!(claims["sub"], "S1");
    assert_eq!(claims["iss"], ISSUER);
    assert!(provider.validate_access_token(&access_token).await);
}

#[tokio::test]
async fn short_pre_authorized_grant_type_is_accepted() {
    let (provider, store) = code_provider(config());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();
    let code = provider.generate_pre_authorized_code_for(&s1).await.unwrap();

    let request = TokenRequest::from_form(&format!(
        "grant_type=pre_authorized_code&pre-authorized_code={code}"
    ))
    .unwrap();
    assert_eq!(request.grant_type, GrantType::PreAuthorizedCode);
    assert!(provider.process_token_request(&request).await.is_ok());
}

#[tokio::test]
async fn unsupported_grant_type() {
    let (provider, _) = code_provider(config());

    let mut request = TokenRequest::new(GrantType::Other("refresh_token".into()));
    request.code = Some("tGzv3JOkF0XG5Qx2TlKWIA".into());

    let err = token_error(provider.process_token_request(&request).await.unwrap_err());
    assert_eq!(err.code, TokenErrorCode::UnsupportedGrantType);
    assert_eq!(
        serde_json::to_value(err.to_response()).unwrap(),
        json!({
            "error": "unsupported_grant_type",
            "error_description": "Grant type not supported"
        })
    );
}

#[tokio::test]
async fn missing_codes_are_invalid_grants() {
    let (provider, _) = code_provider(config());

    let err = token_error(
        provider
            .process_token_request(&TokenRequest::new(GrantType::AuthorizationCode))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, TokenErrorCode::InvalidGrant);
    assert_eq!(
        err.message.as_deref(),
        Some("No code parameter found on token request")
    );

    let err = token_error(
        provider
            .process_token_request(&TokenRequest::new(GrantType::PreAuthorizedCode))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, TokenErrorCode::InvalidGrant);
    assert_eq!(
        err.message.as_deref(),
        Some("No pre-authorized_code parameter found on token request")
    );
}

#[tokio::test]
async fn codes_from_other_issuers_or_purposes_are_rejected() {
    let (provider, store) = code_provider(config());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();

    // Signed by this provider, but issued as an access token.
    let access_token = provider
        .generate_token("S1", TokenTarget::Access, None)
        .await
        .unwrap();
    let err = token_error(
        provider
            .process_token_request(&TokenRequest::authorization_code(access_token))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, TokenErrorCode::InvalidGrant);
    assert_eq!(
        err.message.as_deref(),
        Some("Authorization code could not be verified")
    );

    // Signed by another key.
    let (other, _) = code_provider(config());
    let foreign = other.generate_authorization_code_for(&s1).await.unwrap();
    let err = token_error(
        provider
            .process_token_request(&TokenRequest::authorization_code(foreign))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, TokenErrorCode::InvalidGrant);
}

#[tokio::test]
async fn expired_sessions_are_evicted() {
    let (provider, store) = code_provider(config());
    let expired = session("S1", -1);
    assert!(expired.is_expired());
    store.put("S1", expired.clone()).await.unwrap();

    let code = provider.generate_authorization_code_for(&expired).await.unwrap();
    let err = token_error(
        provider
            .process_token_request(&TokenRequest::authorization_code(code))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, TokenErrorCode::InvalidRequest);
    assert_eq!(
        err.message.as_deref(),
        Some("No authorization session found for given authorization code, or session expired.")
    );
    assert!(store.get("S1").await.unwrap().is_none());
}

#[tokio::test]
async fn codes_are_single_use() {
    let (provider, store) = code_provider(config());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();
    let request = TokenRequest::pre_authorized_code(
        provider.generate_pre_authorized_code_for(&s1).await.unwrap(),
    );

    provider.process_token_request(&request).await.unwrap();
    let err = token_error(provider.process_token_request(&request).await.unwrap_err());
    assert_eq!(err.code, TokenErrorCode::InvalidRequest);
}

#[tokio::test]
async fn reusable_codes_until_expiry() {
    let (provider, store) = code_provider(config().with_reusable_codes());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();
    let request = TokenRequest::pre_authorized_code(
        provider.generate_pre_authorized_code_for(&s1).await.unwrap(),
    );

    provider.process_token_request(&request).await.unwrap();
    provider.process_token_request(&request).await.unwrap();
    assert!(store.get("S1").await.unwrap().is_some());
}

#[tokio::test]
async fn authorization_code_flow() {
    let (provider, _) = code_provider(config());
    let request = AuthorizationRequest::from_query_params(
        "response_type=code&client_id=s6BhdRkqt3&state=xyz&redirect_uri=https%3A%2F%2Fclient.example.org%2Fcb",
    )
    .unwrap();

    let session = provider.initialize_authorization(request, 600).await.unwrap();
    let response = provider.continue_authorization(&session).await.unwrap();
    let AuthorizationResponse::Success(success) = response else {
        panic!("expected a successful authorization response")
    };
    assert_eq!(success.state.as_deref(), Some("xyz"));

    let mut token_request = TokenRequest::authorization_code(success.code);
    token_request.redirect_uri = Some("https://client.example.org/cb".into());
    let response = provider.process_token_request(&token_request).await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn pushed_authorization_round_trip() {
    let (provider, _) = code_provider(config());
    let request = AuthorizationRequest::new(ResponseType::Code, "client-1")
        .with(State("af0ifjsldkj".into()));
    let session = provider.initialize_authorization(request, 90).await.unwrap();

    let response = provider.pushed_authorization_success(&session);
    assert!(response.is_success());
    let request_uri = response.request_uri().unwrap().to_owned();
    assert_eq!(request_uri, format!("{REQUEST_URI_PREFIX}{}", session.id));
    let json = serde_json::to_value(&response).unwrap();
    let expires_in = json["expires_in"].as_i64().unwrap();
    assert!((89..=90).contains(&expires_in));

    let resolved = provider
        .resolve_pushed_authorization_session(&AuthorizationRequest::pushed(
            "client-1",
            request_uri,
        ))
        .await
        .unwrap();
    assert_eq!(resolved, session);
}

#[tokio::test]
async fn pushed_authorization_failures() {
    let (provider, store) = code_provider(config());

    let missing =
        AuthorizationRequest::pushed("client-1", format!("{REQUEST_URI_PREFIX}missing-id"));
    let Error::Authorization(err) = provider
        .resolve_pushed_authorization_session(&missing)
        .await
        .unwrap_err()
    else {
        panic!("expected an authorization error")
    };
    assert_eq!(err.code, AuthorizationErrorCode::InvalidRequest);
    assert_eq!(
        err.message.as_deref(),
        Some("No session found for given request URI, or session expired")
    );
    assert_eq!(
        serde_json::to_value(err.to_pushed_authorization_response()).unwrap(),
        json!({
            "error": "invalid_request",
            "error_description": "No session found for given request URI, or session expired"
        })
    );

    let not_pushed = AuthorizationRequest::new(ResponseType::Code, "client-1");
    let Error::Authorization(err) = provider
        .resolve_pushed_authorization_session(&not_pushed)
        .await
        .unwrap_err()
    else {
        panic!("expected an authorization error")
    };
    assert_eq!(
        err.message.as_deref(),
        Some("Authorization request does not refer to a pushed authorization session")
    );

    store.put("S1", session("S1", -10)).await.unwrap();
    let expired = AuthorizationRequest::pushed("client-1", format!("{REQUEST_URI_PREFIX}S1"));
    assert!(provider
        .resolve_pushed_authorization_session(&expired)
        .await
        .is_err());
    assert!(store.get("S1").await.unwrap().is_none());
}

#[tokio::test]
async fn credential_offer_by_reference() {
    let (provider, store) = code_provider(config());
    let s1 = session("S1", 300);
    store.put("S1", s1.clone()).await.unwrap();

    let offer = provider
        .credential_offer_for(&s1, vec![json!("UniversityDegree_JWT")], false)
        .await
        .unwrap();
    assert_eq!(offer.credential_issuer, ISSUER);

    let offer_uri = "https://issuer.example.com/credential-offer/S1";
    let resolver =
        StaticResolver::default().with(offer_uri, serde_json::to_value(&offer).unwrap());
    let request = CredentialOfferRequest::by_reference(offer_uri.parse().unwrap());
    let resolved = resolve_credential_offer(&request, &resolver).await.unwrap();
    assert_eq!(resolved, offer);

    let code = resolved
        .grants
        .pre_authorized_code
        .unwrap()
        .pre_authorized_code;
    let response = provider
        .process_token_request(&TokenRequest::pre_authorized_code(code))
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn credential_offer_failures() {
    let garbled_uri = "https://issuer.example.com/offers/garbled";
    let resolver = StaticResolver::default().with(garbled_uri, json!({ "credentials": 1 }));

    let unreachable = CredentialOfferRequest::by_reference(
        "https://issuer.example.com/offers/gone".parse().unwrap(),
    );
    let err = resolve_credential_offer(&unreachable, &resolver).await.unwrap_err();
    assert_eq!(err.code, CredentialOfferErrorCode::InvalidRequest);
    assert!(err.offer.is_none());

    let garbled = CredentialOfferRequest::by_reference(garbled_uri.parse().unwrap());
    let err = resolve_credential_offer(&garbled, &resolver).await.unwrap_err();
    assert_eq!(err.code, CredentialOfferErrorCode::InvalidRequest);

    let anonymous =
        CredentialOfferRequest::by_value(CredentialOffer::new("", vec![json!("PID")]));
    let err = resolve_credential_offer(&anonymous, &resolver).await.unwrap_err();
    assert_eq!(err.code, CredentialOfferErrorCode::InvalidIssuer);
    assert!(err.offer.is_some());
    assert_eq!(
        serde_json::to_value(err.to_response()).unwrap()["error"],
        "invalid_issuer"
    );
}

#[test]
fn batch_responses_are_success_or_error() {
    let r1 = CredentialResponse::success(
        "jwt_vc_json",
        json!("eyJhbGciOiJFUzI1NiJ9.eyJ2YyI6MX0.c2ln"),
    );
    let r2 = CredentialResponse::deferred(None, "8xLOxBtZp8");

    let success = BatchCredentialResponse::success(vec![r1.clone(), r2.clone()]);
    assert!(success.is_success());
    assert_eq!(success.credential_responses(), Some(&[r1, r2][..]));

    let error: BatchCredentialResponse =
        support::decode(json!({ "error": "invalid_request", "c_nonce": "fGFF7UkhLa" }));
    assert!(!error.is_success());
    assert!(error.credential_responses().is_none());
}
