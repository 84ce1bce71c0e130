/*
[INPUT]:  Mock provider gateway responses
[OUTPUT]: Test results for the HTTP provider client
[POS]:    Integration tests - provider gateway endpoints
[UPDATE]: When gateway endpoints or status mapping change
*/

mod common;

use common::{PHONE, provider_config, setup_mock_server};
use keybridge_core::{
    CodeRequestHandle, DialogEntity, HttpProviderClient, KeybridgeError, ProviderClient,
    ProviderSession,
};
use rstest::rstest;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpProviderClient {
    let config = provider_config().with_base_url(server.uri());
    assert_ok!(HttpProviderClient::new(&config))
}

#[tokio::test]
async fn test_send_code_returns_handle() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/send-code"))
        .and(body_partial_json(serde_json::json!({
            "apiId": 12345,
            "phoneNumber": PHONE,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "phoneCodeHash": "abc123",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = assert_ok!(client(&server).send_code(PHONE).await);
    assert_eq!(handle.as_str(), "abc123");
}

#[tokio::test]
async fn test_send_code_with_refused_credentials() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/send-code"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).send_code(PHONE).await.unwrap_err();
    assert!(matches!(err, KeybridgeError::InvalidCredentialsConfigured(_)));
}

#[tokio::test]
async fn test_sign_in_returns_user_and_session() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-in"))
        .and(body_partial_json(serde_json::json!({
            "phoneCode": "12345",
            "phoneCodeHash": "abc123",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": 777, "firstName": "Ada", "username": "ada"},
            "session": "1BVtsOK-session",
        })))
        .mount(&server)
        .await;

    let outcome = assert_ok!(
        client(&server)
            .sign_in(PHONE, "12345", &CodeRequestHandle::new("abc123"))
            .await
    );
    assert_eq!(outcome.user.id, 777);
    assert_eq!(outcome.user.first_name.as_deref(), Some("Ada"));
    assert_eq!(outcome.session.expose(), "1BVtsOK-session");
}

#[rstest]
#[case(400)]
#[case(401)]
#[case(403)]
#[tokio::test]
async fn test_sign_in_rejections(#[case] status: u16) {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-in"))
        .respond_with(ResponseTemplate::new(status).set_body_string("PHONE_CODE_INVALID"))
        .mount(&server)
        .await;

    let err = client(&server)
        .sign_in(PHONE, "00000", &CodeRequestHandle::new("abc123"))
        .await
        .unwrap_err();
    match err {
        KeybridgeError::AuthenticationRejected(message) => {
            assert!(!message.contains("PHONE_CODE_INVALID"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-in"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server)
        .sign_in(PHONE, "12345", &CodeRequestHandle::new("abc123"))
        .await
        .unwrap_err();
    assert!(matches!(err, KeybridgeError::ProviderUnavailable(_)));
}

#[rstest]
#[case(200, Some(true), true)]
#[case(200, Some(false), false)]
#[case(401, None, false)]
#[tokio::test]
async fn test_check_authorization(
    #[case] status: u16,
    #[case] authorized: Option<bool>,
    #[case] expected: bool,
) {
    let server = setup_mock_server().await;
    let mut response = ResponseTemplate::new(status);
    if let Some(authorized) = authorized {
        response = response.set_body_json(serde_json::json!({ "authorized": authorized }));
    }
    Mock::given(method("POST"))
        .and(path("/v1/session/check"))
        .and(body_partial_json(serde_json::json!({ "session": "s-1" })))
        .respond_with(response)
        .mount(&server)
        .await;

    let result = assert_ok!(
        client(&server)
            .check_authorization(&ProviderSession::new("s-1"))
            .await
    );
    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_list_dialogs_decodes_entities() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/contacts/dialogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "dialogs": [
                {"kind": "user", "id": 1, "firstName": "Ada", "mutualContact": true},
                {"kind": "user", "id": 2, "firstName": "Helper", "bot": true},
                {"kind": "group", "id": 3, "title": "team"},
                {"kind": "channel", "id": 4, "title": "news"},
            ],
        })))
        .mount(&server)
        .await;

    let dialogs = assert_ok!(
        client(&server)
            .list_dialogs(&ProviderSession::new("s-1"))
            .await
    );
    assert_eq!(dialogs.len(), 4);
    assert!(matches!(&dialogs[0], DialogEntity::User(user) if user.mutual_contact));
    assert!(matches!(&dialogs[2], DialogEntity::Group { title, .. } if title == "team"));
}

#[tokio::test]
async fn test_list_dialogs_with_dead_session() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/contacts/dialogs"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_dialogs(&ProviderSession::new("s-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, KeybridgeError::SessionExpired));
}

#[tokio::test]
async fn test_malformed_payload_is_invalid_response() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/send-code"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).send_code(PHONE).await.unwrap_err();
    assert!(matches!(err, KeybridgeError::InvalidResponse(_)));
}
