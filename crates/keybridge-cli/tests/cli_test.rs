use std::path::PathBuf;
use std::process::Output;

use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PK: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

fn temp_dir() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("keybridge-cli-{}", uuid::Uuid::new_v4()));
    path
}

async fn keybridge(data_dir: &PathBuf, args: &[&str], envs: &[(&str, String)]) -> Output {
    // Get the path to the binary from Cargo
    let binary_path = env!("CARGO_BIN_EXE_keybridge");

    let mut command = Command::new(binary_path);
    command
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--log-level")
        .arg("error")
        .args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command
        .output()
        .await
        .expect("Failed to start keybridge binary")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "Process exited with non-zero status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON document")
}

#[tokio::test]
async fn sign_prints_hex_signature() {
    let dir = temp_dir();
    let output = keybridge(&dir, &["sign", "--private-key", TEST_PK, "--message", "hello"], &[]).await;
    assert!(output.status.success());

    let signature = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(signature.starts_with("0x"));
    assert_eq!(signature.len(), 132);
}

#[tokio::test]
async fn login_profile_logout_roundtrip() {
    let dir = temp_dir();

    let login = stdout_json(&keybridge(&dir, &["login", "--private-key", TEST_PK], &[]).await);
    assert_eq!(login["account"]["walletAddress"], TEST_ADDRESS);
    let token = login["token"].as_str().expect("token is a string").to_string();

    // separate process: the session and signing key come back from disk
    let profile = stdout_json(&keybridge(&dir, &["profile", "--token", &token], &[]).await);
    assert_eq!(profile["account"]["id"], login["account"]["id"]);

    let logout = stdout_json(&keybridge(&dir, &["logout", "--token", &token], &[]).await);
    assert_eq!(logout["success"], true);

    let output = keybridge(&dir, &["profile", "--token", &token], &[]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("revoked"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn link_without_provider_credentials_fails_at_startup() {
    let dir = temp_dir();
    let login = stdout_json(&keybridge(&dir, &["login", "--private-key", TEST_PK], &[]).await);
    let token = login["token"].as_str().expect("token is a string").to_string();

    let output = keybridge(
        &dir,
        &["link", "--token", &token, "--phone", "+15551234567", "--code", "12345"],
        &[],
    )
    .await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("credentials"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn link_with_gateway_prints_contacts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/send-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "phoneCodeHash": "hash-1",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": 4242, "firstName": "Ada"},
            "session": "provider-session",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/session/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "authorized": true,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/contacts/dialogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "dialogs": [
                {"kind": "user", "id": 1, "firstName": "Grace", "mutualContact": true},
                {"kind": "user", "id": 2, "firstName": "Helper", "bot": true},
                {"kind": "channel", "id": 3, "title": "news"},
            ],
        })))
        .mount(&server)
        .await;

    let envs = [
        ("KEYBRIDGE__PROVIDER__API_ID", "12345".to_string()),
        ("KEYBRIDGE__PROVIDER__API_HASH", "gateway-hash".to_string()),
        ("KEYBRIDGE__PROVIDER__BASE_URL", server.uri()),
    ];

    let dir = temp_dir();
    let login = stdout_json(&keybridge(&dir, &["login", "--private-key", TEST_PK], &envs).await);
    let token = login["token"].as_str().expect("token is a string").to_string();

    let linked = stdout_json(
        &keybridge(
            &dir,
            &[
                "link",
                "--token",
                &token,
                "--phone",
                "+15551234567",
                "--code",
                "12345",
                "--show-contacts",
            ],
            &envs,
        )
        .await,
    );
    assert_eq!(linked["externalUser"]["id"], "4242");
    let contacts = linked["contacts"].as_array().expect("contacts array");
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["firstName"], "Grace");

    std::fs::remove_dir_all(&dir).ok();
}
