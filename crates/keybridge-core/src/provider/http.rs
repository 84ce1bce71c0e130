/*
[INPUT]:  Provider configuration (gateway URL, api id/hash, timeouts)
[OUTPUT]: ProviderClient speaking JSON to the provider gateway
[POS]:    Provider layer - HTTP implementation of the provider capability
[UPDATE]: When gateway endpoints or error mapping change
*/

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderClient, SignInOutcome};
use crate::config::ProviderConfig;
use crate::error::{KeybridgeError, Result};
use crate::types::{CodeRequestHandle, DialogEntity, ProviderSession, ProviderUser};

const SEND_CODE_PATH: &str = "/v1/auth/send-code";
const SIGN_IN_PATH: &str = "/v1/auth/sign-in";
const CHECK_SESSION_PATH: &str = "/v1/session/check";
const DIALOGS_PATH: &str = "/v1/contacts/dialogs";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeBody<'a> {
    api_id: i32,
    api_hash: &'a str,
    phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeReply {
    phone_code_hash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody<'a> {
    api_id: i32,
    api_hash: &'a str,
    phone_number: &'a str,
    phone_code: &'a str,
    phone_code_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignInReply {
    user: ProviderUser,
    session: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    api_id: i32,
    api_hash: &'a str,
    session: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckSessionReply {
    authorized: bool,
}

#[derive(Debug, Deserialize)]
struct DialogsReply {
    dialogs: Vec<DialogEntity>,
}

/// HTTP client for the provider gateway
#[derive(Debug)]
pub struct HttpProviderClient {
    http_client: Client,
    base_url: Url,
    api_id: i32,
    api_hash: String,
}

impl HttpProviderClient {
    /// Build a client; invalid credentials fail here, not on first use
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(&config.base_url)?,
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let builder = self.request(Method::POST, endpoint)?.json(body);
        builder.send().await.map_err(|err| {
            debug!(endpoint, error = %err, "provider request failed");
            KeybridgeError::ProviderUnavailable(format!("request to {endpoint} failed"))
        })
    }

    fn session_body<'a>(&'a self, session: &'a ProviderSession) -> SessionBody<'a> {
        SessionBody {
            api_id: self.api_id,
            api_hash: &self.api_hash,
            session: session.expose(),
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn send_code(&self, phone_number: &str) -> Result<CodeRequestHandle> {
        let body = SendCodeBody {
            api_id: self.api_id,
            api_hash: &self.api_hash,
            phone_number,
        };
        let response = self.post(SEND_CODE_PATH, &body).await?;
        let status = response.status();
        match status {
            s if s.is_success() => {
                let reply: SendCodeReply = decode_json(response).await?;
                Ok(CodeRequestHandle::new(reply.phone_code_hash))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(KeybridgeError::InvalidCredentialsConfigured(
                    "provider refused the api credentials".to_string(),
                ))
            }
            StatusCode::BAD_REQUEST => Err(KeybridgeError::AuthenticationRejected(
                "phone number rejected by provider".to_string(),
            )),
            other => Err(unavailable(SEND_CODE_PATH, other, response).await),
        }
    }

    async fn sign_in(
        &self,
        phone_number: &str,
        code: &str,
        handle: &CodeRequestHandle,
    ) -> Result<SignInOutcome> {
        let body = SignInBody {
            api_id: self.api_id,
            api_hash: &self.api_hash,
            phone_number,
            phone_code: code,
            phone_code_hash: handle.as_str(),
        };
        let response = self.post(SIGN_IN_PATH, &body).await?;
        let status = response.status();
        match status {
            s if s.is_success() => {
                let reply: SignInReply = decode_json(response).await?;
                Ok(SignInOutcome {
                    user: reply.user,
                    session: ProviderSession::new(reply.session),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let detail = response.text().await.unwrap_or_default();
                debug!(status = %status, detail = %detail, "provider rejected sign-in");
                Err(KeybridgeError::AuthenticationRejected(
                    "invalid code or sign-in denied".to_string(),
                ))
            }
            other => Err(unavailable(SIGN_IN_PATH, other, response).await),
        }
    }

    async fn check_authorization(&self, session: &ProviderSession) -> Result<bool> {
        let response = self
            .post(CHECK_SESSION_PATH, &self.session_body(session))
            .await?;
        let status = response.status();
        match status {
            s if s.is_success() => {
                let reply: CheckSessionReply = decode_json(response).await?;
                Ok(reply.authorized)
            }
            StatusCode::UNAUTHORIZED => Ok(false),
            other => Err(unavailable(CHECK_SESSION_PATH, other, response).await),
        }
    }

    async fn list_dialogs(&self, session: &ProviderSession) -> Result<Vec<DialogEntity>> {
        let response = self.post(DIALOGS_PATH, &self.session_body(session)).await?;
        let status = response.status();
        match status {
            s if s.is_success() => {
                let reply: DialogsReply = decode_json(response).await?;
                Ok(reply.dialogs)
            }
            StatusCode::UNAUTHORIZED => Err(KeybridgeError::SessionExpired),
            other => Err(unavailable(DIALOGS_PATH, other, response).await),
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| KeybridgeError::ProviderUnavailable(format!("reading response failed: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| KeybridgeError::InvalidResponse(format!("unexpected provider payload: {e}")))
}

async fn unavailable(endpoint: &str, status: StatusCode, response: Response) -> KeybridgeError {
    let detail = response.text().await.unwrap_or_default();
    debug!(endpoint, status = %status, detail = %detail, "provider returned an error status");
    KeybridgeError::ProviderUnavailable(format!("{endpoint} answered {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_credentials() {
        let err = HttpProviderClient::new(&ProviderConfig::default()).unwrap_err();
        assert!(matches!(err, KeybridgeError::InvalidCredentialsConfigured(_)));
    }

    #[test]
    fn test_client_with_config() {
        let config = ProviderConfig::new(42, "hash").with_base_url("http://127.0.0.1:9/gateway/");
        let client = HttpProviderClient::new(&config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9/gateway/");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable() {
        // port 9 (discard) is not expected to accept HTTP
        let config = ProviderConfig::new(42, "hash").with_base_url("http://127.0.0.1:9");
        let client = HttpProviderClient::new(&config).unwrap();

        let err = client.send_code("+15551234567").await.unwrap_err();
        assert!(matches!(err, KeybridgeError::ProviderUnavailable(_)));
        assert!(err.is_retryable());
    }
}
