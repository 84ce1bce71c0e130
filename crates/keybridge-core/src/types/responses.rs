/*
[INPUT]:  Boundary payload definitions and serde requirements
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - outbound payloads of the boundary operations
[UPDATE]: When boundary payloads change or new operations are added
*/

use serde::{Deserialize, Serialize};

use super::models::{Account, CodeRequestHandle, Contact, ExternalUser};

/// Result of a wallet login; the raw token is only ever returned here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    pub success: bool,
    pub code_request_handle: CodeRequestHandle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub success: bool,
    pub external_user: ExternalUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactsResponse {
    pub success: bool,
    pub contacts: Vec<Contact>,
}
