/*
[INPUT]:  Parsed command arguments, opened KeybridgeService
[OUTPUT]: JSON documents on stdout for each command
[POS]:    Command layer - one handler per CLI subcommand
[UPDATE]: When adding subcommands or changing their output
*/

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};
use serde::Serialize;
use tracing::info;

use keybridge_core::auth::login_message;
use keybridge_core::{
    EvmWalletSigner, KeybridgeError, KeybridgeService, SendCodeRequest, SignInRequest,
    VerifySignatureRequest, WalletSigner,
};

/// Signature of `message` by the local key, `0x`-prefixed hex
pub async fn sign(private_key: &str, message: &str) -> Result<String> {
    let wallet = EvmWalletSigner::new(private_key).map_err(with_hint)?;
    wallet.sign_message(message).await.map_err(with_hint)
}

pub async fn login(
    service: &KeybridgeService,
    private_key: &str,
    message: Option<String>,
) -> Result<String> {
    let wallet = EvmWalletSigner::new(private_key).map_err(with_hint)?;
    let message = message.unwrap_or_else(|| login_message(wallet.address(), Utc::now()));
    let signature = wallet.sign_message(&message).await.map_err(with_hint)?;

    let request = VerifySignatureRequest {
        wallet_address: wallet.address().to_string(),
        signature,
        message,
    };
    let response = service
        .verify_signature(&request)
        .await
        .map_err(with_hint)?;
    info!(account_id = %response.account.id, "logged in");
    to_json(&response)
}

pub async fn logout(service: &KeybridgeService, token: &str) -> Result<String> {
    let response = service.logout(token).await.map_err(with_hint)?;
    to_json(&response)
}

pub async fn profile(service: &KeybridgeService, token: &str) -> Result<String> {
    let response = service.profile(token).await.map_err(with_hint)?;
    to_json(&response)
}

/// Arguments of the `link` command
#[derive(Debug, Clone)]
pub struct LinkArgs {
    pub token: String,
    pub phone_number: String,
    /// Prompted for interactively when absent
    pub code: Option<String>,
    pub show_contacts: bool,
}

/// Send a code, read it back, sign in and link the provider account to the wallet
pub async fn link(service: &KeybridgeService, args: LinkArgs) -> Result<String> {
    let sent = service
        .send_code(
            &args.token,
            &SendCodeRequest {
                phone_number: args.phone_number.clone(),
            },
        )
        .await
        .map_err(with_hint)?;

    let code = match args.code {
        Some(code) => code,
        None => prompt_code()?,
    };

    let signed_in = service
        .sign_in(
            &args.token,
            &SignInRequest {
                phone_number: args.phone_number,
                code,
                code_request_handle: sent.code_request_handle.to_string(),
            },
        )
        .await
        .map_err(with_hint)?;

    if !args.show_contacts {
        return to_json(&signed_in);
    }

    let contacts = service.contacts(&args.token).await.map_err(with_hint)?;
    to_json(&serde_json::json!({
        "externalUser": signed_in.external_user,
        "contacts": contacts.contacts,
    }))
}

pub async fn contacts(service: &KeybridgeService, token: &str) -> Result<String> {
    let response = service.contacts(token).await.map_err(with_hint)?;
    to_json(&response)
}

fn prompt_code() -> Result<String> {
    eprintln!(
        "{}",
        style("A verification code was sent to your provider app.").cyan()
    );
    let code: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Verification code")
        .validate_with(|input: &String| -> std::result::Result<(), &'static str> {
            if !input.trim().is_empty() && input.trim().chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err("digits only")
            }
        })
        .interact_text()
        .context("read verification code")?;
    Ok(code.trim().to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("render response")
}

/// Attach the actionable next step, if the error has one
pub fn with_hint(err: KeybridgeError) -> anyhow::Error {
    match err.next_step() {
        Some(step) => anyhow!("{err} ({step})"),
        None => anyhow!(err),
    }
}
