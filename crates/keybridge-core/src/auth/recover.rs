/*
[INPUT]:  Signed message text and 65-byte r||s||v signature
[OUTPUT]: Recovered lower-cased EVM address
[POS]:    Auth layer - wallet signature verification (pure functions)
[UPDATE]: When supporting other signing schemes or signature encodings
*/

use alloy_primitives::{Signature, U256};

use crate::error::{KeybridgeError, Result};

const SIGNATURE_LEN: usize = 65;

/// Recover the signing address of an EIP-191 personal message.
///
/// The message is hashed with the `"\x19Ethereum Signed Message:\n" + len`
/// prefix before recovery, matching what wallets produce for `personal_sign`.
pub fn recover_address(message: &str, signature: &[u8]) -> Result<String> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeybridgeError::InvalidSignatureFormat(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }

    let y_parity = match signature[64] {
        0 | 27 => false,
        1 | 28 => true,
        v => {
            return Err(KeybridgeError::InvalidSignatureFormat(format!(
                "invalid recovery id {v}"
            )));
        }
    };
    let r = U256::from_be_slice(&signature[..32]);
    let s = U256::from_be_slice(&signature[32..64]);

    let address = Signature::new(r, s, y_parity)
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| KeybridgeError::InvalidSignatureFormat(e.to_string()))?;

    Ok(format!("0x{}", hex::encode(address.as_slice())))
}

/// Decode a hex signature as sent by wallets ("0x"-prefixed or not)
pub fn decode_signature_hex(signature: &str) -> Result<Vec<u8>> {
    let signature = signature.trim();
    let signature = signature
        .strip_prefix("0x")
        .or_else(|| signature.strip_prefix("0X"))
        .unwrap_or(signature);
    hex::decode(signature)
        .map_err(|e| KeybridgeError::InvalidSignatureFormat(format!("signature is not hex: {e}")))
}

/// Lower-case an EVM address and make sure it carries the `0x` prefix
pub fn normalize_wallet_address(address: &str) -> String {
    let address = address.trim();
    let bare = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    format!("0x{}", bare.to_ascii_lowercase())
}

/// `^0x[0-9a-fA-F]{40}$`
pub fn is_wallet_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Case-insensitive comparison of the claimed and the recovered address
pub fn verify_wallet_address(claimed: &str, recovered: &str) -> Result<()> {
    if normalize_wallet_address(claimed) == normalize_wallet_address(recovered) {
        Ok(())
    } else {
        Err(KeybridgeError::SignatureMismatch)
    }
}
