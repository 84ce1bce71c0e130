/*
[INPUT]:  Key storage directory
[OUTPUT]: Persistent TokenSigner instance surviving restarts
[POS]:    Auth layer - persistent storage for the token-signing key
[UPDATE]: When key storage format or file naming conventions change
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::auth::TokenSigner;

const KEY_FILE_NAME: &str = "token_ed25519.key";

/// Manages persistence of the token-signing key
#[derive(Debug, Clone)]
pub struct TokenKeyStore {
    key_dir: PathBuf,
}

impl TokenKeyStore {
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            key_dir: key_dir.as_ref().to_path_buf(),
        }
    }

    /// Load the signing key, generating and saving one on first use
    pub fn load_or_create(&self) -> io::Result<TokenSigner> {
        if let Some(signer) = self.load()? {
            return Ok(signer);
        }
        let signer = TokenSigner::generate();
        self.save(&signer)?;
        info!(key_id = %signer.key_id(), "generated new token signing key");
        Ok(signer)
    }

    /// `Ok(None)` when no key file exists; a corrupt file is an error, not a silent rotation
    pub fn load(&self) -> io::Result<Option<TokenSigner>> {
        let path = self.key_file_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let bytes = STANDARD
            .decode(content.trim())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let key_bytes: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected 32 key bytes, found {}", bytes.len()),
            )
        })?;
        Ok(Some(TokenSigner::from_secret_key(&key_bytes)))
    }

    pub fn save(&self, signer: &TokenSigner) -> io::Result<()> {
        fs::create_dir_all(&self.key_dir)?;

        let path = self.key_file_path();
        fs::write(&path, STANDARD.encode(signer.secret_key_bytes()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    pub fn key_file_path(&self) -> PathBuf {
        self.key_dir.join(KEY_FILE_NAME)
    }
}
