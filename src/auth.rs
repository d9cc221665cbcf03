//! Credential boundary for device authentication.
//!
//! The session layer consumes a [`CredentialSource`]: given a device
//! identity, it yields a username plus either a password or private key
//! material. Key material is parsed into a signer up front so an unreadable
//! or unparseable key surfaces as a connect failure, not mid-handshake.

use std::fmt;
use std::path::Path;

use async_ssh2_tokio::client::AuthMethod;
use russh::keys::decode_secret_key;

use crate::device::Device;
use crate::error::ConnectError;

/// Authentication material for one device.
#[derive(Clone)]
pub enum AuthKind {
    /// Password authentication.
    Password(String),
    /// Private key material in OpenSSH/PEM form.
    PrivateKey {
        material: String,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for AuthKind {
    // Secrets never reach logs; only the variant is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthKind::Password(_) => f.write_str("AuthKind::Password(..)"),
            AuthKind::PrivateKey { .. } => f.write_str("AuthKind::PrivateKey(..)"),
        }
    }
}

/// Username plus authentication material, ready to dial with.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub auth: AuthKind,
}

impl Credentials {
    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth: AuthKind::Password(password.into()),
        }
    }

    /// Builds key credentials from in-memory key material.
    ///
    /// The material is decoded once here; a key the signer cannot parse is
    /// rejected before any network I/O happens.
    pub fn with_key_material(
        username: impl Into<String>,
        material: impl Into<String>,
        passphrase: Option<String>,
    ) -> Result<Self, ConnectError> {
        let material = material.into();
        decode_secret_key(&material, passphrase.as_deref())
            .map_err(|e| ConnectError::Credentials(format!("unparseable private key: {e}")))?;
        Ok(Self {
            username: username.into(),
            auth: AuthKind::PrivateKey {
                material,
                passphrase,
            },
        })
    }

    /// Builds key credentials by reading a key file from disk.
    pub fn from_key_file(
        username: impl Into<String>,
        path: &Path,
        passphrase: Option<String>,
    ) -> Result<Self, ConnectError> {
        let material = std::fs::read_to_string(path).map_err(|e| {
            ConnectError::Credentials(format!("unreadable key file {}: {e}", path.display()))
        })?;
        Self::with_key_material(username, material, passphrase)
    }

    /// Converts to the transport stack's auth method.
    pub(crate) fn auth_method(&self) -> AuthMethod {
        match &self.auth {
            AuthKind::Password(password) => AuthMethod::with_password(password),
            AuthKind::PrivateKey {
                material,
                passphrase,
            } => AuthMethod::with_key(material, passphrase.as_deref()),
        }
    }
}

/// Yields authentication material for a device identity.
///
/// Implementations are pure lookups with no shared mutable state; the
/// configuration is the canonical implementation.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self, device: &Device) -> Result<Credentials, ConnectError>;
}

#[cfg(test)]
mod tests {
    use super::{AuthKind, Credentials};
    use crate::error::ConnectError;

    #[test]
    fn garbage_key_material_is_rejected_up_front() {
        let err = match Credentials::with_key_material("admin", "not a key", None) {
            Ok(_) => panic!("garbage key material should not validate"),
            Err(err) => err,
        };
        match err {
            ConnectError::Credentials(reason) => {
                assert!(reason.contains("unparseable private key"));
            }
            other => panic!("unexpected error type: {other}"),
        }
    }

    #[test]
    fn missing_key_file_is_a_credential_error() {
        let err = Credentials::from_key_file("admin", "/nonexistent/id_ed25519".as_ref(), None)
            .expect_err("missing key file should fail");
        assert!(matches!(err, ConnectError::Credentials(_)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials::with_password("admin", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(matches!(creds.auth, AuthKind::Password(_)));
    }
}
