//! PDF password protection according to ISO 32000-2 §7.6
//!
//! Documents are encrypted with the standard security handler, revision 6:
//! AES-256 for every string and stream, with user and owner passwords
//! guarding a random file key.

mod aes;
mod decryption;
mod document;
mod permissions;
mod standard_security;

pub use aes::{
    aes256_cbc_decrypt, aes256_cbc_encrypt, generate_iv, random_bytes, BLOCK_SIZE,
};
pub use decryption::{security_parameters_from, unlock_with_empty_password};
pub use document::{
    encrypt_document, encrypt_pdf, encryption_dictionary, load_unprotected, write_document,
};
pub use permissions::Permissions;
pub use standard_security::{
    authenticate_owner, authenticate_user, compute_hash, verify_perms, EncryptionKey,
    OwnerPassword, Salts, SecurityHandlerRevision, SecurityParameters, StandardSecurityHandler,
    UserPassword, MAX_PASSWORD_BYTES,
};

use crate::error::Result;
use std::path::Path;

/// User password plus an optional distinct owner password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passwords {
    pub user: String,
    pub owner: Option<String>,
}

impl Passwords {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// The owner password, falling back to the user password
    pub fn owner_or_user(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.user)
    }
}

/// Something that can write a password-protected copy of a PDF.
///
/// Implementations must report an input that is already encrypted as
/// [`PasskeyError::PasswordRequired`](crate::PasskeyError::PasswordRequired)
/// and must have finished writing `output` when they return `Ok`.
pub trait PdfEncryptor {
    fn encrypt(&self, input: &Path, output: &Path, passwords: &Passwords) -> Result<()>;
}

/// AES-256 encryption backed by [`encrypt_pdf`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncryptor;

impl PdfEncryptor for StandardEncryptor {
    fn encrypt(&self, input: &Path, output: &Path, passwords: &Passwords) -> Result<()> {
        encrypt_pdf(input, output, passwords)
    }
}

/// Implementation of PdfEncryptor for closures
impl<F> PdfEncryptor for F
where
    F: Fn(&Path, &Path, &Passwords) -> Result<()>,
{
    fn encrypt(&self, input: &Path, output: &Path, passwords: &Passwords) -> Result<()> {
        self(input, output, passwords)
    }
}
