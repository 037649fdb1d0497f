//! Standard security handler, revision 6 (ISO 32000-2 §7.6.4)
//!
//! Revision 6 protects a random 256-bit file key with each password. The
//! `U`/`O` entries hold a password hash plus two salts, `UE`/`OE` hold the
//! file key wrapped with a key derived from the password, and `Perms` holds
//! the permission flags encrypted with the file key so tampering with `/P`
//! is detectable.

use super::aes::{
    aes128_cbc_encrypt_no_padding, aes256_cbc_decrypt, aes256_cbc_decrypt_no_padding,
    aes256_cbc_encrypt, aes256_cbc_encrypt_no_padding, aes256_ecb_decrypt_block,
    aes256_ecb_encrypt_block, generate_iv, random_bytes,
};
use super::permissions::Permissions;
use crate::error::{PasskeyError, Result};
use sha2::{Digest, Sha256, Sha384, Sha512};
use unicode_normalization::UnicodeNormalization;

/// Passwords are limited to 127 bytes of UTF-8
pub const MAX_PASSWORD_BYTES: usize = 127;

const ZERO_IV: [u8; 16] = [0u8; 16];

/// Security handler revisions this crate writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityHandlerRevision {
    /// Revision 6 (AES-256, PDF 2.0 key derivation)
    R6 = 6,
}

impl SecurityHandlerRevision {
    /// Value of the `/R` entry
    pub fn revision(self) -> i64 {
        self as i64
    }

    /// Value of the `/V` entry
    pub fn version(self) -> i64 {
        match self {
            SecurityHandlerRevision::R6 => 5,
        }
    }
}

/// Password opening the document for reading
#[derive(Debug, Clone)]
pub struct UserPassword(pub String);

/// Password granting full access
#[derive(Debug, Clone)]
pub struct OwnerPassword(pub String);

/// Normalise a password into the byte string used for key derivation
fn prepare_password(password: &str) -> Vec<u8> {
    let mut bytes = password.nfkc().collect::<String>().into_bytes();
    bytes.truncate(MAX_PASSWORD_BYTES);
    bytes
}

impl UserPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    fn prepared(&self) -> Vec<u8> {
        prepare_password(&self.0)
    }
}

impl OwnerPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    fn prepared(&self) -> Vec<u8> {
        prepare_password(&self.0)
    }
}

/// 256-bit file encryption key
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self(key)
    }

    pub fn random() -> Self {
        Self(random_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Salts mixed into the password hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salts {
    pub user_validation: [u8; 8],
    pub user_key: [u8; 8],
    pub owner_validation: [u8; 8],
    pub owner_key: [u8; 8],
}

impl Salts {
    pub fn random() -> Self {
        Self {
            user_validation: random_bytes(),
            user_key: random_bytes(),
            owner_validation: random_bytes(),
            owner_key: random_bytes(),
        }
    }
}

/// Values stored in the encryption dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityParameters {
    pub revision: SecurityHandlerRevision,
    pub u: [u8; 48],
    pub ue: [u8; 32],
    pub o: [u8; 48],
    pub oe: [u8; 32],
    pub perms: [u8; 16],
    pub p: i32,
    pub encrypt_metadata: bool,
}

/// Hash algorithm 2.B.
///
/// `udata` is empty for user hashes and the 48-byte `U` entry for owner
/// hashes.
pub fn compute_hash(password: &[u8], salt: &[u8], udata: &[u8]) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(udata);
    let mut k: Vec<u8> = hasher.finalize().to_vec();

    let mut round = 0usize;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + udata.len()));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(udata);
        }

        let mut aes_key = [0u8; 16];
        aes_key.copy_from_slice(&k[..16]);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&k[16..32]);
        let e = aes128_cbc_encrypt_no_padding(&aes_key, &iv, &k1)?;

        // The first 16 bytes of E as a big-endian integer mod 3 equals the
        // byte sum mod 3 since 256 ≡ 1 (mod 3).
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        let last = usize::from(e[e.len() - 1]);
        if round >= 64 && last + 32 <= round {
            break;
        }
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&k[..32]);
    Ok(hash)
}

fn concat_48(hash: &[u8; 32], validation_salt: &[u8; 8], key_salt: &[u8; 8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out[..32].copy_from_slice(hash);
    out[32..40].copy_from_slice(validation_salt);
    out[40..].copy_from_slice(key_salt);
    out
}

fn to_array_32(bytes: Vec<u8>) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| PasskeyError::Encryption(format!("expected 32 bytes, got {}", v.len())))
}

/// Encrypts document data with the file key and describes it for readers
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    file_key: EncryptionKey,
    parameters: SecurityParameters,
}

impl StandardSecurityHandler {
    /// AES-256 handler with a fresh random file key and salts
    pub fn aes_256_r6(
        user_password: &UserPassword,
        owner_password: &OwnerPassword,
        permissions: Permissions,
    ) -> Result<Self> {
        Self::with_key_material(
            user_password,
            owner_password,
            permissions,
            EncryptionKey::random(),
            Salts::random(),
            random_bytes(),
        )
    }

    /// AES-256 handler from explicit key material
    pub fn with_key_material(
        user_password: &UserPassword,
        owner_password: &OwnerPassword,
        permissions: Permissions,
        file_key: EncryptionKey,
        salts: Salts,
        perms_filler: [u8; 4],
    ) -> Result<Self> {
        let encrypt_metadata = true;
        let user = user_password.prepared();
        let owner = owner_password.prepared();

        // Algorithm 8: U and UE
        let user_hash = compute_hash(&user, &salts.user_validation, &[])?;
        let u = concat_48(&user_hash, &salts.user_validation, &salts.user_key);
        let user_wrap_key = compute_hash(&user, &salts.user_key, &[])?;
        let ue = to_array_32(aes256_cbc_encrypt_no_padding(
            &user_wrap_key,
            &ZERO_IV,
            file_key.as_bytes(),
        )?)?;

        // Algorithm 9: O and OE, both bound to U
        let owner_hash = compute_hash(&owner, &salts.owner_validation, &u)?;
        let o = concat_48(&owner_hash, &salts.owner_validation, &salts.owner_key);
        let owner_wrap_key = compute_hash(&owner, &salts.owner_key, &u)?;
        let oe = to_array_32(aes256_cbc_encrypt_no_padding(
            &owner_wrap_key,
            &ZERO_IV,
            file_key.as_bytes(),
        )?)?;

        // Algorithm 10: Perms
        let p = permissions.p_value();
        let mut perms_block = [0u8; 16];
        perms_block[..4].copy_from_slice(&p.to_le_bytes());
        perms_block[4..8].fill(0xFF);
        perms_block[8] = if encrypt_metadata { b'T' } else { b'F' };
        perms_block[9..12].copy_from_slice(b"adb");
        perms_block[12..].copy_from_slice(&perms_filler);
        let perms = aes256_ecb_encrypt_block(file_key.as_bytes(), &perms_block);

        Ok(Self {
            file_key,
            parameters: SecurityParameters {
                revision: SecurityHandlerRevision::R6,
                u,
                ue,
                o,
                oe,
                perms,
                p,
                encrypt_metadata,
            },
        })
    }

    pub fn parameters(&self) -> &SecurityParameters {
        &self.parameters
    }

    pub fn file_key(&self) -> &EncryptionKey {
        &self.file_key
    }

    /// Encrypt a string or stream body: `IV || AES-256-CBC(data)`
    pub fn encrypt_string(&self, data: &[u8]) -> Vec<u8> {
        aes256_cbc_encrypt(self.file_key.as_bytes(), &generate_iv(), data)
    }

    pub fn decrypt_string(&self, data: &[u8]) -> Result<Vec<u8>> {
        aes256_cbc_decrypt(self.file_key.as_bytes(), data)
    }
}

/// Check a user password against `U` and unwrap the file key from `UE`
pub fn authenticate_user(
    parameters: &SecurityParameters,
    password: &str,
) -> Result<Option<EncryptionKey>> {
    let password = prepare_password(password);
    let (hash, rest) = parameters.u.split_at(32);
    let (validation_salt, key_salt) = rest.split_at(8);

    if compute_hash(&password, validation_salt, &[])? != hash {
        return Ok(None);
    }

    let wrap_key = compute_hash(&password, key_salt, &[])?;
    let key = aes256_cbc_decrypt_no_padding(&wrap_key, &ZERO_IV, &parameters.ue)?;
    Ok(Some(EncryptionKey::new(to_array_32(key)?)))
}

/// Check an owner password against `O` and unwrap the file key from `OE`
pub fn authenticate_owner(
    parameters: &SecurityParameters,
    password: &str,
) -> Result<Option<EncryptionKey>> {
    let password = prepare_password(password);
    let (hash, rest) = parameters.o.split_at(32);
    let (validation_salt, key_salt) = rest.split_at(8);

    if compute_hash(&password, validation_salt, &parameters.u)? != hash {
        return Ok(None);
    }

    let wrap_key = compute_hash(&password, key_salt, &parameters.u)?;
    let key = aes256_cbc_decrypt_no_padding(&wrap_key, &ZERO_IV, &parameters.oe)?;
    Ok(Some(EncryptionKey::new(to_array_32(key)?)))
}

/// Decrypt `Perms` and check it against `/P` and `/EncryptMetadata`
pub fn verify_perms(parameters: &SecurityParameters, key: &EncryptionKey) -> bool {
    let block = aes256_ecb_decrypt_block(key.as_bytes(), &parameters.perms);
    let metadata_flag = if parameters.encrypt_metadata { b'T' } else { b'F' };

    block[..4] == parameters.p.to_le_bytes()
        && block[8] == metadata_flag
        && &block[9..12] == b"adb"
}
