//! Opening documents that are encrypted with an empty user password
//!
//! Such documents open in any reader without a prompt; the encryption only
//! carries permission restrictions. They are decrypted here so they can be
//! re-encrypted with a real password.

use super::aes::aes256_cbc_decrypt;
use super::document::{is_structural_stream, transform_object, CipherScope};
use super::standard_security::{authenticate_user, SecurityHandlerRevision, SecurityParameters};
use crate::error::{PasskeyError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

/// The document's encryption dictionary and its object id when indirect
fn encryption_dictionary_of(document: &Document) -> Result<(Option<ObjectId>, Dictionary)> {
    match document.trailer.get(b"Encrypt") {
        Ok(Object::Reference(id)) => match document.objects.get(id) {
            Some(Object::Dictionary(dict)) => Ok((Some(*id), dict.clone())),
            _ => Err(PasskeyError::InvalidStructure(format!(
                "encryption dictionary {} {} R is missing",
                id.0, id.1
            ))),
        },
        Ok(Object::Dictionary(dict)) => Ok((None, dict.clone())),
        _ => Err(PasskeyError::InvalidStructure(
            "trailer /Encrypt is not a dictionary".to_string(),
        )),
    }
}

fn integer_entry(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|object| object.as_i64().ok())
}

/// First `N` bytes of a string entry
fn string_entry<const N: usize>(dict: &Dictionary, key: &[u8]) -> Result<[u8; N]> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) if bytes.len() >= N => {
            let mut out = [0u8; N];
            out.copy_from_slice(&bytes[..N]);
            Ok(out)
        }
        _ => Err(PasskeyError::InvalidStructure(format!(
            "/{} must be a string of at least {N} bytes",
            String::from_utf8_lossy(key)
        ))),
    }
}

/// Read revision 6 values back from an encryption dictionary
pub fn security_parameters_from(dict: &Dictionary) -> Result<SecurityParameters> {
    let p = integer_entry(dict, b"P")
        .ok_or_else(|| PasskeyError::InvalidStructure("/P is missing".to_string()))?;
    let encrypt_metadata = !matches!(dict.get(b"EncryptMetadata"), Ok(Object::Boolean(false)));

    Ok(SecurityParameters {
        revision: SecurityHandlerRevision::R6,
        u: string_entry(dict, b"U")?,
        ue: string_entry(dict, b"UE")?,
        o: string_entry(dict, b"O")?,
        oe: string_entry(dict, b"OE")?,
        perms: string_entry(dict, b"Perms")?,
        // unsigned /P values wrap to the same 32-bit pattern
        p: p as i32,
        encrypt_metadata,
    })
}

/// `/StmF` and `/StrF` default to the identity filter when absent
fn is_identity_filter(dict: &Dictionary, key: &[u8]) -> bool {
    match dict.get(key) {
        Ok(Object::Name(name)) => name.as_slice() == b"Identity",
        _ => true,
    }
}

fn remove_encryption(document: &mut Document, encrypt_id: Option<ObjectId>) {
    document.trailer.remove(b"Encrypt");
    if let Some(id) = encrypt_id {
        document.objects.remove(&id);
    }
}

fn unlock_aes_256(
    document: &mut Document,
    dict: &Dictionary,
    encrypt_id: Option<ObjectId>,
) -> Result<()> {
    let parameters = security_parameters_from(dict)?;
    let key = authenticate_user(&parameters, "")?.ok_or(PasskeyError::PasswordRequired)?;

    let decrypt = |data: &[u8]| -> Result<Vec<u8>> {
        if data.is_empty() {
            Ok(Vec::new())
        } else {
            aes256_cbc_decrypt(key.as_bytes(), data)
        }
    };
    let scope = CipherScope {
        apply: &decrypt,
        strings: !is_identity_filter(dict, b"StrF"),
        streams: !is_identity_filter(dict, b"StmF"),
        metadata: parameters.encrypt_metadata,
    };

    for (id, object) in document.objects.iter_mut() {
        if Some(*id) == encrypt_id || is_structural_stream(object) {
            continue;
        }
        transform_object(object, &scope)?;
    }

    remove_encryption(document, encrypt_id);
    Ok(())
}

/// Decrypt `document` in place if its user password is empty.
///
/// Revision 6 (AES-256) is handled here; revisions 2 and 3 (RC4) go through
/// lopdf. Any other handler, or a non-empty user password, fails with
/// [`PasskeyError::PasswordRequired`].
pub fn unlock_with_empty_password(document: &mut Document) -> Result<()> {
    let (encrypt_id, dict) = encryption_dictionary_of(document)?;
    let version = integer_entry(&dict, b"V").unwrap_or(0);
    let revision = integer_entry(&dict, b"R").unwrap_or(0);
    debug!(version, revision, "Trying the empty user password");

    match (version, revision) {
        (5, 6) => unlock_aes_256(document, &dict, encrypt_id),
        (1 | 2, 2 | 3) => {
            document
                .decrypt("")
                .map_err(|_| PasskeyError::PasswordRequired)?;
            remove_encryption(document, encrypt_id);
            Ok(())
        }
        _ => Err(PasskeyError::PasswordRequired),
    }
}
