//! Applying a security handler to a whole document

use super::aes::random_bytes;
use super::decryption::unlock_with_empty_password;
use super::permissions::Permissions;
use super::standard_security::{
    OwnerPassword, SecurityParameters, StandardSecurityHandler, UserPassword,
};
use super::Passwords;
use crate::error::{PasskeyError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, StringFormat};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

const MIN_AES_256_VERSION: &str = "1.7";
const ADBE_EXTENSION_LEVEL: i64 = 8;

fn hex_string(bytes: &[u8]) -> Object {
    Object::String(bytes.to_vec(), StringFormat::Hexadecimal)
}

/// Build the `/Encrypt` dictionary for a revision 6 handler
pub fn encryption_dictionary(parameters: &SecurityParameters) -> Dictionary {
    dictionary! {
        "Filter" => Object::Name(b"Standard".to_vec()),
        "V" => Object::Integer(parameters.revision.version()),
        "R" => Object::Integer(parameters.revision.revision()),
        "Length" => Object::Integer(256),
        "CF" => dictionary! {
            "StdCF" => dictionary! {
                "AuthEvent" => Object::Name(b"DocOpen".to_vec()),
                "CFM" => Object::Name(b"AESV3".to_vec()),
                "Length" => Object::Integer(32),
            },
        },
        "StmF" => Object::Name(b"StdCF".to_vec()),
        "StrF" => Object::Name(b"StdCF".to_vec()),
        "O" => hex_string(&parameters.o),
        "U" => hex_string(&parameters.u),
        "OE" => hex_string(&parameters.oe),
        "UE" => hex_string(&parameters.ue),
        "Perms" => hex_string(&parameters.perms),
        "P" => Object::Integer(i64::from(parameters.p)),
        "EncryptMetadata" => Object::Boolean(parameters.encrypt_metadata),
    }
}

pub(super) fn has_type(dict: &Dictionary, type_name: &[u8]) -> bool {
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name.as_slice() == type_name)
}

/// Cross-reference and object streams are rebuilt on save and never encrypted
pub(super) fn is_structural_stream(object: &Object) -> bool {
    match object {
        Object::Stream(stream) => {
            has_type(&stream.dict, b"XRef") || has_type(&stream.dict, b"ObjStm")
        }
        _ => false,
    }
}

/// A string/stream transformation and the parts of a document it applies to
pub(super) struct CipherScope<'a> {
    pub apply: &'a dyn Fn(&[u8]) -> Result<Vec<u8>>,
    pub strings: bool,
    pub streams: bool,
    /// Whether `/Type /Metadata` streams are included
    pub metadata: bool,
}

fn transform_dictionary(dict: &mut Dictionary, scope: &CipherScope<'_>) -> Result<()> {
    // Signature byte ranges cover /Contents as written
    let is_signature = has_type(dict, b"Sig");

    for (key, value) in dict.iter_mut() {
        if is_signature && key.as_slice() == b"Contents" {
            continue;
        }
        transform_object(value, scope)?;
    }
    Ok(())
}

pub(super) fn transform_object(object: &mut Object, scope: &CipherScope<'_>) -> Result<()> {
    match object {
        Object::String(bytes, format) if scope.strings => {
            *bytes = (scope.apply)(bytes)?;
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                transform_object(item, scope)?;
            }
        }
        Object::Dictionary(dict) => transform_dictionary(dict, scope)?,
        Object::Stream(stream) => {
            transform_dictionary(&mut stream.dict, scope)?;
            let skipped = !scope.metadata && has_type(&stream.dict, b"Metadata");
            if scope.streams && !skipped {
                let content = (scope.apply)(&stream.content)?;
                stream.set_content(content);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Raise old documents to 1.7 and declare the Adobe extension level for AES-256
fn declare_aes_256_support(document: &mut Document) -> Result<()> {
    if !document.version.starts_with("1.") {
        return Ok(());
    }
    if document.version.as_str() < MIN_AES_256_VERSION {
        document.version = MIN_AES_256_VERSION.to_string();
    }

    let root_id = match document.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            return Err(PasskeyError::InvalidStructure(
                "trailer has no /Root reference".to_string(),
            ))
        }
    };

    let catalog = match document.objects.get_mut(&root_id) {
        Some(Object::Dictionary(dict)) => dict,
        _ => {
            return Err(PasskeyError::InvalidStructure(format!(
                "catalog {} {} R is not a dictionary",
                root_id.0, root_id.1
            )))
        }
    };

    let adbe = dictionary! {
        "BaseVersion" => Object::Name(MIN_AES_256_VERSION.as_bytes().to_vec()),
        "ExtensionLevel" => Object::Integer(ADBE_EXTENSION_LEVEL),
    };
    let mut extensions = match catalog.get(b"Extensions") {
        Ok(Object::Dictionary(existing)) => existing.clone(),
        _ => Dictionary::new(),
    };
    extensions.set("ADBE", adbe);
    catalog.set("Extensions", extensions);

    Ok(())
}

/// Encrypt every object of `document` in place and attach the `/Encrypt` dictionary
pub fn encrypt_document(document: &mut Document, handler: &StandardSecurityHandler) -> Result<()> {
    if document.trailer.has(b"Encrypt") {
        return Err(PasskeyError::PasswordRequired);
    }

    declare_aes_256_support(document)?;

    let before = document.objects.len();
    document.objects.retain(|_, object| !is_structural_stream(object));
    debug!(
        objects = document.objects.len(),
        dropped = before - document.objects.len(),
        "Encrypting document objects"
    );

    let encrypt = |data: &[u8]| -> Result<Vec<u8>> { Ok(handler.encrypt_string(data)) };
    let scope = CipherScope {
        apply: &encrypt,
        strings: true,
        streams: true,
        metadata: handler.parameters().encrypt_metadata,
    };
    for object in document.objects.values_mut() {
        transform_object(object, &scope)?;
    }

    let id = match document.trailer.get(b"ID") {
        Ok(Object::Array(parts)) if parts.len() == 2 => Object::Array(parts.clone()),
        _ => {
            let id = random_bytes::<16>();
            Object::Array(vec![hex_string(&id), hex_string(&id)])
        }
    };
    let root = document.trailer.get(b"Root")?.clone();
    let info = document.trailer.get(b"Info").ok().cloned();

    let encrypt_id = document.add_object(encryption_dictionary(handler.parameters()));

    let mut trailer = Dictionary::new();
    trailer.set("Root", root);
    if let Some(info) = info {
        trailer.set("Info", info);
    }
    trailer.set("ID", id);
    trailer.set("Encrypt", Object::Reference(encrypt_id));
    trailer.set("Size", Object::Integer(i64::from(document.max_id) + 1));
    document.trailer = trailer;

    Ok(())
}

/// Bytes scanned at the end of a file for the last trailer and `startxref`
const TAIL_SCAN_LEN: usize = 4096;

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

/// Offset named by the last `startxref` keyword
fn startxref_offset(tail: &[u8]) -> Option<usize> {
    let keyword = rfind_bytes(tail, b"startxref")?;
    let digits: Vec<u8> = tail[keyword + b"startxref".len()..]
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .copied()
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

/// Whether the last trailer or cross-reference stream of `bytes` has an
/// `/Encrypt` entry. Object bodies elsewhere in the file are not looked at.
fn trailer_declares_encryption(bytes: &[u8]) -> bool {
    let tail = &bytes[bytes.len().saturating_sub(TAIL_SCAN_LEN)..];

    if let Some(trailer) = rfind_bytes(tail, b"trailer") {
        if find_bytes(&tail[trailer..], b"/Encrypt").is_some() {
            return true;
        }
    }

    startxref_offset(tail)
        .and_then(|offset| bytes.get(offset..))
        .map(|section| {
            let dict_end = find_bytes(section, b"stream").unwrap_or(section.len());
            find_bytes(&section[..dict_end], b"/Encrypt").is_some()
        })
        .unwrap_or(false)
}

fn declares_encryption(path: &Path) -> bool {
    fs::read(path)
        .map(|bytes| trailer_declares_encryption(&bytes))
        .unwrap_or(false)
}

/// Load a document that can be opened without a password.
///
/// Encrypted documents whose user password is empty are decrypted;
/// anything else carrying `/Encrypt` fails with
/// [`PasskeyError::PasswordRequired`].
pub fn load_unprotected(input: &Path) -> Result<Document> {
    let mut document = match Document::load(input) {
        Ok(document) => document,
        Err(_) if declares_encryption(input) => return Err(PasskeyError::PasswordRequired),
        Err(e) => return Err(e.into()),
    };

    if document.trailer.has(b"Encrypt") {
        unlock_with_empty_password(&mut document)?;
        debug!(input = %input.display(), "Opened with the empty user password");
    }
    Ok(document)
}

/// Write `document` to `output`, synced to disk before returning
pub fn write_document(document: &mut Document, output: &Path) -> Result<()> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    document.save_to(&mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Encrypt the PDF at `input` with AES-256 and write it to `output`.
///
/// The owner password defaults to the user password. Fails with
/// [`PasskeyError::PasswordRequired`] when `input` is encrypted and does not
/// open with the empty user password.
pub fn encrypt_pdf(input: &Path, output: &Path, passwords: &Passwords) -> Result<()> {
    let mut document = load_unprotected(input)?;

    let handler = StandardSecurityHandler::aes_256_r6(
        &UserPassword::new(passwords.user.as_str()),
        &OwnerPassword::new(passwords.owner_or_user()),
        Permissions::all(),
    )?;
    encrypt_document(&mut document, &handler)?;
    write_document(&mut document, output)?;

    debug!(input = %input.display(), output = %output.display(), "Encrypted PDF");
    Ok(())
}
