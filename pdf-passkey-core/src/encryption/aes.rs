//! AES primitives used by the revision 6 security handler
//!
//! Object data is encrypted with AES-256 in CBC mode, a random 16-byte IV
//! prepended and PKCS#7 padding. Key derivation additionally needs unpadded
//! CBC (AES-128 and AES-256) and single-block ECB.

use crate::error::{PasskeyError, Result};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128Enc, Aes256Dec, Aes256Enc, Block as AesBlock};
use rand::rngs::OsRng;
use rand::RngCore;

pub const BLOCK_SIZE: usize = 16;

/// Fill a fixed-size array from the operating system RNG
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random initialization vector
pub fn generate_iv() -> [u8; BLOCK_SIZE] {
    random_bytes()
}

enum BlockCipher {
    Aes128(Aes128Enc),
    Aes256(Aes256Enc),
}

impl BlockCipher {
    fn encrypt(&self, block: &mut [u8; BLOCK_SIZE]) {
        let mut aes_block = AesBlock::from(*block);
        match self {
            BlockCipher::Aes128(cipher) => cipher.encrypt_block(&mut aes_block),
            BlockCipher::Aes256(cipher) => cipher.encrypt_block(&mut aes_block),
        }
        block.copy_from_slice(&aes_block);
    }
}

fn cbc_encrypt_blocks(cipher: &BlockCipher, iv: &[u8; BLOCK_SIZE], data: &[u8]) -> Vec<u8> {
    debug_assert_eq!(data.len() % BLOCK_SIZE, 0);

    let mut output = Vec::with_capacity(data.len());
    let mut prev_block = *iv;

    for chunk in data.chunks_exact(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        for (out, (plain, prev)) in block.iter_mut().zip(chunk.iter().zip(prev_block.iter())) {
            *out = plain ^ prev;
        }
        cipher.encrypt(&mut block);
        output.extend_from_slice(&block);
        prev_block = block;
    }

    output
}

fn cbc_decrypt_blocks(key: &[u8; 32], iv: &[u8; BLOCK_SIZE], data: &[u8]) -> Vec<u8> {
    let cipher = Aes256Dec::new(key.into());
    let mut output = Vec::with_capacity(data.len());
    let mut prev_block = *iv;

    for chunk in data.chunks_exact(BLOCK_SIZE) {
        let mut aes_block = AesBlock::clone_from_slice(chunk);
        cipher.decrypt_block(&mut aes_block);
        for (plain, prev) in aes_block.iter().zip(prev_block.iter()) {
            output.push(plain ^ prev);
        }
        prev_block.copy_from_slice(chunk);
    }

    output
}

/// AES-128-CBC without padding; `data` must be a whole number of blocks
pub fn aes128_cbc_encrypt_no_padding(
    key: &[u8; 16],
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PasskeyError::Encryption(format!(
            "unpadded input must be a multiple of {BLOCK_SIZE} bytes, got {}",
            data.len()
        )));
    }
    let cipher = BlockCipher::Aes128(Aes128Enc::new(key.into()));
    Ok(cbc_encrypt_blocks(&cipher, iv, data))
}

/// AES-256-CBC without padding; `data` must be a whole number of blocks
pub fn aes256_cbc_encrypt_no_padding(
    key: &[u8; 32],
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PasskeyError::Encryption(format!(
            "unpadded input must be a multiple of {BLOCK_SIZE} bytes, got {}",
            data.len()
        )));
    }
    let cipher = BlockCipher::Aes256(Aes256Enc::new(key.into()));
    Ok(cbc_encrypt_blocks(&cipher, iv, data))
}

/// Inverse of [`aes256_cbc_encrypt_no_padding`]
pub fn aes256_cbc_decrypt_no_padding(
    key: &[u8; 32],
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PasskeyError::Encryption(format!(
            "ciphertext must be a multiple of {BLOCK_SIZE} bytes, got {}",
            data.len()
        )));
    }
    Ok(cbc_decrypt_blocks(key, iv, data))
}

/// Encrypt `data` with AES-256-CBC and PKCS#7 padding, returning `IV || ciphertext`
pub fn aes256_cbc_encrypt(key: &[u8; 32], iv: &[u8; BLOCK_SIZE], data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);

    let cipher = BlockCipher::Aes256(Aes256Enc::new(key.into()));
    let mut output = Vec::with_capacity(BLOCK_SIZE + padded.len());
    output.extend_from_slice(iv);
    output.extend(cbc_encrypt_blocks(&cipher, iv, &padded));
    output
}

/// Decrypt `IV || ciphertext` produced by [`aes256_cbc_encrypt`]
pub fn aes256_cbc_decrypt(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 2 * BLOCK_SIZE || data.len() % BLOCK_SIZE != 0 {
        return Err(PasskeyError::Encryption(format!(
            "invalid ciphertext length {}",
            data.len()
        )));
    }

    let (iv, ciphertext) = data.split_at(BLOCK_SIZE);
    let mut iv_block = [0u8; BLOCK_SIZE];
    iv_block.copy_from_slice(iv);

    let mut plaintext = cbc_decrypt_blocks(key, &iv_block, ciphertext);

    let pad = plaintext.last().copied().unwrap_or(0) as usize;
    if pad == 0
        || pad > BLOCK_SIZE
        || plaintext[plaintext.len() - pad..]
            .iter()
            .any(|&b| b as usize != pad)
    {
        return Err(PasskeyError::Encryption("invalid padding".to_string()));
    }
    plaintext.truncate(plaintext.len() - pad);
    Ok(plaintext)
}

/// Encrypt a single block with AES-256 in ECB mode
pub fn aes256_ecb_encrypt_block(key: &[u8; 32], block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let cipher = BlockCipher::Aes256(Aes256Enc::new(key.into()));
    let mut output = *block;
    cipher.encrypt(&mut output);
    output
}

/// Decrypt a single block with AES-256 in ECB mode
pub fn aes256_ecb_decrypt_block(key: &[u8; 32], block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let cipher = Aes256Dec::new(key.into());
    let mut aes_block = AesBlock::from(*block);
    cipher.decrypt_block(&mut aes_block);
    let mut output = [0u8; BLOCK_SIZE];
    output.copy_from_slice(&aes_block);
    output
}
