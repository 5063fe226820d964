//! AES-128-CBC helpers for stream and string encryption.

use crate::error::{PdfError, Result};
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;

pub const AES_BLOCK: usize = 16;

fn cipher_error(err: impl std::fmt::Display) -> PdfError {
    PdfError::EncryptionError(format!("AES: {err}"))
}

/// Encrypt `data` with AES-128-CBC and PKCS#7 padding.
///
/// Output is always a whole number of blocks, at least one.
pub fn aes_cbc_encrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; (data.len() / AES_BLOCK + 1) * AES_BLOCK];
    buf[..data.len()].copy_from_slice(data);
    let written = Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(cipher_error)?
        .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
        .map_err(cipher_error)?
        .len();
    buf.truncate(written);
    Ok(buf)
}

/// Encrypt whole blocks in place, without padding.
///
/// Returns the last ciphertext block, which chains into the next call.
pub fn aes_cbc_encrypt_blocks(key: &[u8], iv: &[u8], blocks: &mut [u8]) -> Result<[u8; AES_BLOCK]> {
    if blocks.len() % AES_BLOCK != 0 || blocks.is_empty() {
        return Err(PdfError::EncryptionError(format!(
            "AES: {} bytes is not a whole number of blocks",
            blocks.len()
        )));
    }
    let len = blocks.len();
    Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(cipher_error)?
        .encrypt_padded_mut::<NoPadding>(blocks, len)
        .map_err(cipher_error)?;
    let mut last = [0u8; AES_BLOCK];
    last.copy_from_slice(&blocks[len - AES_BLOCK..]);
    Ok(last)
}

/// Decrypt AES-128-CBC data and strip PKCS#7 padding.
pub fn aes_cbc_decrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    let plain = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(cipher_error)?
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(cipher_error)?;
    Ok(plain.to_vec())
}
