//! Output-side encryption of strings and stream payloads.
//!
//! Keys follow the standard security handler: the per-object key is
//! MD5(base key, 3 low bytes of the object number, 2 low bytes of the
//! generation[, "sAlT" for AES]) truncated to `min(n + 5, 16)` bytes.
//! Deriving the base key from passwords is left to the caller.

use crate::codec::aes::{
    AES_BLOCK, aes_cbc_decrypt_padded, aes_cbc_encrypt_blocks, aes_cbc_encrypt_padded,
};
use crate::codec::arcfour::Arcfour;
use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::PDFObjRef;
use std::cell::Cell;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// RC4, 40 to 128 bit keys (V2).
    Rc4,
    /// AES-128 in CBC mode with a 16-byte IV prefix (AESV2).
    Aes128,
}

#[derive(Debug)]
pub struct PdfEncryption {
    key: Vec<u8>,
    method: CryptMethod,
    embedded_files_only: bool,
    iv_counter: Cell<u64>,
}

impl PdfEncryption {
    /// RC4 with a 5 to 16 byte base key.
    pub fn rc4(key: &[u8]) -> Result<Self> {
        if !(5..=16).contains(&key.len()) {
            return Err(PdfError::EncryptionError(format!(
                "RC4 base key must be 5-16 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self::with_method(key, CryptMethod::Rc4))
    }

    /// AES-128 with a 16 byte base key.
    pub fn aes128(key: &[u8]) -> Result<Self> {
        if key.len() != 16 {
            return Err(PdfError::EncryptionError(format!(
                "AES-128 base key must be 16 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self::with_method(key, CryptMethod::Aes128))
    }

    fn with_method(key: &[u8], method: CryptMethod) -> Self {
        Self {
            key: key.to_vec(),
            method,
            embedded_files_only: false,
            iv_counter: Cell::new(0),
        }
    }

    /// Restrict encryption to `/Type /EmbeddedFile` streams.
    pub fn with_embedded_files_only(mut self, embedded_files_only: bool) -> Self {
        self.embedded_files_only = embedded_files_only;
        self
    }

    pub const fn method(&self) -> CryptMethod {
        self.method
    }

    pub const fn embedded_files_only(&self) -> bool {
        self.embedded_files_only
    }

    pub fn object_key(&self, reference: PDFObjRef) -> Vec<u8> {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&reference.objid.to_le_bytes()[..3]);
        key_data.extend_from_slice(&reference.genno.to_le_bytes());
        if self.method == CryptMethod::Aes128 {
            key_data.extend_from_slice(b"sAlT");
        }
        let hash = md5::compute(&key_data);
        let key_len = (self.key.len() + 5).min(16);
        hash.0[..key_len].to_vec()
    }

    /// Encrypted size of an `n` byte payload.
    pub const fn calculate_stream_size(&self, n: usize) -> usize {
        match self.method {
            CryptMethod::Rc4 => n,
            CryptMethod::Aes128 => (n & !15) + 32,
        }
    }

    /// Streams left in clear: `/Filter` naming `Crypt`, and anything but
    /// embedded files when the scope is embedded-files-only.
    pub fn is_exempt(&self, dict: &PDFDictionary) -> bool {
        let crypt_filter = dict.get("Filter").is_some_and(|filter| {
            filter.as_name() == Some("Crypt")
                || filter.as_array().is_some_and(|a| a.contains_name("Crypt"))
        });
        if crypt_filter {
            return true;
        }
        self.embedded_files_only
            && dict.get("Type").and_then(|t| t.as_name()) != Some("EmbeddedFile")
    }

    pub fn encrypt(&self, reference: PDFObjRef, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.object_key(reference);
        match self.method {
            CryptMethod::Rc4 => Ok(Arcfour::new(&key)?.process(data)),
            CryptMethod::Aes128 => {
                let iv = self.next_iv(&key);
                let mut out = iv.to_vec();
                out.extend(aes_cbc_encrypt_padded(&key, &iv, data)?);
                Ok(out)
            }
        }
    }

    pub fn decrypt(&self, reference: PDFObjRef, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.object_key(reference);
        match self.method {
            CryptMethod::Rc4 => Ok(Arcfour::new(&key)?.process(data)),
            CryptMethod::Aes128 => {
                if data.len() < 2 * AES_BLOCK || data.len() % AES_BLOCK != 0 {
                    return Err(PdfError::EncryptionError(format!(
                        "AES payload of {} bytes is not IV plus whole blocks",
                        data.len()
                    )));
                }
                let (iv, body) = data.split_at(AES_BLOCK);
                aes_cbc_decrypt_padded(&key, iv, body)
            }
        }
    }

    /// Wrap `inner` so everything written through it is encrypted for
    /// `reference`. Call [`EncryptingWriter::finish`] to flush padding.
    pub fn encrypting_writer<W: Write>(
        &self,
        reference: PDFObjRef,
        mut inner: W,
    ) -> Result<EncryptingWriter<W>> {
        let key = self.object_key(reference);
        let cipher = match self.method {
            CryptMethod::Rc4 => StreamCipher::Rc4(Arcfour::new(&key)?),
            CryptMethod::Aes128 => {
                let iv = self.next_iv(&key);
                inner.write_all(&iv)?;
                StreamCipher::Aes {
                    key,
                    iv,
                    pending: Vec::with_capacity(AES_BLOCK * 64),
                }
            }
        };
        Ok(EncryptingWriter { inner, cipher })
    }

    // Deterministic per-writer IVs; no randomness source is needed.
    fn next_iv(&self, object_key: &[u8]) -> [u8; AES_BLOCK] {
        let counter = self.iv_counter.get();
        self.iv_counter.set(counter.wrapping_add(1));
        let mut seed = object_key.to_vec();
        seed.extend_from_slice(&counter.to_le_bytes());
        md5::compute(&seed).0
    }
}

enum StreamCipher {
    Rc4(Arcfour),
    Aes {
        key: Vec<u8>,
        iv: [u8; AES_BLOCK],
        pending: Vec<u8>,
    },
}

/// Streaming counterpart of [`PdfEncryption::encrypt`].
pub struct EncryptingWriter<W: Write> {
    inner: W,
    cipher: StreamCipher,
}

impl<W: Write> EncryptingWriter<W> {
    /// Write the final padded AES block and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if let StreamCipher::Aes { key, iv, pending } = &mut self.cipher {
            let pad = AES_BLOCK - pending.len() % AES_BLOCK;
            pending.extend(std::iter::repeat_n(pad as u8, pad));
            aes_cbc_encrypt_blocks(&key[..], &iv[..], &mut pending[..]).map_err(io::Error::other)?;
            self.inner.write_all(pending)?;
            pending.clear();
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.cipher {
            StreamCipher::Rc4(rc4) => {
                let mut chunk = buf.to_vec();
                rc4.process_in_place(&mut chunk);
                self.inner.write_all(&chunk)?;
            }
            StreamCipher::Aes { key, iv, pending } => {
                pending.extend_from_slice(buf);
                let whole = pending.len() / AES_BLOCK * AES_BLOCK;
                if whole > 0 {
                    let mut blocks: Vec<u8> = pending.drain(..whole).collect();
                    *iv = aes_cbc_encrypt_blocks(&key[..], &iv[..], &mut blocks)
                        .map_err(io::Error::other)?;
                    self.inner.write_all(&blocks)?;
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
