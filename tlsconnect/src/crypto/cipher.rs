use crate::crypto::SecureRandom;
use crate::enums::{ContentType, ProtocolVersion};
use crate::error::Error;
use crate::msgs::codec;
pub use crate::msgs::message::{BorrowedPlainMessage, OpaqueMessage, PlainMessage};

/// Factory trait for building `MessageEncrypter` and `MessageDecrypter` for
/// the bulk cipher of a cipher suite.
pub trait RecordAlgorithm: Send + Sync + 'static {
    /// Build a `MessageEncrypter` for one direction's slice of the key block.
    ///
    /// `version` is the negotiated protocol version: CBC ciphers chain their
    /// IV across records in TLS 1.0 and send an explicit per-record IV,
    /// drawn from `secure_random`, from TLS 1.1.
    fn encrypter(
        &self,
        keys: DirectionKeys<'_>,
        version: ProtocolVersion,
        secure_random: &'static dyn SecureRandom,
    ) -> Box<dyn MessageEncrypter>;

    /// Build a `MessageDecrypter` for one direction's slice of the key block.
    fn decrypter(&self, keys: DirectionKeys<'_>, version: ProtocolVersion)
        -> Box<dyn MessageDecrypter>;

    /// How much key material this algorithm consumes per direction.
    fn key_block_shape(&self) -> KeyBlockShape;
}

/// How a TLS key block is partitioned for one record algorithm.
///
/// The key block is laid out as both MAC keys, both encryption keys, and
/// then both fixed IVs; client-write material always comes first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBlockShape {
    /// Length of each MAC key; zero for AEAD ciphers.
    pub mac_key_len: usize,
    /// Length of each encryption key.
    pub enc_key_len: usize,
    /// Length of each fixed IV.
    ///
    /// For CBC ciphers this is the block size: the IV is only used by
    /// TLS 1.0, but it is always derived.
    pub fixed_iv_len: usize,
}

impl KeyBlockShape {
    /// Total length of key block needed for both directions.
    pub fn len(&self) -> usize {
        2 * (self.mac_key_len + self.enc_key_len + self.fixed_iv_len)
    }
}

/// One direction's keys, borrowed from the key block.
#[derive(Clone, Copy)]
pub struct DirectionKeys<'a> {
    /// The MAC key.
    pub mac_key: &'a [u8],
    /// The encryption key.
    pub enc_key: &'a [u8],
    /// The fixed IV.
    pub iv: &'a [u8],
}

/// Objects with this trait can decrypt TLS messages.
pub trait MessageDecrypter: Send + Sync {
    /// Perform the decryption over the concerned TLS message.
    ///
    /// Any failure to authenticate the record, including bad CBC padding,
    /// is reported as [`Error::DecryptError`].
    fn decrypt(&mut self, m: OpaqueMessage, seq: u64) -> Result<PlainMessage, Error>;
}

/// Objects with this trait can encrypt TLS messages.
pub trait MessageEncrypter: Send + Sync {
    /// Encrypt the message `m`.
    fn encrypt(&mut self, m: BorrowedPlainMessage<'_>, seq: u64) -> Result<OpaqueMessage, Error>;
}

impl dyn MessageEncrypter {
    pub(crate) fn invalid() -> Box<dyn MessageEncrypter> {
        Box::new(InvalidMessageEncrypter {})
    }
}

impl dyn MessageDecrypter {
    pub(crate) fn invalid() -> Box<dyn MessageDecrypter> {
        Box::new(InvalidMessageDecrypter {})
    }
}

/// Size of TLS nonces (incorrectly termed "IV" in standard) for AEAD suites.
pub const NONCE_LEN: usize = 12;

/// A write or read IV for an AEAD suite.
#[derive(Default)]
pub struct Iv([u8; NONCE_LEN]);

impl Iv {
    /// Create a new `Iv` from a byte slice, of precisely `NONCE_LEN` bytes.
    pub fn copy(value: &[u8]) -> Result<Self, Error> {
        let mut iv = Self::default();
        if value.len() != NONCE_LEN {
            return Err(Error::General("wrong IV length".into()));
        }
        iv.0.copy_from_slice(value);
        Ok(iv)
    }
}

/// Combine an `Iv` and sequence number to produce a unique nonce.
///
/// This is `iv ^ seq` where `seq` is encoded as a 96-bit big-endian integer.
#[inline]
pub fn make_nonce(iv: &Iv, seq: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    codec::put_u64(seq, &mut nonce[4..]);

    nonce
        .iter_mut()
        .zip(iv.0.iter())
        .for_each(|(nonce, iv)| {
            *nonce ^= *iv;
        });

    nonce
}

const TLS12_AAD_SIZE: usize = 8 + 1 + 2 + 2;

/// Returns the `additional_data` encoding shared by TLS 1.2 AEAD suites and
/// the MAC input of CBC suites.
///
/// See RFC5246 s6.2.3.3 for the `additional_data` definition.
#[inline]
pub fn make_tls12_aad(
    seq: u64,
    typ: ContentType,
    vers: ProtocolVersion,
    len: usize,
) -> [u8; TLS12_AAD_SIZE] {
    let mut out = [0; TLS12_AAD_SIZE];
    codec::put_u64(seq, &mut out[0..]);
    out[8] = u8::from(typ);
    codec::put_u16(u16::from(vers), &mut out[9..]);
    codec::put_u16(len as u16, &mut out[11..]);
    out
}

/// A `MessageEncrypter` which doesn't work.
struct InvalidMessageEncrypter {}

impl MessageEncrypter for InvalidMessageEncrypter {
    fn encrypt(&mut self, _m: BorrowedPlainMessage<'_>, _seq: u64) -> Result<OpaqueMessage, Error> {
        Err(Error::EncryptError)
    }
}

/// A `MessageDecrypter` which doesn't work.
struct InvalidMessageDecrypter {}

impl MessageDecrypter for InvalidMessageDecrypter {
    fn decrypt(&mut self, _m: OpaqueMessage, _seq: u64) -> Result<PlainMessage, Error> {
        Err(Error::DecryptError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_xors_sequence_into_low_bytes() {
        let iv = Iv::copy(&[0xff; NONCE_LEN]).unwrap();
        let nonce = make_nonce(&iv, 1);
        assert_eq!(nonce[..11], [0xff; 11]);
        assert_eq!(nonce[11], 0xfe);
    }

    #[test]
    fn aad_layout() {
        let aad = make_tls12_aad(2, ContentType::Handshake, ProtocolVersion::TLSv1_0, 0x102);
        assert_eq!(aad, [0, 0, 0, 0, 0, 0, 0, 2, 0x16, 0x03, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn key_block_length() {
        let shape = KeyBlockShape {
            mac_key_len: 20,
            enc_key_len: 16,
            fixed_iv_len: 16,
        };
        assert_eq!(shape.len(), 104);
    }

    #[test]
    fn invalid_ciphers_refuse() {
        let mut enc = <dyn MessageEncrypter>::invalid();
        let msg = BorrowedPlainMessage {
            typ: ContentType::ApplicationData,
            version: ProtocolVersion::TLSv1_2,
            payload: b"x",
        };
        assert_eq!(enc.encrypt(msg, 0).unwrap_err(), Error::EncryptError);
    }
}
