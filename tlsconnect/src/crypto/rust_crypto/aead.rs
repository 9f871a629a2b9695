use chacha20poly1305::{AeadInPlace, KeyInit, KeySizeUser};

use crate::crypto::cipher::{
    make_nonce, make_tls12_aad, BorrowedPlainMessage, DirectionKeys, Iv, KeyBlockShape,
    MessageDecrypter, MessageEncrypter, OpaqueMessage, PlainMessage, RecordAlgorithm, NONCE_LEN,
};
use crate::crypto::SecureRandom;
use crate::enums::ProtocolVersion;
use crate::error::Error;
use crate::msgs::base::Payload;

/// ChaCha20-Poly1305 for TLS 1.2, per RFC 7905.
pub(crate) struct Chacha20Poly1305;

impl RecordAlgorithm for Chacha20Poly1305 {
    fn encrypter(
        &self,
        keys: DirectionKeys<'_>,
        _version: ProtocolVersion,
        _secure_random: &'static dyn SecureRandom,
    ) -> Box<dyn MessageEncrypter> {
        match Tls12Cipher::new(keys) {
            Ok(cipher) => Box::new(cipher),
            Err(_) => <dyn MessageEncrypter>::invalid(),
        }
    }

    fn decrypter(
        &self,
        keys: DirectionKeys<'_>,
        _version: ProtocolVersion,
    ) -> Box<dyn MessageDecrypter> {
        match Tls12Cipher::new(keys) {
            Ok(cipher) => Box::new(cipher),
            Err(_) => <dyn MessageDecrypter>::invalid(),
        }
    }

    fn key_block_shape(&self) -> KeyBlockShape {
        KeyBlockShape {
            mac_key_len: 0,
            enc_key_len: chacha20poly1305::ChaCha20Poly1305::key_size(),
            fixed_iv_len: NONCE_LEN,
        }
    }
}

struct Tls12Cipher(chacha20poly1305::ChaCha20Poly1305, Iv);

impl Tls12Cipher {
    fn new(keys: DirectionKeys<'_>) -> Result<Self, Error> {
        let key = chacha20poly1305::ChaCha20Poly1305::new_from_slice(keys.enc_key)
            .map_err(|_| Error::General("wrong ChaCha20 key length".into()))?;
        Ok(Self(key, Iv::copy(keys.iv)?))
    }
}

impl MessageEncrypter for Tls12Cipher {
    fn encrypt(&mut self, m: BorrowedPlainMessage<'_>, seq: u64) -> Result<OpaqueMessage, Error> {
        let mut payload = Vec::with_capacity(m.payload.len() + CHACHAPOLY1305_OVERHEAD);
        payload.extend_from_slice(m.payload);

        let nonce = chacha20poly1305::Nonce::from(make_nonce(&self.1, seq));
        let aad = make_tls12_aad(seq, m.typ, m.version, m.payload.len());

        self.0
            .encrypt_in_place(&nonce, &aad, &mut payload)
            .map_err(|_| Error::EncryptError)
            .map(|_| OpaqueMessage {
                typ: m.typ,
                version: m.version,
                payload,
            })
    }
}

impl MessageDecrypter for Tls12Cipher {
    fn decrypt(&mut self, m: OpaqueMessage, seq: u64) -> Result<PlainMessage, Error> {
        let OpaqueMessage {
            typ,
            version,
            mut payload,
        } = m;
        if payload.len() < CHACHAPOLY1305_OVERHEAD {
            return Err(Error::DecryptError);
        }

        let nonce = chacha20poly1305::Nonce::from(make_nonce(&self.1, seq));
        let aad = make_tls12_aad(
            seq,
            typ,
            version,
            payload.len() - CHACHAPOLY1305_OVERHEAD,
        );

        self.0
            .decrypt_in_place(&nonce, &aad, &mut payload)
            .map_err(|_| Error::DecryptError)?;

        Ok(PlainMessage {
            typ,
            version,
            payload: Payload::new(payload),
        })
    }
}

const CHACHAPOLY1305_OVERHEAD: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::test_provider::FixedRandom;
    use crate::enums::ContentType;

    static RANDOM: FixedRandom = FixedRandom(1);

    const KEYS: DirectionKeys<'static> = DirectionKeys {
        mac_key: &[],
        enc_key: &[0x80; 32],
        iv: &[0x07; 12],
    };

    fn message(payload: &[u8]) -> BorrowedPlainMessage<'_> {
        BorrowedPlainMessage {
            typ: ContentType::ApplicationData,
            version: ProtocolVersion::TLSv1_2,
            payload,
        }
    }

    #[test]
    fn seals_and_opens_with_matching_sequence() {
        let mut enc = Chacha20Poly1305.encrypter(KEYS, ProtocolVersion::TLSv1_2, &RANDOM);
        let mut dec = Chacha20Poly1305.decrypter(KEYS, ProtocolVersion::TLSv1_2);

        let sealed = enc.encrypt(message(b"ping"), 5).unwrap();
        assert_eq!(sealed.payload.len(), 4 + CHACHAPOLY1305_OVERHEAD);
        assert_eq!(dec.decrypt(sealed, 5).unwrap().payload.bytes(), b"ping");
    }

    #[test]
    fn header_is_authenticated() {
        let mut enc = Chacha20Poly1305.encrypter(KEYS, ProtocolVersion::TLSv1_2, &RANDOM);
        let mut dec = Chacha20Poly1305.decrypter(KEYS, ProtocolVersion::TLSv1_2);

        let mut sealed = enc.encrypt(message(b"ping"), 0).unwrap();
        sealed.typ = ContentType::Handshake;
        assert_eq!(dec.decrypt(sealed, 0).unwrap_err(), Error::DecryptError);
    }

    #[test]
    fn truncated_record_is_refused() {
        let mut dec = Chacha20Poly1305.decrypter(KEYS, ProtocolVersion::TLSv1_2);
        let short = OpaqueMessage {
            typ: ContentType::ApplicationData,
            version: ProtocolVersion::TLSv1_2,
            payload: vec![0; 15],
        };
        assert_eq!(dec.decrypt(short, 0).unwrap_err(), Error::DecryptError);
    }

    #[test]
    fn wrong_key_length_gives_invalid_cipher() {
        let keys = DirectionKeys {
            mac_key: &[],
            enc_key: &[0; 16],
            iv: &[0; 12],
        };
        let mut enc = Chacha20Poly1305.encrypter(keys, ProtocolVersion::TLSv1_2, &RANDOM);
        assert_eq!(
            enc.encrypt(message(b"x"), 0).unwrap_err(),
            Error::EncryptError
        );
    }
}
