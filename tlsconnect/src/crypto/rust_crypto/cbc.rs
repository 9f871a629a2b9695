//! AES-CBC with HMAC, MAC-then-encrypt (RFC 5246 section 6.2.3.2).
//!
//! TLS 1.0 chains the IV across records, starting from the IV in the key
//! block.  TLS 1.1 and later send a fresh explicit IV in front of every
//! record.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use subtle::ConstantTimeEq;

use crate::crypto::cipher::{
    make_tls12_aad, BorrowedPlainMessage, DirectionKeys, KeyBlockShape, MessageDecrypter,
    MessageEncrypter, OpaqueMessage, PlainMessage, RecordAlgorithm,
};
use crate::crypto::{hmac, SecureRandom};
use crate::enums::ProtocolVersion;
use crate::error::Error;
use crate::msgs::base::Payload;

const BLOCK_LEN: usize = 16;

/// Largest plaintext fragment we accept after decryption.
const MAX_FRAGMENT_LEN: usize = 16384;

/// AES-CBC record protection with the given key length and MAC.
pub(crate) struct AesCbc {
    pub(crate) key_len: usize,
    pub(crate) hmac: &'static dyn hmac::Hmac,
}

impl RecordAlgorithm for AesCbc {
    fn encrypter(
        &self,
        keys: DirectionKeys<'_>,
        version: ProtocolVersion,
        secure_random: &'static dyn SecureRandom,
    ) -> Box<dyn MessageEncrypter> {
        match CbcState::new(self, keys, version) {
            Ok(state) => Box::new(CbcEncrypter {
                state,
                secure_random,
            }),
            Err(_) => <dyn MessageEncrypter>::invalid(),
        }
    }

    fn decrypter(
        &self,
        keys: DirectionKeys<'_>,
        version: ProtocolVersion,
    ) -> Box<dyn MessageDecrypter> {
        match CbcState::new(self, keys, version) {
            Ok(state) => Box::new(CbcDecrypter { state }),
            Err(_) => <dyn MessageDecrypter>::invalid(),
        }
    }

    fn key_block_shape(&self) -> KeyBlockShape {
        KeyBlockShape {
            mac_key_len: self.hmac.hash_output_len(),
            enc_key_len: self.key_len,
            fixed_iv_len: BLOCK_LEN,
        }
    }
}

enum AesKey {
    Aes128(aes::Aes128),
    Aes256(aes::Aes256),
}

impl AesKey {
    fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => aes::Aes128::new_from_slice(key).map(Self::Aes128),
            32 => aes::Aes256::new_from_slice(key).map(Self::Aes256),
            _ => return Err(Error::General("bad AES key length".into())),
        }
        .map_err(|_| Error::General("bad AES key length".into()))
    }

    fn encrypt_blocks(&self, iv: &[u8; BLOCK_LEN], data: &mut [u8]) {
        let mut prev = *iv;
        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= *p;
            }
            let block = aes::Block::from_mut_slice(chunk);
            match self {
                Self::Aes128(k) => k.encrypt_block(block),
                Self::Aes256(k) => k.encrypt_block(block),
            }
            prev.copy_from_slice(chunk);
        }
    }

    fn decrypt_blocks(&self, iv: &[u8; BLOCK_LEN], data: &mut [u8]) {
        let mut prev = *iv;
        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            let mut this_ct = [0u8; BLOCK_LEN];
            this_ct.copy_from_slice(chunk);
            let block = aes::Block::from_mut_slice(chunk);
            match self {
                Self::Aes128(k) => k.decrypt_block(block),
                Self::Aes256(k) => k.decrypt_block(block),
            }
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= *p;
            }
            prev = this_ct;
        }
    }
}

/// State shared by both directions.
struct CbcState {
    key: AesKey,
    mac_key: Box<dyn hmac::Key>,
    /// The IV for the next record, when IVs are chained (TLS 1.0).
    chained_iv: Option<[u8; BLOCK_LEN]>,
}

impl CbcState {
    fn new(alg: &AesCbc, keys: DirectionKeys<'_>, version: ProtocolVersion) -> Result<Self, Error> {
        let chained_iv = match version {
            ProtocolVersion::TLSv1_0 => {
                let mut iv = [0u8; BLOCK_LEN];
                if keys.iv.len() != BLOCK_LEN {
                    return Err(Error::General("wrong IV length".into()));
                }
                iv.copy_from_slice(keys.iv);
                Some(iv)
            }
            _ => None,
        };

        Ok(Self {
            key: AesKey::new(keys.enc_key)?,
            mac_key: alg.hmac.with_key(keys.mac_key),
            chained_iv,
        })
    }

    fn mac(&self, seq: u64, m: &BorrowedPlainMessage<'_>, payload: &[u8]) -> hmac::Tag {
        let header = make_tls12_aad(seq, m.typ, m.version, payload.len());
        self.mac_key
            .sign(&[&header, payload])
    }
}

struct CbcEncrypter {
    state: CbcState,
    secure_random: &'static dyn SecureRandom,
}

impl MessageEncrypter for CbcEncrypter {
    fn encrypt(&mut self, m: BorrowedPlainMessage<'_>, seq: u64) -> Result<OpaqueMessage, Error> {
        let tag = self.state.mac(seq, &m, m.payload);

        let data_len = m.payload.len() + tag.as_ref().len();
        let pad_len = BLOCK_LEN - 1 - (data_len % BLOCK_LEN);

        let mut data = Vec::with_capacity(BLOCK_LEN + data_len + pad_len + 1);
        data.extend_from_slice(m.payload);
        data.extend_from_slice(tag.as_ref());
        data.resize(data_len + pad_len + 1, pad_len as u8);

        let payload = match &mut self.state.chained_iv {
            Some(chained) => {
                self.state.key.encrypt_blocks(chained, &mut data);
                chained.copy_from_slice(&data[data.len() - BLOCK_LEN..]);
                data
            }
            None => {
                let mut iv = [0u8; BLOCK_LEN];
                self.secure_random.fill(&mut iv)?;
                self.state.key.encrypt_blocks(&iv, &mut data);
                let mut payload = Vec::with_capacity(BLOCK_LEN + data.len());
                payload.extend_from_slice(&iv);
                payload.extend_from_slice(&data);
                payload
            }
        };

        Ok(OpaqueMessage {
            typ: m.typ,
            version: m.version,
            payload,
        })
    }
}

struct CbcDecrypter {
    state: CbcState,
}

impl MessageDecrypter for CbcDecrypter {
    fn decrypt(&mut self, m: OpaqueMessage, seq: u64) -> Result<PlainMessage, Error> {
        let mac_len = self.state.mac_key.tag_len();
        let OpaqueMessage {
            typ,
            version,
            payload,
        } = m;

        let (iv, mut data) = match self.state.chained_iv {
            Some(chained) => (chained, payload),
            None => {
                if payload.len() < BLOCK_LEN {
                    return Err(Error::DecryptError);
                }
                let mut iv = [0u8; BLOCK_LEN];
                iv.copy_from_slice(&payload[..BLOCK_LEN]);
                (iv, payload[BLOCK_LEN..].to_vec())
            }
        };

        let min_len = (mac_len + 1 + BLOCK_LEN - 1) / BLOCK_LEN * BLOCK_LEN;
        if data.len() < min_len || data.len() % BLOCK_LEN != 0 {
            return Err(Error::DecryptError);
        }

        if let Some(chained) = &mut self.state.chained_iv {
            chained.copy_from_slice(&data[data.len() - BLOCK_LEN..]);
        }
        self.state.key.decrypt_blocks(&iv, &mut data);

        let pad_len = data[data.len() - 1] as usize;
        let overhead = pad_len + 1 + mac_len;
        let good_length = u8::from(overhead <= data.len());

        let pad_start = data.len().saturating_sub(pad_len + 1);
        let mut pad_ok = good_length;
        for b in &data[pad_start..] {
            pad_ok &= b.ct_eq(&(pad_len as u8)).unwrap_u8();
        }

        // the MAC is computed whatever the padding looked like
        let content_len = if good_length == 1 {
            data.len() - overhead
        } else {
            0
        };
        let expected = self.state.mac(
            seq,
            &BorrowedPlainMessage {
                typ,
                version,
                payload: &[],
            },
            &data[..content_len],
        );
        let received = if good_length == 1 {
            &data[content_len..content_len + mac_len]
        } else {
            &data[..mac_len]
        };
        let mac_ok = received
            .ct_eq(expected.as_ref())
            .unwrap_u8();

        if pad_ok & mac_ok != 1 || content_len > MAX_FRAGMENT_LEN {
            return Err(Error::DecryptError);
        }

        data.truncate(content_len);
        Ok(PlainMessage {
            typ,
            version,
            payload: Payload::new(data),
        })
    }
}
