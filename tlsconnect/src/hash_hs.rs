use std::mem;

use crate::crypto::hash;
use crate::msgs::message::{Message, MessagePayload};

/// Early stage buffering of handshake payloads.
///
/// Before ServerHello fixes the suite and version we do not know which
/// hash the transcript uses, so we just buffer the messages.
pub(crate) struct HandshakeHashBuffer {
    buffer: Vec<u8>,
    client_auth_enabled: bool,
}

impl HandshakeHashBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buffer: Vec::new(),
            client_auth_enabled: false,
        }
    }

    /// We might be doing client auth, so need to keep a full
    /// log of the handshake.
    pub(crate) fn set_client_auth_enabled(&mut self) {
        self.client_auth_enabled = true;
    }

    /// Buffer a handshake message.
    pub(crate) fn add_message(&mut self, m: &Message) {
        if let MessagePayload::Handshake { encoded, .. } = &m.payload {
            self.buffer
                .extend_from_slice(encoded.bytes());
        }
    }

    /// We now know what hash function the verify_data will use.
    ///
    /// That is MD5+SHA1 below TLS 1.2, and the suite hash at 1.2.
    pub(crate) fn start_hash(self, provider: &'static dyn hash::Hash) -> HandshakeHash {
        let mut ctx = provider.start();
        ctx.update(&self.buffer);
        HandshakeHash {
            provider,
            ctx,
            client_auth: match self.client_auth_enabled {
                true => Some(self.buffer),
                false => None,
            },
        }
    }
}

/// This deals with keeping a running hash of the handshake
/// payloads.  This is computed by buffering initially.  Once
/// we know what hash function we need to use we switch to
/// incremental hashing.
///
/// For client auth, we also need to buffer all the messages.
/// This is disabled in cases where client auth is not possible.
pub(crate) struct HandshakeHash {
    provider: &'static dyn hash::Hash,
    ctx: Box<dyn hash::Context>,

    /// buffer for client-auth.
    client_auth: Option<Vec<u8>>,
}

impl HandshakeHash {
    /// We decided not to do client auth after all, so discard
    /// the transcript.
    pub(crate) fn abandon_client_auth(&mut self) {
        self.client_auth = None;
    }

    /// Hash/buffer a handshake message.
    pub(crate) fn add_message(&mut self, m: &Message) -> &mut Self {
        if let MessagePayload::Handshake { encoded, .. } = &m.payload {
            self.update_raw(encoded.bytes());
        }
        self
    }

    /// Hash or buffer a byte slice.
    fn update_raw(&mut self, buf: &[u8]) -> &mut Self {
        self.ctx.update(buf);

        if let Some(buffer) = &mut self.client_auth {
            buffer.extend_from_slice(buf);
        }

        self
    }

    /// Get the hash value if we were to hash `extra` too.
    pub(crate) fn get_hash_given(&self, extra: &[u8]) -> hash::Output {
        let mut ctx = self.ctx.fork();
        ctx.update(extra);
        ctx.finish()
    }

    /// Get the current hash value.
    pub(crate) fn get_current_hash(&self) -> hash::Output {
        self.ctx.fork_finish()
    }

    /// Takes the raw bytes of every handshake message so far, for a
    /// CertificateVerify signature.
    ///
    /// This only works once: afterwards the transcript is hash-only.
    pub(crate) fn take_handshake_buf(&mut self) -> Option<Vec<u8>> {
        mem::take(&mut self.client_auth)
    }

    /// Whether raw bytes are still being kept.
    pub(crate) fn client_auth_possible(&self) -> bool {
        self.client_auth.is_some()
    }

    /// The hashing algorithm
    pub(crate) fn algorithm(&self) -> hash::HashAlgorithm {
        self.provider.algorithm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Hash;
    use crate::crypto::rust_crypto::hash::{Md5Sha1, SHA256};
    use crate::enums::{HandshakeType, ProtocolVersion};
    use crate::msgs::base::Payload;
    use crate::msgs::handshake::{HandshakeMessagePayload, HandshakePayload};

    fn finished(body: &[u8]) -> Message {
        Message {
            version: ProtocolVersion::TLSv1_2,
            payload: MessagePayload::handshake(HandshakeMessagePayload {
                typ: HandshakeType::Finished,
                payload: HandshakePayload::Finished(Payload::new(body.to_vec())),
            }),
        }
    }

    fn encoding(m: &Message) -> Vec<u8> {
        let mut out = Vec::new();
        m.payload.encode(&mut out);
        out
    }

    #[test]
    fn hashes_correctly() {
        let (a, b) = (finished(b"hello"), finished(b"world"));
        let mut hhb = HandshakeHashBuffer::new();
        hhb.add_message(&a);
        let mut hh = hhb.start_hash(&SHA256);
        assert!(!hh.client_auth_possible());
        hh.add_message(&b);

        let expect = SHA256.hash(&[encoding(&a), encoding(&b)].concat());
        assert_eq!(hh.get_current_hash().as_ref(), expect.as_ref());
        assert_eq!(hh.algorithm(), hash::HashAlgorithm::SHA256);
    }

    #[test]
    fn legacy_transcript_is_36_bytes() {
        let mut hhb = HandshakeHashBuffer::new();
        hhb.add_message(&finished(b"hello"));
        let hh = hhb.start_hash(&Md5Sha1);
        assert_eq!(hh.get_current_hash().as_ref().len(), 36);
    }

    #[test]
    fn buffers_correctly() {
        let (a, b) = (finished(b"hello"), finished(b"world"));
        let mut hhb = HandshakeHashBuffer::new();
        hhb.set_client_auth_enabled();
        hhb.add_message(&a);
        let mut hh = hhb.start_hash(&SHA256);
        hh.add_message(&b);

        let buf = hh.take_handshake_buf();
        assert_eq!(buf, Some([encoding(&a), encoding(&b)].concat()));
        assert!(hh.take_handshake_buf().is_none());

        // hashing continues after the raw buffer is gone
        let before = hh.get_current_hash();
        hh.add_message(&a);
        assert_ne!(before.as_ref(), hh.get_current_hash().as_ref());
    }

    #[test]
    fn abandon() {
        let mut hhb = HandshakeHashBuffer::new();
        hhb.set_client_auth_enabled();
        hhb.add_message(&finished(b"hello"));
        let mut hh = hhb.start_hash(&SHA256);
        assert!(hh.client_auth_possible());
        hh.abandon_client_auth();
        hh.add_message(&finished(b"world"));
        assert!(hh.take_handshake_buf().is_none());
    }

    #[test]
    fn hash_given_does_not_disturb_state() {
        let mut hhb = HandshakeHashBuffer::new();
        hhb.add_message(&finished(b"hello"));
        let hh = hhb.start_hash(&SHA256);
        let before = hh.get_current_hash();
        let given = hh.get_hash_given(b"extra");
        assert_ne!(before.as_ref(), given.as_ref());
        assert_eq!(before.as_ref(), hh.get_current_hash().as_ref());
    }

    #[test]
    fn only_handshake_messages_are_hashed() {
        let mut hhb = HandshakeHashBuffer::new();
        hhb.add_message(&Message {
            version: ProtocolVersion::TLSv1_2,
            payload: MessagePayload::ApplicationData(Payload::new(b"nope".to_vec())),
        });
        let hh = hhb.start_hash(&SHA256);
        assert_eq!(hh.get_current_hash().as_ref(), SHA256.hash(&[]).as_ref());
    }
}
