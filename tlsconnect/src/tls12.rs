use zeroize::Zeroizing;

use crate::crypto::cipher::{DirectionKeys, MessageDecrypter, MessageEncrypter};
use crate::crypto::hash;
use crate::crypto::tls12::Prf;
use crate::crypto::SecureRandom;
use crate::enums::ProtocolVersion;
use crate::suites::SupportedCipherSuite;

/// The client and server randoms of one handshake.
#[derive(Clone, Copy)]
pub(crate) struct ConnectionRandoms {
    pub(crate) client: [u8; 32],
    pub(crate) server: [u8; 32],
}

impl ConnectionRandoms {
    pub(crate) fn new(client: [u8; 32], server: [u8; 32]) -> Self {
        Self { client, server }
    }

    /// `client_random || server_random`, as signed in a ServerKeyExchange.
    pub(crate) fn client_first(&self) -> [u8; 64] {
        join_randoms(&self.client, &self.server)
    }
}

pub(crate) type MessageCipherPair = (Box<dyn MessageDecrypter>, Box<dyn MessageEncrypter>);

/// Per-connection keying material.
pub(crate) struct ConnectionSecrets {
    pub(crate) randoms: ConnectionRandoms,
    suite: SupportedCipherSuite,
    version: ProtocolVersion,
    master_secret: Zeroizing<[u8; 48]>,
}

impl ConnectionSecrets {
    /// Derive the master secret from a freshly agreed pre-master secret.
    pub(crate) fn from_key_exchange(
        pre_master_secret: &[u8],
        randoms: ConnectionRandoms,
        suite: SupportedCipherSuite,
        version: ProtocolVersion,
    ) -> Self {
        let mut ret = Self {
            randoms,
            suite,
            version,
            master_secret: Zeroizing::new([0u8; 48]),
        };

        let seed = join_randoms(&ret.randoms.client, &ret.randoms.server);
        ret.prf().for_secret(
            &mut ret.master_secret[..],
            pre_master_secret,
            b"master secret",
            &seed,
        );
        ret
    }

    /// Pick up the master secret of a resumed session.
    pub(crate) fn new_resume(
        randoms: ConnectionRandoms,
        suite: SupportedCipherSuite,
        version: ProtocolVersion,
        master_secret: &[u8; 48],
    ) -> Self {
        Self {
            randoms,
            suite,
            version,
            master_secret: Zeroizing::new(*master_secret),
        }
    }

    fn prf(&self) -> &'static dyn Prf {
        self.suite.prf_for(self.version)
    }

    /// Make the record protection for both directions.
    ///
    /// The key block is split as client MAC key, server MAC key,
    /// client key, server key, client IV, server IV.
    pub(crate) fn make_cipher_pair(
        &self,
        secure_random: &'static dyn SecureRandom,
    ) -> MessageCipherPair {
        let alg = self.suite.record_alg;
        let shape = alg.key_block_shape();
        let key_block = self.make_key_block(shape.len());

        let (client_mac, rest) = key_block.split_at(shape.mac_key_len);
        let (server_mac, rest) = rest.split_at(shape.mac_key_len);
        let (client_key, rest) = rest.split_at(shape.enc_key_len);
        let (server_key, rest) = rest.split_at(shape.enc_key_len);
        let (client_iv, server_iv) = rest.split_at(shape.fixed_iv_len);

        let write = DirectionKeys {
            mac_key: client_mac,
            enc_key: client_key,
            iv: client_iv,
        };
        let read = DirectionKeys {
            mac_key: server_mac,
            enc_key: server_key,
            iv: server_iv,
        };

        (
            alg.decrypter(read, self.version),
            alg.encrypter(write, self.version, secure_random),
        )
    }

    fn make_key_block(&self, len: usize) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; len]);

        // NOTE: opposite order to the master secret derivation.
        let randoms = join_randoms(&self.randoms.server, &self.randoms.client);
        self.prf().for_secret(
            &mut out,
            &self.master_secret[..],
            b"key expansion",
            &randoms,
        );

        out
    }

    pub(crate) fn suite(&self) -> SupportedCipherSuite {
        self.suite
    }

    pub(crate) fn master_secret(&self) -> &[u8; 48] {
        &self.master_secret
    }

    fn make_verify_data(&self, handshake_hash: &hash::Output, label: &[u8]) -> [u8; 12] {
        let mut out = [0u8; 12];
        self.prf().for_secret(
            &mut out,
            &self.master_secret[..],
            label,
            handshake_hash.as_ref(),
        );
        out
    }

    pub(crate) fn client_verify_data(&self, handshake_hash: &hash::Output) -> [u8; 12] {
        self.make_verify_data(handshake_hash, b"client finished")
    }

    pub(crate) fn server_verify_data(&self, handshake_hash: &hash::Output) -> [u8; 12] {
        self.make_verify_data(handshake_hash, b"server finished")
    }
}

fn join_randoms(first: &[u8; 32], second: &[u8; 32]) -> [u8; 64] {
    let mut randoms = [0u8; 64];
    randoms[..32].copy_from_slice(first);
    randoms[32..].copy_from_slice(second);
    randoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Hash;
    use crate::crypto::rust_crypto::hash::SHA256;
    use crate::crypto::rust_crypto::test_provider::FixedRandom;
    use crate::crypto::rust_crypto::TLS_RSA_WITH_AES_128_CBC_SHA;
    use crate::enums::ContentType;
    use crate::msgs::message::BorrowedPlainMessage;

    static RANDOM: FixedRandom = FixedRandom(7);

    fn randoms() -> ConnectionRandoms {
        ConnectionRandoms::new([1; 32], [2; 32])
    }

    #[test]
    fn randoms_are_joined_in_order() {
        let joined = randoms().client_first();
        assert_eq!(&joined[..32], &[1; 32]);
        assert_eq!(&joined[32..], &[2; 32]);
    }

    #[test]
    fn master_secret_uses_version_prf() {
        let suite = TLS_RSA_WITH_AES_128_CBC_SHA;
        let tls12 =
            ConnectionSecrets::from_key_exchange(&[3; 48], randoms(), suite, ProtocolVersion::TLSv1_2);
        let tls10 =
            ConnectionSecrets::from_key_exchange(&[3; 48], randoms(), suite, ProtocolVersion::TLSv1_0);
        assert_ne!(tls12.master_secret(), tls10.master_secret());

        let mut expect = [0u8; 48];
        suite.prf_provider.for_secret(
            &mut expect,
            &[3; 48],
            b"master secret",
            &randoms().client_first(),
        );
        assert_eq!(tls12.master_secret(), &expect);
    }

    #[test]
    fn resumption_keeps_master_secret() {
        let s = ConnectionSecrets::new_resume(
            randoms(),
            TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_1,
            &[9; 48],
        );
        assert_eq!(s.master_secret(), &[9; 48]);
        assert_eq!(s.suite(), TLS_RSA_WITH_AES_128_CBC_SHA);
    }

    #[test]
    fn verify_data_differs_by_side() {
        let s = ConnectionSecrets::new_resume(
            randoms(),
            TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_2,
            &[9; 48],
        );
        let hash = SHA256.hash(b"transcript");
        assert_ne!(s.client_verify_data(&hash), s.server_verify_data(&hash));
    }

    fn transcript_over(bodies: &[&[u8]]) -> hash::Output {
        use crate::enums::HandshakeType;
        use crate::hash_hs::HandshakeHashBuffer;
        use crate::msgs::base::Payload;
        use crate::msgs::handshake::{HandshakeMessagePayload, HandshakePayload};
        use crate::msgs::message::{Message, MessagePayload};

        let mut buffer = HandshakeHashBuffer::new();
        for body in bodies {
            buffer.add_message(&Message {
                version: ProtocolVersion::TLSv1_2,
                payload: MessagePayload::handshake(HandshakeMessagePayload {
                    typ: HandshakeType::Finished,
                    payload: HandshakePayload::Finished(Payload::new(body.to_vec())),
                }),
            });
        }
        buffer
            .start_hash(&SHA256)
            .get_current_hash()
    }

    #[test]
    fn identical_exchanges_give_identical_finished() {
        let suite = TLS_RSA_WITH_AES_128_CBC_SHA;
        let first =
            ConnectionSecrets::from_key_exchange(&[3; 48], randoms(), suite, ProtocolVersion::TLSv1_2);
        let second =
            ConnectionSecrets::from_key_exchange(&[3; 48], randoms(), suite, ProtocolVersion::TLSv1_2);

        let a = transcript_over(&[b"hello", b"world"]);
        let b = transcript_over(&[b"hello", b"world"]);
        assert_eq!(a.as_ref(), b.as_ref());
        assert_eq!(first.client_verify_data(&a), second.client_verify_data(&b));
        assert_eq!(first.server_verify_data(&a), second.server_verify_data(&b));

        let reordered = transcript_over(&[b"world", b"hello"]);
        assert_ne!(first.client_verify_data(&a), first.client_verify_data(&reordered));
    }

    #[test]
    fn cipher_pair_directions_interoperate() {
        // a server's view of the same key block swaps the directions
        let s = ConnectionSecrets::new_resume(
            randoms(),
            TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_2,
            &[9; 48],
        );
        let (_, mut encrypter) = s.make_cipher_pair(&RANDOM);

        let alg = s.suite().record_alg;
        let shape = alg.key_block_shape();
        let block = s.make_key_block(shape.len());
        let mac = shape.mac_key_len;
        let key = shape.enc_key_len;
        let mut server_reads_client = alg.decrypter(
            DirectionKeys {
                mac_key: &block[..mac],
                enc_key: &block[2 * mac..2 * mac + key],
                iv: &block[2 * (mac + key)..2 * (mac + key) + shape.fixed_iv_len],
            },
            ProtocolVersion::TLSv1_2,
        );

        let sealed = encrypter
            .encrypt(
                BorrowedPlainMessage {
                    typ: ContentType::ApplicationData,
                    version: ProtocolVersion::TLSv1_2,
                    payload: b"hello",
                },
                0,
            )
            .unwrap();
        let opened = server_reads_client
            .decrypt(sealed, 0)
            .unwrap();
        assert_eq!(opened.payload.bytes(), b"hello");
    }
}
