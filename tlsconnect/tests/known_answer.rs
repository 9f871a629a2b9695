//! A full TLS 1.2 RSA key transport handshake with every random input
//! fixed, pinned against values computed outside this crate.

use tlsconnect::client::Resumption;
use tlsconnect::crypto::rust_crypto::TLS_RSA_WITH_AES_128_CBC_SHA;
use tlsconnect::crypto::{CryptoProvider, GetRandomFailed, SecureRandom};
use tlsconnect::version::TLS12;
use tlsconnect::{CipherSuite, ClientConfig, ProtocolVersion};

mod common;
use common::*;

/// Fills every request with the same byte.
#[derive(Debug)]
struct FixedRandom(u8);

impl SecureRandom for FixedRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        buf.fill(self.0);
        Ok(())
    }
}

static CLIENT_RANDOMNESS: FixedRandom = FixedRandom(0x42);

const SERVER_RANDOM: [u8; 32] = [0x53; 32];

// u16 length || RSAES-PKCS1-v1_5(0x0303 || 0x42 * 46), padding string all 0x42
const CLIENT_KEY_EXCHANGE: &str = "\
    0100554c247c043977e09bf5fae47ded1fa94ea36df3db00213d78196a955ba3\
    165eea77005f2b1ee1f93643c1c225642053e9aa2e0a1b3ba22472b46c68e9bc\
    5c3104307b02d61630e6a8c548f00393cdcbd3d030f6a2cc108072b9d1e9c4e2\
    ede101cd814f1a0b07485a9d0d1b3eb7123da956ff12aa7d881723292c4bba0e\
    3d9f60f8be02aaf8410f49551ae396ab2095eab4923fab8febd75ea02d58408d\
    ffca9ac81c73370c43583ee8ff5d7f494ac6308d8f1842c8bc7eff5968824fa3\
    b3bb9ef09437fc9f4a73b2bb2e72b8f3a2f148189afffc46ddb080381805f408\
    2ec04c31b450e10d57f198935db94215ee703dfee6cb479c3f4d8fa0fc2bf4f5\
    db25";

const MASTER_SECRET: &str = "\
    9f96d52c40eea9c9ead3cb7c7adf29df4f084def5471971f94c1e9fd0b06ca19\
    81eb4bbea215b01729d9caf1cf4be7f5";

const CLIENT_VERIFY_DATA: &str = "cb5eb0518f9433922b29f33a";
const SERVER_VERIFY_DATA: &str = "4f2c6d98134a8dc8f387fba6";

#[test]
fn rsa_key_transport_with_fixed_randoms() {
    let provider = CryptoProvider {
        secure_random: &CLIENT_RANDOMNESS,
        ..provider_with_suites(&[TLS_RSA_WITH_AES_128_CBC_SHA])
    };
    let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&TLS12])
        .unwrap()
        .with_root_certificates(root_store())
        .with_no_client_auth();
    config.resumption = Resumption::disabled();
    let config = Arc::new(config);
    let mut client = make_client(&config);

    let mut opts = ServerOptions::new(ProtocolVersion::TLSv1_2, TLS_RSA_WITH_AES_128_CBC_SHA);
    opts.server_random = Some(SERVER_RANDOM);
    opts.issue_session_ids = false;
    let mut pipe = Pipe::with_options(opts);

    do_handshake(&mut client, &mut pipe).unwrap();
    assert!(!client.is_handshaking());

    let hello = pipe.server.client_hello.as_ref().unwrap();
    assert_eq!(hello.client_version, ProtocolVersion::TLSv1_2);
    assert_eq!(hello.random.0, [0x42; 32]);
    assert_eq!(
        hello.cipher_suites,
        vec![
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
            CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV,
        ]
    );

    assert_eq!(pipe.server.client_kx, unhex(CLIENT_KEY_EXCHANGE));
    assert_eq!(
        pipe.server.master_secret().unwrap().to_vec(),
        unhex(MASTER_SECRET)
    );
    assert_eq!(pipe.server.client_verify_data, unhex(CLIENT_VERIFY_DATA));
    assert_eq!(pipe.server.server_verify_data, unhex(SERVER_VERIFY_DATA));
}
