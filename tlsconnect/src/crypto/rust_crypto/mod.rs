use std::num::NonZeroU32;
use std::sync::Arc;

use pki_types::PrivateKeyDer;
use rand_core::{CryptoRng, RngCore};

use crate::crypto::tls12::{LegacyPrf, PrfUsingHmac};
use crate::crypto::{signer, CryptoProvider, GetRandomFailed, KeyProvider, SecureRandom};
use crate::enums::{CipherSuite, ProtocolVersion};
use crate::error::Error;
use crate::msgs::handshake::KeyExchangeAlgorithm;
use crate::suites::{
    CipherSuiteCommon, SupportedCipherSuite, TlsCipherSuite, TLS12_ECDSA_SCHEMES,
    TLS12_RSA_SCHEMES,
};

mod aead;
mod cbc;
mod ffdhe;
pub(crate) mod hash;
pub(crate) mod hmac;
mod key_transport;
/// Elliptic-curve key exchange groups.
pub mod kx;
mod sign;
mod srp;
mod verify;

pub use kx::ALL_KX_GROUPS;
pub use verify::SUPPORTED_SIG_ALGS;

/// A `CryptoProvider` built on the RustCrypto crates.
///
/// It offers [`DEFAULT_CIPHER_SUITES`]; the anonymous Diffie-Hellman suite
/// is only in [`ALL_CIPHER_SUITES`].
pub fn default_provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: DEFAULT_CIPHER_SUITES.to_vec(),
        kx_groups: ALL_KX_GROUPS.to_vec(),
        finite_field: &ffdhe::FiniteField,
        key_transport: &key_transport::RsaPkcs1KeyTransport,
        srp: &srp::SrpSha1,
        signature_verification_algorithms: SUPPORTED_SIG_ALGS,
        secure_random: &Provider,
        key_provider: &Provider,
    }
}

#[derive(Debug)]
struct Provider;

impl SecureRandom for Provider {
    fn fill(&self, bytes: &mut [u8]) -> Result<(), GetRandomFailed> {
        rand_core::OsRng
            .try_fill_bytes(bytes)
            .map_err(|_| GetRandomFailed)
    }
}

impl KeyProvider for Provider {
    fn load_private_key(
        &self,
        key_der: PrivateKeyDer<'static>,
    ) -> Result<Arc<dyn signer::SigningKey>, Error> {
        sign::any_supported_type(&key_der)
    }
}

const RNG_FAILURE: NonZeroU32 = match NonZeroU32::new(rand_core::Error::CUSTOM_START) {
    Some(code) => code,
    None => panic!("rand_core custom error codes start above zero"),
};

/// Presents a [`SecureRandom`] as a `rand_core` generator.
///
/// RustCrypto key generation cannot report randomness failures through
/// an infallible `fill_bytes`, so failures are remembered and must be
/// collected with [`RandAdapter::check()`] after use.
pub(crate) struct RandAdapter<'a> {
    source: &'a dyn SecureRandom,
    failed: bool,
}

impl<'a> RandAdapter<'a> {
    pub(crate) fn new(source: &'a dyn SecureRandom) -> Self {
        Self {
            source,
            failed: false,
        }
    }

    /// Report whether any random request failed.
    pub(crate) fn check(&self) -> Result<(), Error> {
        match self.failed {
            true => Err(Error::FailedToGetRandomBytes),
            false => Ok(()),
        }
    }
}

impl RngCore for RandAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.source.fill(dest).is_err() {
            self.failed = true;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.source.fill(dest).map_err(|_| {
            self.failed = true;
            rand_core::Error::from(RNG_FAILURE)
        })
    }
}

impl CryptoRng for RandAdapter<'_> {}

static SHA256_PRF: PrfUsingHmac<'static> = PrfUsingHmac(&hmac::HMAC_SHA256);

static MD5_SHA1_PRF: LegacyPrf<'static> = LegacyPrf {
    md5: &hmac::HMAC_MD5,
    sha1: &hmac::HMAC_SHA1,
};

static AES_128_CBC_SHA: cbc::AesCbc = cbc::AesCbc {
    key_len: 16,
    hmac: &hmac::HMAC_SHA1,
};

static AES_256_CBC_SHA: cbc::AesCbc = cbc::AesCbc {
    key_len: 32,
    hmac: &hmac::HMAC_SHA1,
};

static AES_128_CBC_SHA256: cbc::AesCbc = cbc::AesCbc {
    key_len: 16,
    hmac: &hmac::HMAC_SHA256,
};

/// Every suite this provider implements, in preference order.
pub static ALL_CIPHER_SUITES: &[SupportedCipherSuite] = &[
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_128_CBC_SHA256,
    TLS_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_256_CBC_SHA,
    TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_DHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_PSK_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
    TLS_DH_ANON_WITH_AES_128_CBC_SHA,
];

/// The suites offered by default: all of them except anonymous
/// Diffie-Hellman.
///
/// PSK and SRP suites are still only offered when the client is
/// configured with the matching credentials.
pub static DEFAULT_CIPHER_SUITES: &[SupportedCipherSuite] = &[
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_128_CBC_SHA256,
    TLS_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_256_CBC_SHA,
    TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_DHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_PSK_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
];

macro_rules! tls_suite {
    ($name:ident, $suite:ident, $kx:ident, $sign:expr, $min:ident, $record:expr) => {
        #[doc = concat!("The `", stringify!($suite), "` cipher suite.")]
        pub static $name: SupportedCipherSuite = &TlsCipherSuite {
            common: CipherSuiteCommon {
                suite: CipherSuite::$suite,
                hash_provider: &hash::SHA256,
            },
            kx: KeyExchangeAlgorithm::$kx,
            sign: $sign,
            min_version: ProtocolVersion::$min,
            prf_provider: &SHA256_PRF,
            legacy_prf_provider: &MD5_SHA1_PRF,
            legacy_hash_provider: &hash::Md5Sha1,
            record_alg: $record,
        };
    };
}

tls_suite!(
    TLS_RSA_WITH_AES_128_CBC_SHA,
    TLS_RSA_WITH_AES_128_CBC_SHA,
    RSA,
    TLS12_RSA_SCHEMES,
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_RSA_WITH_AES_256_CBC_SHA,
    TLS_RSA_WITH_AES_256_CBC_SHA,
    RSA,
    TLS12_RSA_SCHEMES,
    TLSv1_0,
    &AES_256_CBC_SHA
);

tls_suite!(
    TLS_RSA_WITH_AES_128_CBC_SHA256,
    TLS_RSA_WITH_AES_128_CBC_SHA256,
    RSA,
    TLS12_RSA_SCHEMES,
    TLSv1_2,
    &AES_128_CBC_SHA256
);

tls_suite!(
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    DHE,
    TLS12_RSA_SCHEMES,
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_DH_ANON_WITH_AES_128_CBC_SHA,
    TLS_DH_anon_WITH_AES_128_CBC_SHA,
    DH_anon,
    &[],
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    ECDHE,
    TLS12_ECDSA_SCHEMES,
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    ECDHE,
    TLS12_RSA_SCHEMES,
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ECDHE,
    TLS12_RSA_SCHEMES,
    TLSv1_2,
    &aead::Chacha20Poly1305
);

tls_suite!(
    TLS_PSK_WITH_AES_128_CBC_SHA,
    TLS_PSK_WITH_AES_128_CBC_SHA,
    PSK,
    &[],
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_DHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_DHE_PSK_WITH_AES_128_CBC_SHA,
    DHE_PSK,
    &[],
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA,
    TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA,
    ECDHE_PSK,
    &[],
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
    SRP,
    &[],
    TLSv1_0,
    &AES_128_CBC_SHA
);

tls_suite!(
    TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA,
    TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA,
    SRP,
    TLS12_RSA_SCHEMES,
    TLSv1_0,
    &AES_128_CBC_SHA
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_suite_is_not_offered_by_default() {
        let provider = default_provider();
        assert!(!provider
            .cipher_suites
            .iter()
            .any(|s| s.common.suite == CipherSuite::TLS_DH_anon_WITH_AES_128_CBC_SHA));
        assert_eq!(provider.cipher_suites.len() + 1, ALL_CIPHER_SUITES.len());
    }

    #[test]
    fn only_chacha_and_sha256_suites_need_tls12() {
        let tls12_only = ALL_CIPHER_SUITES
            .iter()
            .filter(|s| !s.usable_for_version(ProtocolVersion::TLSv1_1))
            .map(|s| s.common.suite)
            .collect::<Vec<_>>();
        assert_eq!(
            tls12_only,
            vec![
                CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
                CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256,
            ]
        );
    }

    #[test]
    fn rand_adapter_remembers_failure() {
        let mut rng = RandAdapter::new(&test_provider::FailingRandom);
        let mut buf = [0u8; 4];
        rng.fill_bytes(&mut buf);
        assert_eq!(rng.check(), Err(Error::FailedToGetRandomBytes));

        let mut rng = RandAdapter::new(&test_provider::FixedRandom(9));
        assert!(rng.try_fill_bytes(&mut buf).is_ok());
        assert_eq!(buf, [9; 4]);
        assert!(rng.check().is_ok());
    }
}
