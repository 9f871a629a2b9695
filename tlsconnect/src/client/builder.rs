use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use pki_types::{CertificateDer, PrivateKeyDer};

use super::client_conn::{Resumption, DEFAULT_MAX_CERTIFICATE_LIST_SIZE, DEFAULT_SESSION_TIMEOUT};
use crate::builder::{ConfigBuilder, WantsVerifier};
use crate::client::{handy, ClientConfig, ResolvesClientCert};
use crate::error::Error;
use crate::key_log::NoKeyLog;
use crate::verify::{self, VerifyMode};
use crate::versions;
use crate::webpki::{self, WebPkiServerVerifier};

impl ConfigBuilder<ClientConfig, WantsVerifier> {
    /// Choose how to verify server certificates.
    ///
    /// Server certificates must chain to one of the roots in `root_store`,
    /// be valid at the current time, and name the server.
    pub fn with_root_certificates(
        self,
        root_store: impl Into<Arc<webpki::RootCertStore>>,
    ) -> ConfigBuilder<ClientConfig, WantsClientCert> {
        let verifier = WebPkiServerVerifier::new(root_store, &self.provider);
        self.with_webpki_verifier(Arc::new(verifier))
    }

    /// Choose how to verify server certificates using a webpki verifier.
    ///
    /// This allows, for example, a verifier that asks for stapled OCSP
    /// responses (see [`WebPkiServerVerifier::with_ocsp_requests`]).
    pub fn with_webpki_verifier(
        self,
        verifier: Arc<WebPkiServerVerifier>,
    ) -> ConfigBuilder<ClientConfig, WantsClientCert> {
        ConfigBuilder {
            state: WantsClientCert {
                versions: self.state.versions,
                verifier,
            },
            provider: self.provider,
            time_provider: self.time_provider,
            side: PhantomData,
        }
    }

    /// Access configuration options whose use is dangerous and requires
    /// extra care.
    pub fn dangerous(self) -> danger::DangerousClientConfigBuilder {
        danger::DangerousClientConfigBuilder { cfg: self }
    }
}

/// Container for unsafe APIs
pub(super) mod danger {
    use std::marker::PhantomData;
    use std::sync::Arc;

    use crate::client::WantsClientCert;
    use crate::{verify, ClientConfig, ConfigBuilder, WantsVerifier};

    /// Accessor for dangerous configuration options.
    #[derive(Debug)]
    pub struct DangerousClientConfigBuilder {
        /// The underlying ClientConfigBuilder
        pub cfg: ConfigBuilder<ClientConfig, WantsVerifier>,
    }

    impl DangerousClientConfigBuilder {
        /// Set a custom certificate verifier.
        ///
        /// The verifier is trusted completely: if it accepts a chain, so
        /// does the handshake.
        pub fn with_custom_certificate_verifier(
            self,
            verifier: Arc<dyn verify::ServerCertVerifier>,
        ) -> ConfigBuilder<ClientConfig, WantsClientCert> {
            ConfigBuilder {
                state: WantsClientCert {
                    versions: self.cfg.state.versions,
                    verifier,
                },
                provider: self.cfg.provider,
                time_provider: self.cfg.time_provider,
                side: PhantomData,
            }
        }
    }
}

/// A config builder state where the caller needs to supply whether and how to provide a client
/// certificate.
///
/// For more information, see the [`ConfigBuilder`] documentation.
#[derive(Clone)]
pub struct WantsClientCert {
    versions: versions::EnabledVersions,
    verifier: Arc<dyn verify::ServerCertVerifier>,
}

impl std::fmt::Debug for WantsClientCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WantsClientCert")
            .field("versions", &self.versions)
            .field("verifier", &self.verifier)
            .finish()
    }
}

impl ConfigBuilder<ClientConfig, WantsClientCert> {
    /// Sets a single certificate chain and matching private key for use
    /// in client authentication.
    ///
    /// `cert_chain` is a vector of DER-encoded certificates, end-entity
    /// first.  `key_der` is a DER-encoded private key as PKCS#1, PKCS#8,
    /// or SEC1; RSA and P-256 keys are supported.
    ///
    /// This function fails if `key_der` is invalid or `cert_chain` is empty.
    pub fn with_client_auth_cert(
        self,
        cert_chain: Vec<CertificateDer<'static>>,
        key_der: PrivateKeyDer<'static>,
    ) -> Result<ClientConfig, Error> {
        let resolver =
            handy::AlwaysResolvesClientCert::new(self.provider.key_provider, cert_chain, key_der)?;
        Ok(self.with_client_cert_resolver(Arc::new(resolver)))
    }

    /// Do not support client auth.
    pub fn with_no_client_auth(self) -> ClientConfig {
        self.with_client_cert_resolver(Arc::new(handy::FailResolveClientCert {}))
    }

    /// Sets a custom [`ResolvesClientCert`].
    pub fn with_client_cert_resolver(
        self,
        client_auth_cert_resolver: Arc<dyn ResolvesClientCert>,
    ) -> ClientConfig {
        ClientConfig {
            provider: self.provider,
            resumption: Resumption::default(),
            enable_sni: true,
            verify_mode: VerifyMode::Strict,
            ocsp_stapling: false,
            max_fragment_size: None,
            max_certificate_list_size: DEFAULT_MAX_CERTIFICATE_LIST_SIZE,
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT),
            key_log: Arc::new(NoKeyLog {}),
            psk: None,
            srp: None,
            observer: None,
            client_auth_cert_resolver,
            versions: self.state.versions,
            verifier: self.state.verifier,
            time_provider: self.time_provider,
        }
    }
}
