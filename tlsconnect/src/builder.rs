use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::crypto::CryptoProvider;
use crate::error::Error;
use crate::time_provider::TimeProvider;
use crate::versions;

/// A [builder] for [`ClientConfig`] values.
///
/// To get one of these, call [`ClientConfig::builder()`] or
/// [`ClientConfig::builder_with_provider()`].
///
/// To build a config, you must make at least three decisions (in order):
///
/// - Which protocol versions should be negotiated?
/// - How should this client verify the certificates provided by servers?
/// - What certificate, if any, should this client present to servers?
///
/// For settings besides these, see the fields of [`ClientConfig`].
///
/// The usual choice of versions is
/// [`ConfigBuilder::with_safe_default_protocol_versions`], which enables
/// TLS 1.2 only:
///
/// ```
/// # let root_certs = tlsconnect::RootCertStore::empty();
/// let config = tlsconnect::ClientConfig::builder()
///     .with_safe_default_protocol_versions()
///     .unwrap()
///     .with_root_certificates(root_certs)
///     .with_no_client_auth();
/// ```
///
/// Talking to older servers means opting into TLS 1.0 and 1.1.  The
/// enabled versions always form one contiguous range:
///
/// ```
/// # let root_certs = tlsconnect::RootCertStore::empty();
/// use tlsconnect::version::{TLS10, TLS12};
///
/// let config = tlsconnect::ClientConfig::builder()
///     .with_protocol_versions(&[&TLS10, &TLS12])
///     .unwrap()
///     .with_root_certificates(root_certs)
///     .with_no_client_auth();
/// ```
///
/// Choosing versions introduces a `Result` that must be unwrapped, because
/// the config builder checks for consistency of the choices made: it's an
/// error if none of the provider's cipher suites can be used at any of the
/// chosen versions.
///
/// # Certificate configuration
///
/// _Certificate verification_ must be configured by calling one of:
///  - [`ConfigBuilder::with_root_certificates`] or
///  - [`ConfigBuilder::dangerous()`] then `with_custom_certificate_verifier`
///
/// Next, _certificate sending_ (also known as "client authentication") must be
/// configured or disabled using one of:
/// - [`ConfigBuilder::with_no_client_auth`] - to not send client authentication (most common)
/// - [`ConfigBuilder::with_client_auth_cert`] - to always send a specific certificate
/// - [`ConfigBuilder::with_client_cert_resolver`] - to send a certificate chosen dynamically
///
/// # Types
///
/// ConfigBuilder uses the [typestate] pattern to ensure at compile time that each required
/// configuration item is provided exactly once. This is tracked in the `State` type parameter,
/// which can have these values:
///
/// - [`WantsVersions`]
/// - [`WantsVerifier`]
/// - [`WantsClientCert`]
///
/// The other type parameter is `Side`; only [`ClientConfig`] exists.
///
/// [builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
/// [typestate]: http://cliffle.com/blog/rust-typestate/
/// [`ClientConfig`]: crate::ClientConfig
/// [`ClientConfig::builder()`]: crate::ClientConfig::builder()
/// [`ClientConfig::builder_with_provider()`]: crate::ClientConfig::builder_with_provider()
/// [`ConfigBuilder::with_root_certificates`]: ConfigBuilder#method.with_root_certificates
/// [`ConfigBuilder::dangerous()`]: ConfigBuilder#method.dangerous
/// [`ConfigBuilder::with_no_client_auth`]: ConfigBuilder#method.with_no_client_auth
/// [`ConfigBuilder::with_client_auth_cert`]: ConfigBuilder#method.with_client_auth_cert
/// [`ConfigBuilder::with_client_cert_resolver`]: ConfigBuilder#method.with_client_cert_resolver
#[derive(Clone)]
pub struct ConfigBuilder<Side: ConfigSide, State> {
    pub(crate) state: State,
    pub(crate) provider: Arc<CryptoProvider>,
    pub(crate) time_provider: Arc<dyn TimeProvider>,
    pub(crate) side: PhantomData<Side>,
}

impl<Side: ConfigSide, State: fmt::Debug> fmt::Debug for ConfigBuilder<Side, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side_name = std::any::type_name::<Side>();
        let (_, name) = side_name
            .rsplit_once("::")
            .unwrap_or(("", side_name));

        f.debug_struct(&format!("ConfigBuilder<{}, _>", name))
            .field("state", &self.state)
            .finish()
    }
}

impl<Side: ConfigSide, State> ConfigBuilder<Side, State> {
    /// Use `time_provider` instead of the system clock.
    ///
    /// Time is used for certificate validity and session expiry.
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    /// The crypto provider the finished config will use.
    pub fn crypto_provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }
}

/// Config builder state where the caller must supply TLS protocol versions.
///
/// For more information, see the [`ConfigBuilder`] documentation.
#[derive(Clone, Debug)]
pub struct WantsVersions(pub(crate) ());

impl<S: ConfigSide> ConfigBuilder<S, WantsVersions> {
    /// Accept the default protocol versions: TLS 1.2 only.
    pub fn with_safe_default_protocol_versions(
        self,
    ) -> Result<ConfigBuilder<S, WantsVerifier>, Error> {
        self.with_protocol_versions(versions::DEFAULT_VERSIONS)
    }

    /// Use the range of protocol versions spanned by `versions`.
    pub fn with_protocol_versions(
        self,
        versions: &[&'static versions::SupportedProtocolVersion],
    ) -> Result<ConfigBuilder<S, WantsVerifier>, Error> {
        let versions = versions::EnabledVersions::new(versions)
            .ok_or_else(|| Error::General("no protocol versions configured".into()))?;

        let any_usable_suite = self
            .provider
            .cipher_suites
            .iter()
            .any(|suite| suite.usable_for_version(versions.max()));
        if !any_usable_suite {
            return Err(Error::General("no usable cipher suites configured".into()));
        }

        Ok(ConfigBuilder {
            state: WantsVerifier { versions },
            provider: self.provider,
            time_provider: self.time_provider,
            side: self.side,
        })
    }
}

/// Config builder state where the caller must supply a verifier.
///
/// For more information, see the [`ConfigBuilder`] documentation.
#[derive(Clone, Debug)]
pub struct WantsVerifier {
    pub(crate) versions: versions::EnabledVersions,
}

/// Helper trait to abstract [`ConfigBuilder`] over building a [`ClientConfig`].
///
/// [`ClientConfig`]: crate::ClientConfig
pub trait ConfigSide: sealed::Sealed {}

impl ConfigSide for crate::ClientConfig {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::ClientConfig {}
}

#[cfg(test)]
mod tests {
    use crate::crypto::rust_crypto::{default_provider, TLS_RSA_WITH_AES_128_CBC_SHA256};
    use crate::crypto::CryptoProvider;
    use crate::enums::ProtocolVersion;
    use crate::version::{TLS10, TLS11, TLS12};
    use crate::{ClientConfig, Error};
    use std::sync::Arc;

    #[test]
    fn default_versions_are_tls12_only() {
        let builder = ClientConfig::builder()
            .with_safe_default_protocol_versions()
            .unwrap();
        assert!(builder
            .state
            .versions
            .contains(ProtocolVersion::TLSv1_2));
        assert!(!builder
            .state
            .versions
            .contains(ProtocolVersion::TLSv1_1));
    }

    #[test]
    fn no_versions_is_an_error() {
        assert!(ClientConfig::builder()
            .with_protocol_versions(&[])
            .is_err());
    }

    #[test]
    fn suites_must_be_usable() {
        let provider = CryptoProvider {
            cipher_suites: vec![TLS_RSA_WITH_AES_128_CBC_SHA256],
            ..default_provider()
        };

        let err = ClientConfig::builder_with_provider(Arc::new(provider.clone()))
            .with_protocol_versions(&[&TLS10, &TLS11])
            .unwrap_err();
        assert_eq!(err, Error::General("no usable cipher suites configured".into()));

        assert!(ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&[&TLS12])
            .is_ok());
    }

    #[test]
    fn debug_names_the_side() {
        let builder = ClientConfig::builder();
        assert!(format!("{:?}", builder).starts_with("ConfigBuilder<ClientConfig, _>"));
    }
}
