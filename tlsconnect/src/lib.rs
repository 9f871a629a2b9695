//! # tlsconnect - a client-side TLS 1.0-1.2 handshake engine
//!
//! tlsconnect drives the client half of a TLS 1.0, 1.1 or 1.2 handshake
//! over any byte transport, then protects application data with the keys
//! it negotiated.  It speaks the classic suites: RSA key transport, finite
//! field and elliptic curve Diffie-Hellman, pre-shared keys (RFC 4279,
//! RFC 5489) and SRP (RFC 5054).
//!
//! ## Design overview
//!
//! The handshake is a chain of states.  Each state owns what the
//! handshake has learnt so far and consumes itself when it handles a
//! message, producing the next state.  The connection reports which
//! step it is at through [`ClientConnection::handshake_state()`], and a
//! [`client::HandshakeObserver`] can watch every step as it happens.
//!
//! All cryptography is reached through a [`crypto::CryptoProvider`].
//! [`crypto::rust_crypto::default_provider()`] builds one from the
//! RustCrypto crates.
//!
//! ### Non-blocking transports
//!
//! [`ClientConnection::connect`] writes whatever is queued, reads what
//! the transport has, and processes it, until the handshake is done or
//! the transport reports `WouldBlock`.  In the latter case it returns
//! [`client::HandshakeStatus::WantRead`] or
//! [`client::HandshakeStatus::WantWrite`], and the caller retries once the
//! transport is ready.  A handshake suspended this way resumes exactly
//! where it stopped.
//!
//! ### Sessions
//!
//! Completed sessions are cached per server name, and offered again on
//! the next connection to the same name, by session id or by RFC 5077
//! ticket.  See [`client::Resumption`].
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::net::TcpStream;
//! use std::sync::Arc;
//!
//! use tlsconnect::client::HandshakeStatus;
//! use tlsconnect::{ClientConfig, ClientConnection, RootCertStore};
//!
//! let mut root_store = RootCertStore::empty();
//! // add trust anchors here
//! # let _ = &mut root_store;
//!
//! let config = ClientConfig::builder()
//!     .with_safe_default_protocol_versions()
//!     .unwrap()
//!     .with_root_certificates(root_store)
//!     .with_no_client_auth();
//!
//! let name = "example.com".try_into().unwrap();
//! let mut conn = ClientConnection::new(Arc::new(config), name).unwrap();
//! let mut sock = TcpStream::connect("example.com:443").unwrap();
//!
//! while conn.connect(&mut sock).unwrap() != HandshakeStatus::Done {}
//! conn.send_application_data(b"GET / HTTP/1.0\r\n\r\n")
//!     .unwrap();
//! ```
//!
//! ## Crate features
//!
//! - `logging`: this makes tlsconnect depend on the `log` crate.  The
//!   handshake logs at `trace!` and `debug!` level, and protocol errors at
//!   `warn!` and `error!` level.  This feature is on by default.

// Require docs for public APIs, deny unsafe code, etc.
#![forbid(unsafe_code, unused_must_use)]
#![warn(
    clippy::alloc_instead_of_core,
    clippy::clone_on_ref_ptr,
    clippy::use_self,
    trivial_casts,
    trivial_numeric_casts,
    missing_docs,
    unreachable_pub,
    unused_import_braces,
    unused_extern_crates,
    unused_qualifications
)]
// Relax these clippy lints:
// - too_many_arguments: some things just need a lot of state, wrapping it
//   doesn't necessarily make it easier to follow what's going on
// - new_ret_no_self: we sometimes return `Arc<Self>`, which seems fine
// - single_component_path_imports: our top-level `use log` import causes
//   a false positive, https://github.com/rust-lang/rust-clippy/issues/5210
// - new_without_default: for internal constructors, the indirection is not
//   helpful
#![allow(
    clippy::too_many_arguments,
    clippy::new_ret_no_self,
    clippy::ptr_arg,
    clippy::single_component_path_imports,
    clippy::new_without_default
)]
// Enable documentation for all features on docs.rs
#![cfg_attr(docsrs, feature(doc_cfg))]

// log for logging (optional).
#[cfg(feature = "logging")]
use log;

#[cfg(not(feature = "logging"))]
#[macro_use]
mod log {
    macro_rules! trace    ( ($($tt:tt)*) => {{}} );
    macro_rules! debug    ( ($($tt:tt)*) => {{}} );
    macro_rules! warn     ( ($($tt:tt)*) => {{}} );
    macro_rules! error    ( ($($tt:tt)*) => {{}} );
}

#[macro_use]
mod msgs;
#[macro_use]
mod check;
mod conn;
mod error;
mod hash_hs;
mod kx;
mod limited_cache;
mod rand;
mod record_layer;
mod session;
mod tls12;
mod vecbuf;
mod verify;
mod x509;

mod builder;
mod enums;
mod key_log;
mod key_log_file;
mod suites;
mod time_provider;
mod versions;
mod webpki;

/// Internal classes that are used in integration tests.
/// The contents of this section DO NOT form part of the stable interface.
#[allow(missing_docs)]
#[doc(hidden)]
pub mod internal {
    /// Low-level TLS message parsing and encoding functions.
    pub mod msgs {
        pub use crate::msgs::*;
    }
}

// The public interface is:
pub use crate::builder::{ConfigBuilder, ConfigSide, WantsVerifier, WantsVersions};
pub use crate::enums::{
    AlertDescription, CipherSuite, ContentType, HandshakeType, ProtocolVersion,
    SignatureAlgorithm, SignatureScheme,
};
pub use crate::error::{
    ApiMisuse, CertificateError, Error, ErrorCategory, InvalidMessage, OtherError,
    PeerIncompatible, PeerMisbehaved,
};
pub use crate::key_log::{KeyLog, NoKeyLog};
pub use crate::key_log_file::KeyLogFile;
pub use crate::kx::{PskIdentity, ResolvesPskIdentity, SrpCredentials, StaticPskIdentity};
pub use crate::msgs::enums::NamedGroup;
pub use crate::session::{Session, VerifyResult};
pub use crate::suites::{CipherSuiteCommon, SupportedCipherSuite, TlsCipherSuite};
pub use crate::time_provider::{DefaultTimeProvider, TimeProvider};
pub use crate::verify::{
    DigitallySignedStruct, HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    VerifyMode,
};
pub use crate::versions::{SupportedProtocolVersion, ALL_VERSIONS, DEFAULT_VERSIONS};
pub use crate::webpki::{RootCertStore, WebPkiServerVerifier};

/// Items for use in a client.
pub mod client {
    pub(super) mod builder;
    mod client_conn;
    mod common;
    pub(super) mod handy;
    mod hs;
    mod state;
    mod tls12;

    pub use builder::WantsClientCert;
    pub use client_conn::{
        ClientConfig, ClientConnection, ClientSessionStore, HandshakeStatus, Resumption,
        ResolvesClientCert, SessionStats,
    };
    pub(crate) use client_conn::ClientConnectionData;
    pub use handy::ClientSessionMemoryCache;
    pub use state::{HandshakeObserver, HandshakeState};

    /// Dangerous configuration that should be audited and used with extreme care.
    pub mod danger {
        pub use super::builder::danger::DangerousClientConfigBuilder;
        pub use super::client_conn::danger::DangerousClientConfig;
        pub use crate::verify::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    }
}

pub use client::{ClientConfig, ClientConnection};

/// Message signing interfaces and the cryptography behind them.
pub mod crypto;

/// All defined protocol versions appear in this module.
///
/// ALL_VERSIONS is provided as an array of all of these values.
pub mod version {
    pub use crate::versions::{TLS10, TLS11, TLS12};
}

/// Certificate verification using webpki.
pub mod server_verify {
    pub use crate::webpki::{
        verify_server_cert_signed_by_trust_anchor, verify_server_name, ParsedCertificate,
        WebPkiSupportedAlgorithms,
    };
}
