#![allow(non_camel_case_types)]
use std::collections;
use std::fmt;

use pki_types::{CertificateDer, DnsName};

use crate::crypto::SecureRandom;
use crate::enums::{CipherSuite, HandshakeType, ProtocolVersion, SignatureScheme};
use crate::error::InvalidMessage;
#[cfg(feature = "logging")]
use crate::log::warn;
use crate::msgs::base::{Payload, PayloadU16, PayloadU24, PayloadU8};
use crate::msgs::codec::{self, Codec, LengthPrefixedBuffer, ListLength, Reader, TlsListElement};
use crate::msgs::enums::{
    CertificateStatusType, ClientCertificateType, Compression, ECCurveType, ECPointFormat,
    ExtensionType, NamedGroup, ServerNameType,
};
use crate::rand;
use crate::verify::DigitallySignedStruct;

/// Create a newtype wrapper around a given type.
///
/// This is used to create newtypes for the various TLS message types which is used to wrap
/// the `PayloadU8` or `PayloadU16` types. This is typically used for types where we don't need
/// anything other than access to the underlying bytes.
macro_rules! wrapped_payload(
  ($(#[$comment:meta])* $vis:vis struct $name:ident, $inner:ident,) => {
    $(#[$comment])*
    #[derive(Clone, Debug, PartialEq)]
    $vis struct $name($inner);

    impl From<Vec<u8>> for $name {
        fn from(v: Vec<u8>) -> Self {
            Self($inner::new(v))
        }
    }

    impl AsRef<[u8]> for $name {
        fn as_ref(&self) -> &[u8] {
            self.0.0.as_slice()
        }
    }

    impl Codec<'_> for $name {
        fn encode(&self, bytes: &mut Vec<u8>) {
            self.0.encode(bytes);
        }

        fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
            Ok(Self($inner::read(r)?))
        }
    }
  }
);

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Random(pub [u8; 32]);

impl fmt::Debug for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::base::hex(f, &self.0)
    }
}

static ZERO_RANDOM: Random = Random([0u8; 32]);

impl Codec<'_> for Random {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let bytes = r.read_opaque(32, "Random")?;
        let mut opaque = [0; 32];
        opaque.clone_from_slice(bytes);
        Ok(Self(opaque))
    }
}

impl Random {
    pub fn new(secure_random: &dyn SecureRandom) -> Result<Self, rand::GetRandomFailed> {
        Ok(Self(rand::random_array(secure_random)?))
    }
}

impl From<[u8; 32]> for Random {
    #[inline]
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[derive(Copy, Clone)]
pub struct SessionId {
    len: usize,
    data: [u8; 32],
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::base::hex(f, &self.data[..self.len])
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }

        let mut diff = 0u8;
        for i in 0..self.len {
            diff |= self.data[i] ^ other.data[i];
        }

        diff == 0u8
    }
}

impl Codec<'_> for SessionId {
    fn encode(&self, bytes: &mut Vec<u8>) {
        debug_assert!(self.len <= 32);
        bytes.push(self.len as u8);
        bytes.extend_from_slice(self.as_ref());
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let len = u8::read(r)? as usize;
        if len > 32 {
            return Err(InvalidMessage::TrailingData("SessionID"));
        }

        let bytes = r.read_opaque(len, "SessionID")?;
        let mut out = [0u8; 32];
        out[..len].clone_from_slice(bytes);
        Ok(Self { data: out, len })
    }
}

impl SessionId {
    pub fn random(secure_random: &dyn SecureRandom) -> Result<Self, rand::GetRandomFailed> {
        let data = rand::random_array(secure_random)?;
        Ok(Self { data, len: 32 })
    }

    pub fn empty() -> Self {
        Self {
            data: [0u8; 32],
            len: 0,
        }
    }

    /// Build a session id from at most 32 bytes of `bytes`.
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(32);
        let mut data = [0u8; 32];
        data[..len].copy_from_slice(&bytes[..len]);
        Self { data, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Clone, Debug)]
pub struct UnknownExtension {
    pub typ: ExtensionType,
    pub payload: Payload<'static>,
}

impl UnknownExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.payload.encode(bytes);
    }

    fn read(typ: ExtensionType, r: &mut Reader<'_>) -> Self {
        let payload = Payload::read(r).into_owned();
        Self { typ, payload }
    }
}

#[derive(Clone, Debug)]
pub enum ServerNamePayload {
    HostName(DnsName<'static>),
    Unknown(Payload<'static>),
}

impl ServerNamePayload {
    fn read_hostname(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let raw = PayloadU16::read(r)?;
        let name = String::from_utf8(raw.0).map_err(|_| InvalidMessage::InvalidServerName)?;
        match DnsName::try_from(name) {
            Ok(dns_name) => Ok(Self::HostName(dns_name)),
            Err(_) => {
                warn!("Illegal SNI hostname received");
                Err(InvalidMessage::InvalidServerName)
            }
        }
    }

    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Self::HostName(name) => {
                PayloadU16::encode_slice(name.as_ref().as_bytes(), bytes);
            }
            Self::Unknown(r) => r.encode(bytes),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerName {
    pub typ: ServerNameType,
    pub payload: ServerNamePayload,
}

impl Codec<'_> for ServerName {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.typ.encode(bytes);
        self.payload.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ServerNameType::read(r)?;

        let payload = match typ {
            ServerNameType::HostName => ServerNamePayload::read_hostname(r)?,
            _ => ServerNamePayload::Unknown(Payload::read(r).into_owned()),
        };

        Ok(Self { typ, payload })
    }
}

impl TlsListElement for ServerName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// The body of a `status_request` extension: OCSP with no responder ids
/// and no request extensions.
#[derive(Clone, Debug, Default)]
pub struct OcspCertificateStatusRequest {
    pub responder_ids: PayloadU16,
    pub extensions: PayloadU16,
}

impl Codec<'_> for OcspCertificateStatusRequest {
    fn encode(&self, bytes: &mut Vec<u8>) {
        CertificateStatusType::OCSP.encode(bytes);
        self.responder_ids.encode(bytes);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        match CertificateStatusType::read(r)? {
            CertificateStatusType::OCSP => Ok(Self {
                responder_ids: PayloadU16::read(r)?,
                extensions: PayloadU16::read(r)?,
            }),
            _ => Err(InvalidMessage::InvalidCertificateStatusType),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ClientSessionTicket {
    Request,
    Offer(Payload<'static>),
}

#[derive(Clone, Debug)]
pub enum ClientExtension {
    ServerName(Vec<ServerName>),
    NamedGroups(Vec<NamedGroup>),
    ECPointFormats(Vec<ECPointFormat>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    SessionTicket(ClientSessionTicket),
    CertificateStatusRequest(OcspCertificateStatusRequest),
    SrpUserName(PayloadU8),
    Unknown(UnknownExtension),
}

impl ClientExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::ServerName(_) => ExtensionType::ServerName,
            Self::NamedGroups(_) => ExtensionType::EllipticCurves,
            Self::ECPointFormats(_) => ExtensionType::ECPointFormats,
            Self::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            Self::SessionTicket(_) => ExtensionType::SessionTicket,
            Self::CertificateStatusRequest(_) => ExtensionType::StatusRequest,
            Self::SrpUserName(_) => ExtensionType::SRP,
            Self::Unknown(r) => r.typ,
        }
    }

    /// Make a basic SNI ServerNameRequest quoting `dns_name`.
    pub fn make_sni(dns_name: &DnsName<'_>) -> Self {
        // RFC6066: "The hostname is represented as a byte string using
        // ASCII encoding without a trailing dot"
        let name = dns_name.as_ref();
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        let payload = match DnsName::try_from(trimmed.to_string()) {
            Ok(dns_name) => ServerNamePayload::HostName(dns_name),
            Err(_) => ServerNamePayload::HostName(dns_name.to_owned()),
        };

        Self::ServerName(vec![ServerName {
            typ: ServerNameType::HostName,
            payload,
        }])
    }
}

impl Codec<'_> for ClientExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::ServerName(r) => r.encode(nested.buf),
            Self::NamedGroups(r) => r.encode(nested.buf),
            Self::ECPointFormats(r) => r.encode(nested.buf),
            Self::SignatureAlgorithms(r) => r.encode(nested.buf),
            Self::SessionTicket(ClientSessionTicket::Request) => {}
            Self::SessionTicket(ClientSessionTicket::Offer(r)) => r.encode(nested.buf),
            Self::CertificateStatusRequest(r) => r.encode(nested.buf),
            Self::SrpUserName(r) => r.encode(nested.buf),
            Self::Unknown(r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = u16::read(r)? as usize;
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::ServerName => Self::ServerName(Vec::read(&mut sub)?),
            ExtensionType::EllipticCurves => Self::NamedGroups(Vec::read(&mut sub)?),
            ExtensionType::ECPointFormats => Self::ECPointFormats(Vec::read(&mut sub)?),
            ExtensionType::SignatureAlgorithms => Self::SignatureAlgorithms(Vec::read(&mut sub)?),
            ExtensionType::SessionTicket => {
                if sub.any_left() {
                    let contents = Payload::read(&mut sub).into_owned();
                    Self::SessionTicket(ClientSessionTicket::Offer(contents))
                } else {
                    Self::SessionTicket(ClientSessionTicket::Request)
                }
            }
            ExtensionType::StatusRequest => {
                Self::CertificateStatusRequest(OcspCertificateStatusRequest::read(&mut sub)?)
            }
            ExtensionType::SRP => Self::SrpUserName(PayloadU8::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ClientExtension")
            .map(|_| ext)
    }
}

impl TlsListElement for ClientExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub enum ServerExtension {
    ECPointFormats(Vec<ECPointFormat>),
    ServerNameAck,
    SessionTicketAck,
    RenegotiationInfo(PayloadU8),
    CertificateStatusAck,
    Unknown(UnknownExtension),
}

impl ServerExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::ECPointFormats(_) => ExtensionType::ECPointFormats,
            Self::ServerNameAck => ExtensionType::ServerName,
            Self::SessionTicketAck => ExtensionType::SessionTicket,
            Self::RenegotiationInfo(_) => ExtensionType::RenegotiationInfo,
            Self::CertificateStatusAck => ExtensionType::StatusRequest,
            Self::Unknown(r) => r.typ,
        }
    }

    pub fn make_empty_renegotiation_info() -> Self {
        Self::RenegotiationInfo(PayloadU8::empty())
    }
}

impl Codec<'_> for ServerExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::ECPointFormats(r) => r.encode(nested.buf),
            Self::ServerNameAck | Self::SessionTicketAck | Self::CertificateStatusAck => {}
            Self::RenegotiationInfo(r) => r.encode(nested.buf),
            Self::Unknown(r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = u16::read(r)? as usize;
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::ECPointFormats => Self::ECPointFormats(Vec::read(&mut sub)?),
            ExtensionType::ServerName => Self::ServerNameAck,
            ExtensionType::SessionTicket => Self::SessionTicketAck,
            ExtensionType::StatusRequest => Self::CertificateStatusAck,
            ExtensionType::RenegotiationInfo => Self::RenegotiationInfo(PayloadU8::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ServerExtension")
            .map(|_| ext)
    }
}

impl TlsListElement for ServerExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub struct ClientHelloPayload {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<Compression>,
    pub extensions: Vec<ClientExtension>,
}

impl Codec<'_> for ClientHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.client_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suites.encode(bytes);
        self.compression_methods.encode(bytes);

        if !self.extensions.is_empty() {
            self.extensions.encode(bytes);
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let mut ret = Self {
            client_version: ProtocolVersion::read(r)?,
            random: Random::read(r)?,
            session_id: SessionId::read(r)?,
            cipher_suites: Vec::read(r)?,
            compression_methods: Vec::read(r)?,
            extensions: Vec::new(),
        };

        if r.any_left() {
            ret.extensions = Vec::read(r)?;
        }

        r.expect_empty("ClientHelloPayload")
            .map(|_| ret)
    }
}

impl ClientHelloPayload {
    pub fn find_extension(&self, ext: ExtensionType) -> Option<&ClientExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == ext)
    }

    pub fn sni_extension(&self) -> Option<&[ServerName]> {
        match self.find_extension(ExtensionType::ServerName)? {
            ClientExtension::ServerName(req) => Some(req),
            _ => None,
        }
    }

    pub fn ticket_extension(&self) -> Option<&ClientSessionTicket> {
        match self.find_extension(ExtensionType::SessionTicket)? {
            ClientExtension::SessionTicket(t) => Some(t),
            _ => None,
        }
    }

    pub fn sigalgs_extension(&self) -> Option<&[SignatureScheme]> {
        match self.find_extension(ExtensionType::SignatureAlgorithms)? {
            ClientExtension::SignatureAlgorithms(req) => Some(req),
            _ => None,
        }
    }

    pub fn namedgroups_extension(&self) -> Option<&[NamedGroup]> {
        match self.find_extension(ExtensionType::EllipticCurves)? {
            ClientExtension::NamedGroups(req) => Some(req),
            _ => None,
        }
    }

    pub fn srp_user_extension(&self) -> Option<&[u8]> {
        match self.find_extension(ExtensionType::SRP)? {
            ClientExtension::SrpUserName(name) => Some(&name.0),
            _ => None,
        }
    }

    pub fn has_duplicate_extension(&self) -> bool {
        let mut seen = collections::HashSet::new();

        for ext in &self.extensions {
            let typ = u16::from(ext.ext_type());

            if seen.contains(&typ) {
                return true;
            }
            seen.insert(typ);
        }

        false
    }
}

#[derive(Clone, Debug)]
pub struct ServerHelloPayload {
    pub server_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub compression_method: Compression,
    pub extensions: Vec<ServerExtension>,
}

impl Codec<'_> for ServerHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.server_version.encode(bytes);
        self.random.encode(bytes);

        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        self.compression_method.encode(bytes);

        if !self.extensions.is_empty() {
            self.extensions.encode(bytes);
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let server_version = ProtocolVersion::read(r)?;
        let random = Random::read(r)?;
        let session_id = SessionId::read(r)?;
        let suite = CipherSuite::read(r)?;
        let compression = Compression::read(r)?;

        // RFC5246:
        // "The presence of extensions can be detected by determining whether
        //  there are bytes following the compression_method field at the end of
        //  the ServerHello."
        let extensions = if r.any_left() { Vec::read(r)? } else { vec![] };

        let ret = Self {
            server_version,
            random,
            session_id,
            cipher_suite: suite,
            compression_method: compression,
            extensions,
        };

        r.expect_empty("ServerHelloPayload")
            .map(|_| ret)
    }
}

impl ServerHelloPayload {
    pub fn find_extension(&self, ext: ExtensionType) -> Option<&ServerExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == ext)
    }

    /// Returns true if there is more than one extension of a given
    /// type.
    pub fn has_duplicate_extension(&self) -> bool {
        let mut seen = collections::HashSet::new();

        for ext in &self.extensions {
            let typ = u16::from(ext.ext_type());

            if seen.contains(&typ) {
                return true;
            }
            seen.insert(typ);
        }

        false
    }

    pub fn ecpoints_extension(&self) -> Option<&[ECPointFormat]> {
        match self.find_extension(ExtensionType::ECPointFormats)? {
            ServerExtension::ECPointFormats(fmts) => Some(fmts),
            _ => None,
        }
    }

    pub fn renegotiation_info(&self) -> Option<&[u8]> {
        match self.find_extension(ExtensionType::RenegotiationInfo)? {
            ServerExtension::RenegotiationInfo(info) => Some(&info.0),
            _ => None,
        }
    }

    pub fn ticket_acked(&self) -> bool {
        self.find_extension(ExtensionType::SessionTicket)
            .is_some()
    }

    pub fn status_acked(&self) -> bool {
        self.find_extension(ExtensionType::StatusRequest)
            .is_some()
    }
}

/// Certificate chains larger than this are never decoded, whatever the
/// configured limit.
pub(crate) const CERTIFICATE_MAX_SIZE_LIMIT: usize = 0x10_0000;

impl TlsListElement for CertificateDer<'_> {
    const SIZE_LEN: ListLength = ListLength::U24 {
        max: CERTIFICATE_MAX_SIZE_LIMIT,
        error: InvalidMessage::CertificatePayloadTooLarge,
    };
}

/// A leaf-first certificate chain as carried in the Certificate message.
#[derive(Clone, Debug, Default)]
pub struct CertificatePayload(pub Vec<CertificateDer<'static>>);

impl Codec<'_> for CertificatePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self(
            Vec::<CertificateDer<'_>>::read(r)?
                .into_iter()
                .map(|cert| cert.into_owned())
                .collect(),
        ))
    }
}

/// The key exchange a cipher suite runs before its Finished messages.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyExchangeAlgorithm {
    /// RSA key transport to the certificate key.
    RSA,
    /// Ephemeral finite-field Diffie-Hellman, signed.
    DHE,
    /// Ephemeral finite-field Diffie-Hellman, unauthenticated.
    DH_anon,
    /// Ephemeral elliptic-curve Diffie-Hellman, signed.
    ECDHE,
    /// Plain pre-shared key.
    PSK,
    /// Pre-shared key mixed with ephemeral finite-field Diffie-Hellman.
    DHE_PSK,
    /// Pre-shared key mixed with ephemeral elliptic-curve Diffie-Hellman.
    ECDHE_PSK,
    /// Secure Remote Password.
    SRP,
}

// We don't support arbitrary curves.  It's a terrible
// idea and unnecessary attack surface.  Please,
// get a grip.
#[derive(Debug)]
pub struct EcParameters {
    pub curve_type: ECCurveType,
    pub named_group: NamedGroup,
}

impl Codec<'_> for EcParameters {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.curve_type.encode(bytes);
        self.named_group.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let ct = ECCurveType::read(r)?;
        if ct != ECCurveType::NamedCurve {
            return Err(InvalidMessage::UnsupportedCurveType);
        }

        let grp = NamedGroup::read(r)?;

        Ok(Self {
            curve_type: ct,
            named_group: grp,
        })
    }
}

#[derive(Debug)]
pub struct ServerEcdhParams {
    pub curve_params: EcParameters,
    pub public: PayloadU8,
}

impl ServerEcdhParams {
    pub fn new(named_group: NamedGroup, pubkey: &[u8]) -> Self {
        Self {
            curve_params: EcParameters {
                curve_type: ECCurveType::NamedCurve,
                named_group,
            },
            public: PayloadU8::new(pubkey.to_vec()),
        }
    }
}

impl Codec<'_> for ServerEcdhParams {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.curve_params.encode(bytes);
        self.public.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let cp = EcParameters::read(r)?;
        let pb = PayloadU8::read(r)?;

        Ok(Self {
            curve_params: cp,
            public: pb,
        })
    }
}

#[derive(Debug)]
#[allow(non_snake_case)]
pub struct ServerDhParams {
    pub dh_p: PayloadU16,
    pub dh_g: PayloadU16,
    pub dh_Ys: PayloadU16,
}

impl ServerDhParams {
    pub fn new(p: &[u8], g: &[u8], ys: &[u8]) -> Self {
        Self {
            dh_p: PayloadU16::new(p.to_vec()),
            dh_g: PayloadU16::new(g.to_vec()),
            dh_Ys: PayloadU16::new(ys.to_vec()),
        }
    }
}

impl Codec<'_> for ServerDhParams {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.dh_p.encode(bytes);
        self.dh_g.encode(bytes);
        self.dh_Ys.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let dh_p = PayloadU16::read(r)?;
        let dh_g = PayloadU16::read(r)?;
        let dh_ys = PayloadU16::read(r)?;
        if dh_p.0.is_empty() || dh_g.0.is_empty() || dh_ys.0.is_empty() {
            return Err(InvalidMessage::InvalidDhParams);
        }

        Ok(Self {
            dh_p,
            dh_g,
            dh_Ys: dh_ys,
        })
    }
}

/// RFC 5054 ServerSRPParams.
#[derive(Debug)]
pub struct ServerSrpParams {
    pub n: PayloadU16,
    pub g: PayloadU16,
    pub salt: PayloadU8,
    pub b: PayloadU16,
}

impl Codec<'_> for ServerSrpParams {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.n.encode(bytes);
        self.g.encode(bytes);
        self.salt.encode(bytes);
        self.b.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let ret = Self {
            n: PayloadU16::read(r)?,
            g: PayloadU16::read(r)?,
            salt: PayloadU8::read(r)?,
            b: PayloadU16::read(r)?,
        };

        if ret.n.0.is_empty() || ret.g.0.is_empty() || ret.b.0.is_empty() {
            return Err(InvalidMessage::InvalidSrpParams);
        }

        Ok(ret)
    }
}

/// The server's raw ServerKeyExchange body.
///
/// Its layout depends on the key exchange, so it is parsed by the
/// key exchange strategy once the suite is known.
#[derive(Clone, Debug)]
pub struct ServerKeyExchangePayload(pub Payload<'static>);

impl Codec<'_> for ServerKeyExchangePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self(Payload::read(r).into_owned()))
    }
}

wrapped_payload!(
    /// A `DistinguishedName` is a `Vec<u8>` wrapped in internal types.
    ///
    /// It contains the DER or BER encoded [`Subject` field from RFC 5280](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.6)
    /// for a single certificate. The Subject field is [encoded as an RFC 5280 `Name`](https://datatracker.ietf.org/doc/html/rfc5280#page-116).
    /// It can be decoded using [x509-parser's FromDer trait](https://docs.rs/x509-parser/latest/x509_parser/prelude/trait.FromDer.html).
    pub struct DistinguishedName,
    PayloadU16,
);

impl TlsListElement for DistinguishedName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub struct CertificateRequestPayload {
    pub certtypes: Vec<ClientCertificateType>,
    /// Present from TLS 1.2 onward.
    pub sigschemes: Option<Vec<SignatureScheme>>,
    pub canames: Vec<DistinguishedName>,
}

impl Codec<'_> for CertificateRequestPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.certtypes.encode(bytes);
        if let Some(sigschemes) = &self.sigschemes {
            sigschemes.encode(bytes);
        }
        self.canames.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Self::read_version(r, ProtocolVersion::TLSv1_2)
    }
}

impl CertificateRequestPayload {
    pub fn read_version(r: &mut Reader<'_>, vers: ProtocolVersion) -> Result<Self, InvalidMessage> {
        let certtypes = Vec::read(r)?;
        let sigschemes = match vers {
            ProtocolVersion::TLSv1_2 => {
                let sigschemes: Vec<SignatureScheme> = Vec::read(r)?;
                if sigschemes.is_empty() {
                    warn!("meaningless CertificateRequest message");
                    return Err(InvalidMessage::NoSignatureSchemes);
                }
                Some(sigschemes)
            }
            _ => None,
        };
        let canames = Vec::read(r)?;

        Ok(Self {
            certtypes,
            sigschemes,
            canames,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewSessionTicketPayload {
    pub lifetime_hint: u32,
    pub ticket: PayloadU16,
}

impl NewSessionTicketPayload {
    pub fn new(lifetime_hint: u32, ticket: Vec<u8>) -> Self {
        Self {
            lifetime_hint,
            ticket: PayloadU16::new(ticket),
        }
    }
}

impl Codec<'_> for NewSessionTicketPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.lifetime_hint.encode(bytes);
        self.ticket.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let lifetime = u32::read(r)?;
        let ticket = PayloadU16::read(r)?;

        Ok(Self {
            lifetime_hint: lifetime,
            ticket,
        })
    }
}

/// Only supports OCSP
#[derive(Clone, Debug)]
pub struct CertificateStatus {
    pub ocsp_response: PayloadU24,
}

impl Codec<'_> for CertificateStatus {
    fn encode(&self, bytes: &mut Vec<u8>) {
        CertificateStatusType::OCSP.encode(bytes);
        self.ocsp_response.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = CertificateStatusType::read(r)?;

        match typ {
            CertificateStatusType::OCSP => Ok(Self {
                ocsp_response: PayloadU24::read(r)?,
            }),
            _ => Err(InvalidMessage::InvalidCertificateStatusType),
        }
    }
}

impl CertificateStatus {
    pub fn new(ocsp: Vec<u8>) -> Self {
        Self {
            ocsp_response: PayloadU24::new(ocsp),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.ocsp_response.0
    }
}

#[derive(Clone, Debug)]
pub enum HandshakePayload {
    HelloRequest,
    ClientHello(ClientHelloPayload),
    ServerHello(ServerHelloPayload),
    Certificate(CertificatePayload),
    CertificateStatus(CertificateStatus),
    ServerKeyExchange(ServerKeyExchangePayload),
    CertificateRequest(CertificateRequestPayload),
    ServerHelloDone,
    CertificateVerify(DigitallySignedStruct),
    /// A CertificateVerify before TLS 1.2: the signature alone.
    LegacyCertificateVerify(PayloadU16),
    ClientKeyExchange(Payload<'static>),
    NewSessionTicket(NewSessionTicketPayload),
    Finished(Payload<'static>),
    Unknown(Payload<'static>),
}

impl HandshakePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        use self::HandshakePayload::*;
        match self {
            HelloRequest | ServerHelloDone => {}
            ClientHello(x) => x.encode(bytes),
            ServerHello(x) => x.encode(bytes),
            Certificate(x) => x.encode(bytes),
            CertificateStatus(x) => x.encode(bytes),
            ServerKeyExchange(x) => x.encode(bytes),
            CertificateRequest(x) => x.encode(bytes),
            CertificateVerify(x) => x.encode(bytes),
            LegacyCertificateVerify(x) => x.encode(bytes),
            ClientKeyExchange(x) => x.encode(bytes),
            NewSessionTicket(x) => x.encode(bytes),
            Finished(x) => x.encode(bytes),
            Unknown(x) => x.encode(bytes),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandshakeMessagePayload {
    pub typ: HandshakeType,
    pub payload: HandshakePayload,
}

impl Codec<'_> for HandshakeMessagePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        // output type, length, and encoded payload
        self.typ.encode(bytes);

        let nested = LengthPrefixedBuffer::new(
            ListLength::U24 {
                max: usize::MAX,
                error: InvalidMessage::MessageTooLarge,
            },
            bytes,
        );
        self.payload.encode(nested.buf);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Self::read_version(r, ProtocolVersion::TLSv1_2)
    }
}

impl HandshakeMessagePayload {
    /// Decode a handshake message whose body layout depends on the
    /// negotiated version `vers`.
    pub fn read_version(r: &mut Reader<'_>, vers: ProtocolVersion) -> Result<Self, InvalidMessage> {
        let typ = HandshakeType::read(r)?;
        let len = codec::u24::read(r)?.0 as usize;
        let mut sub = r.sub(len)?;

        let payload = match typ {
            HandshakeType::HelloRequest if sub.left() == 0 => HandshakePayload::HelloRequest,
            HandshakeType::ClientHello => {
                HandshakePayload::ClientHello(ClientHelloPayload::read(&mut sub)?)
            }
            HandshakeType::ServerHello => {
                HandshakePayload::ServerHello(ServerHelloPayload::read(&mut sub)?)
            }
            HandshakeType::Certificate => {
                HandshakePayload::Certificate(CertificatePayload::read(&mut sub)?)
            }
            HandshakeType::CertificateStatus => {
                HandshakePayload::CertificateStatus(CertificateStatus::read(&mut sub)?)
            }
            HandshakeType::ServerKeyExchange => {
                HandshakePayload::ServerKeyExchange(ServerKeyExchangePayload::read(&mut sub)?)
            }
            HandshakeType::CertificateRequest => HandshakePayload::CertificateRequest(
                CertificateRequestPayload::read_version(&mut sub, vers)?,
            ),
            HandshakeType::ServerHelloDone => {
                sub.expect_empty("ServerHelloDone")?;
                HandshakePayload::ServerHelloDone
            }
            HandshakeType::CertificateVerify if vers == ProtocolVersion::TLSv1_2 => {
                HandshakePayload::CertificateVerify(DigitallySignedStruct::read(&mut sub)?)
            }
            HandshakeType::CertificateVerify => {
                HandshakePayload::LegacyCertificateVerify(PayloadU16::read(&mut sub)?)
            }
            HandshakeType::ClientKeyExchange => {
                HandshakePayload::ClientKeyExchange(Payload::read(&mut sub).into_owned())
            }
            HandshakeType::NewSessionTicket => {
                HandshakePayload::NewSessionTicket(NewSessionTicketPayload::read(&mut sub)?)
            }
            HandshakeType::Finished => {
                HandshakePayload::Finished(Payload::read(&mut sub).into_owned())
            }
            _ => HandshakePayload::Unknown(Payload::read(&mut sub).into_owned()),
        };

        sub.expect_empty("HandshakeMessagePayload")
            .map(|_| Self { typ, payload })
    }
}
