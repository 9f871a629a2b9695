#![allow(clippy::upper_case_acronyms)]
#![allow(non_camel_case_types)]
use crate::msgs::codec::{Codec, ListLength, Reader, TlsListElement};

enum_builder! {
    /// Certificate types a server will accept in a client certificate
    /// (RFC 5246 section 7.4.4, RFC 8422 section 5.5).
    #[repr(u8)]
    pub enum ClientCertificateType {
        RSASign => 0x01,
        DSSSign => 0x02,
        RSAFixedDH => 0x03,
        DSSFixedDH => 0x04,
        ECDSASign => 0x40,
        RSAFixedECDH => 0x41,
        ECDSAFixedECDH => 0x42,
    }
}

impl TlsListElement for ClientCertificateType {
    const SIZE_LEN: ListLength = ListLength::U8;
}

enum_builder! {
    /// Record compression methods.  Only `Null` is ever offered.
    #[repr(u8)]
    pub enum Compression {
        Null => 0x00,
        Deflate => 0x01,
        LSZ => 0x40,
    }
}

impl TlsListElement for Compression {
    const SIZE_LEN: ListLength = ListLength::U8;
}

enum_builder! {
    /// Alert severity.
    #[repr(u8)]
    pub enum AlertLevel {
        Warning => 0x01,
        Fatal => 0x02,
    }
}

enum_builder! {
    /// Hello extension code points this client knows about.
    #[repr(u16)]
    pub enum ExtensionType {
        ServerName => 0x0000,
        MaxFragmentLength => 0x0001,
        StatusRequest => 0x0005,
        EllipticCurves => 0x000a,
        ECPointFormats => 0x000b,
        SRP => 0x000c,
        SignatureAlgorithms => 0x000d,
        ALProtocolNegotiation => 0x0010,
        ExtendedMasterSecret => 0x0017,
        SessionTicket => 0x0023,
        RenegotiationInfo => 0xff01,
    }
}

enum_builder! {
    /// Name types in the `server_name` extension (RFC 6066).
    #[repr(u8)]
    pub enum ServerNameType {
        HostName => 0x00,
    }
}

enum_builder! {
    /// Elliptic curve and finite field groups (RFC 8422, RFC 7919).
    #[repr(u16)]
    pub enum NamedGroup {
        secp256r1 => 0x0017,
        secp384r1 => 0x0018,
        secp521r1 => 0x0019,
        X25519 => 0x001d,
        X448 => 0x001e,
    }
}

impl TlsListElement for NamedGroup {
    const SIZE_LEN: ListLength = ListLength::U16;
}

enum_builder! {
    /// EC point encodings.  Only uncompressed points are supported.
    #[repr(u8)]
    pub enum ECPointFormat {
        Uncompressed => 0x00,
        ANSIX962CompressedPrime => 0x01,
        ANSIX962CompressedChar2 => 0x02,
    }
}

impl TlsListElement for ECPointFormat {
    const SIZE_LEN: ListLength = ListLength::U8;
}

enum_builder! {
    /// How a ServerECDHParams names its curve.
    #[repr(u8)]
    pub enum ECCurveType {
        ExplicitPrime => 0x01,
        ExplicitChar2 => 0x02,
        NamedCurve => 0x03,
    }
}

enum_builder! {
    /// Stapled status types (RFC 6066 section 8).
    #[repr(u8)]
    pub enum CertificateStatusType {
        OCSP => 0x01,
    }
}
