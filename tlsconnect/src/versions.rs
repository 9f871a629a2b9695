use std::fmt;

use crate::enums::ProtocolVersion;

/// A TLS protocol version supported by tlsconnect.
///
/// All possible instances of this class are provided by the library in
/// the [`ALL_VERSIONS`] array, as well as individually as [`TLS10`],
/// [`TLS11`] and [`TLS12`].
#[derive(PartialEq)]
pub struct SupportedProtocolVersion {
    /// The TLS enumeration naming this version.
    pub version: ProtocolVersion,
    is_private: (),
}

impl fmt::Debug for SupportedProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.version.fmt(f)
    }
}

/// TLS1.0
pub static TLS10: SupportedProtocolVersion = SupportedProtocolVersion {
    version: ProtocolVersion::TLSv1_0,
    is_private: (),
};

/// TLS1.1
pub static TLS11: SupportedProtocolVersion = SupportedProtocolVersion {
    version: ProtocolVersion::TLSv1_1,
    is_private: (),
};

/// TLS1.2
pub static TLS12: SupportedProtocolVersion = SupportedProtocolVersion {
    version: ProtocolVersion::TLSv1_2,
    is_private: (),
};

/// A list of all the protocol versions supported by tlsconnect.
pub static ALL_VERSIONS: &[&SupportedProtocolVersion] = &[&TLS12, &TLS11, &TLS10];

/// The version configuration that an application should use by default.
///
/// TLS 1.0 and 1.1 must be opted into with
/// [`ConfigBuilder::with_protocol_versions`](crate::ConfigBuilder).
pub static DEFAULT_VERSIONS: &[&SupportedProtocolVersion] = &[&TLS12];

/// The contiguous range of versions a client will negotiate.
///
/// ClientHello carries `max`; a ServerHello version outside
/// `min..=max` fails the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EnabledVersions {
    min: ProtocolVersion,
    max: ProtocolVersion,
}

impl EnabledVersions {
    /// The range spanned by `versions`, or `None` if empty.
    pub(crate) fn new(versions: &[&'static SupportedProtocolVersion]) -> Option<Self> {
        let ordinals = versions
            .iter()
            .map(|v| u16::from(v.version));
        let min = ordinals.clone().min()?;
        let max = ordinals.max()?;

        Some(Self {
            min: ProtocolVersion::from(min),
            max: ProtocolVersion::from(max),
        })
    }

    pub(crate) fn contains(&self, version: ProtocolVersion) -> bool {
        let v = u16::from(version);
        u16::from(self.min) <= v && v <= u16::from(self.max)
    }

    pub(crate) fn max(&self) -> ProtocolVersion {
        self.max
    }

    pub(crate) fn min(&self) -> ProtocolVersion {
        self.min
    }
}
