use std::fmt;

use pki_types::CertificateDer;
use zeroize::Zeroize;

use crate::error::InvalidMessage;
use crate::msgs::codec;
use crate::msgs::codec::{Codec, LengthPrefixedBuffer, ListLength, Reader};

/// A payload whose length is known from the enclosing structure:
/// a record body, or the rest of a handshake message.
#[derive(Clone, Eq, PartialEq)]
pub enum Payload<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> Codec<'a> for Payload<'a> {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(self.bytes());
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self::read(r))
    }
}

impl<'a> Payload<'a> {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Borrowed(bytes) => bytes,
            Self::Owned(bytes) => bytes,
        }
    }

    pub fn into_owned(self) -> Payload<'static> {
        Payload::Owned(self.into_vec())
    }

    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Self::Borrowed(bytes) => bytes.to_vec(),
            Self::Owned(bytes) => bytes,
        }
    }

    pub fn read(r: &mut Reader<'a>) -> Self {
        Self::Borrowed(r.rest())
    }
}

impl Payload<'static> {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Owned(bytes.into())
    }

    pub fn empty() -> Self {
        Self::Borrowed(&[])
    }
}

impl<'a> Codec<'a> for CertificateDer<'a> {
    fn encode(&self, bytes: &mut Vec<u8>) {
        codec::u24(self.as_ref().len() as u32).encode(bytes);
        bytes.extend(self.as_ref());
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let len = codec::u24::read(r)?.0 as usize;
        let mut sub = r.sub(len)?;
        let body = sub.rest();
        Ok(Self::from(body))
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex(f, self.bytes())
    }
}

macro_rules! length_prefixed_payload {
    ($(#[$attr:meta])* $name:ident, $size_len:expr) => {
        $(#[$attr])*
        #[derive(Clone, Default, Eq, PartialEq)]
        pub struct $name(pub Vec<u8>);

        impl $name {
            pub fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn empty() -> Self {
                Self(Vec::new())
            }

            /// Write `slice` with this type's length prefix, without copying
            /// it into a payload first.
            pub fn encode_slice(slice: &[u8], bytes: &mut Vec<u8>) {
                let nest = LengthPrefixedBuffer::new($size_len, bytes);
                nest.buf.extend_from_slice(slice);
            }
        }

        impl Codec<'_> for $name {
            fn encode(&self, bytes: &mut Vec<u8>) {
                Self::encode_slice(&self.0, bytes);
            }

            fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
                let len = read_length($size_len, r)?;
                Ok(Self(r.sub(len)?.rest().to_vec()))
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.0.zeroize();
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                hex(f, &self.0)
            }
        }
    };
}

length_prefixed_payload!(
    /// Opaque bytes behind a one-byte length: session ids, SRP salts,
    /// EC points.
    PayloadU8,
    ListLength::U8
);

length_prefixed_payload!(
    /// Opaque bytes behind a two-byte length: DH values, signatures,
    /// tickets, encrypted pre-master secrets.
    PayloadU16,
    ListLength::U16
);

length_prefixed_payload!(
    /// Opaque bytes behind a three-byte length, such as an OCSP response.
    PayloadU24,
    ListLength::U24 {
        max: usize::MAX,
        error: InvalidMessage::MessageTooLarge,
    }
);

fn read_length(size_len: ListLength, r: &mut Reader<'_>) -> Result<usize, InvalidMessage> {
    Ok(match size_len {
        ListLength::U8 => usize::from(u8::read(r)?),
        ListLength::U16 => usize::from(u16::read(r)?),
        ListLength::U24 { .. } => usize::from(codec::u24::read(r)?),
    })
}

// Lower-case hex, no separators.
pub(crate) fn hex<'a>(
    f: &mut fmt::Formatter<'_>,
    payload: impl IntoIterator<Item = &'a u8>,
) -> fmt::Result {
    for b in payload {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}
