use crate::enums::AlertDescription;
use crate::error::InvalidMessage;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::enums::AlertLevel;

/// The two-byte body of an alert record.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertMessagePayload {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl AlertMessagePayload {
    pub fn warning(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Warning,
            description,
        }
    }

    pub fn fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    /// Unknown levels count as fatal.
    pub fn is_fatal(&self) -> bool {
        self.level != AlertLevel::Warning
    }
}

impl Codec<'_> for AlertMessagePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.level.encode(bytes);
        self.description.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let alert = Self {
            level: AlertLevel::read(r)?,
            description: AlertDescription::read(r)?,
        };
        r.expect_empty("AlertMessagePayload")?;
        Ok(alert)
    }
}
