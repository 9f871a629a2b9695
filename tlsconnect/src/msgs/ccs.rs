use crate::error::InvalidMessage;
use crate::msgs::codec::{Codec, Reader};

/// The ChangeCipherSpec body: always the single byte 0x01.
#[derive(Clone, Debug)]
pub struct ChangeCipherSpecPayload;

const CHANGE_CIPHER_SPEC: u8 = 0x01;

impl Codec<'_> for ChangeCipherSpecPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.push(CHANGE_CIPHER_SPEC);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        match u8::read(r)? {
            CHANGE_CIPHER_SPEC => {
                r.expect_empty("ChangeCipherSpecPayload")?;
                Ok(Self)
            }
            _ => Err(InvalidMessage::InvalidCcs),
        }
    }
}
