#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate tlsconnect;

use std::io;

use tlsconnect::internal::msgs::deframer::MessageDeframer;
use tlsconnect::internal::msgs::message::Message;

fuzz_target!(|data: &[u8]| {
    let mut dfm = MessageDeframer::default();
    if dfm
        .read(&mut io::Cursor::new(data))
        .is_err()
    {
        return;
    }
    dfm.has_pending();

    while let Ok(Some(opaque)) = dfm.pop() {
        Message::try_from(opaque.into_plain_message()).ok();
    }
});
