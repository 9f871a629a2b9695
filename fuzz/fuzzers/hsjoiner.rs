#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate tlsconnect;

use tlsconnect::internal::msgs::codec::Reader;
use tlsconnect::internal::msgs::hsjoiner::HandshakeJoiner;
use tlsconnect::internal::msgs::message::OpaqueMessage;
use tlsconnect::ProtocolVersion;

fuzz_target!(|data: &[u8]| {
    let mut rdr = Reader::init(data);
    let mut jnr = HandshakeJoiner::new(0xffff);

    while let Ok(opaque) = OpaqueMessage::read(&mut rdr) {
        let plain = opaque.into_plain_message();
        if !jnr.want_message(&plain) || jnr.take_message(plain).is_err() {
            return;
        }

        while let Ok(Some(_msg)) = jnr.pop(ProtocolVersion::TLSv1_2) {}
    }
});
