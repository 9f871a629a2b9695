#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate tlsconnect;

use tlsconnect::internal::msgs::codec::Reader;
use tlsconnect::internal::msgs::fragmenter::MessageFragmenter;
use tlsconnect::internal::msgs::message::{Message, OpaqueMessage, PlainMessage};

fuzz_target!(|data: &[u8]| {
    let mut rdr = Reader::init(data);
    let Ok(opaque) = OpaqueMessage::read(&mut rdr) else {
        return;
    };
    let Ok(msg) = Message::try_from(opaque.into_plain_message()) else {
        return;
    };

    let mut frg = MessageFragmenter::default();
    if frg.set_max_fragment_size(Some(32)).is_err() {
        return;
    }
    let plain = PlainMessage::from(msg);
    for fragment in frg.fragment_message(&plain) {
        assert!(fragment.payload.len() <= 32);
    }
});
