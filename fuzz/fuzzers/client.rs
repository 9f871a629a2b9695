#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate tlsconnect;

use std::io;
use std::sync::Arc;

use tlsconnect::{ClientConfig, ClientConnection, RootCertStore};

fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();
    let config = Arc::new(
        ClientConfig::builder()
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth(),
    );
    let example_com = "example.com".try_into().unwrap();
    let mut client = ClientConnection::new(config, example_com).unwrap();
    if client
        .read_tls(&mut io::Cursor::new(data))
        .is_ok()
    {
        let _ = client.process_new_packets();
    }
});
