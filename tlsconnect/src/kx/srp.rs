use std::fmt;

use zeroize::Zeroizing;

use super::{bit_length, missing_params, take_secret, ClientKxContext, KeyExchangeStrategy};
use crate::crypto::{SrpClient, SrpInputs};
use crate::error::{Error, PeerIncompatible};
#[cfg(feature = "logging")]
use crate::log::{debug, warn};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::{KeyExchangeAlgorithm, ServerSrpParams};

/// A user name and password for SRP suites.
#[derive(Clone)]
pub struct SrpCredentials {
    /// Sent in the ClientHello `srp` extension.
    pub username: Vec<u8>,
    /// Never leaves this process.
    pub password: Zeroizing<Vec<u8>>,
}

impl SrpCredentials {
    /// Make a new `SrpCredentials`.
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl fmt::Debug for SrpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// An RFC 5054 appendix A group.
pub(crate) struct SrpGroup {
    pub(crate) bits: usize,
    /// `N`, as upper-case hex.
    pub(crate) n: &'static str,
    pub(crate) g: u8,
}

/// The groups we accept from a server, smallest first.
pub(crate) static KNOWN_SRP_GROUPS: &[SrpGroup] = &[
    SrpGroup {
        bits: 1024,
        n: "EEAF0AB9ADB38DD69C33F80AFA8FC5E86072618775FF3C0B9EA2314C9C256576\
            D674DF7496EA81D3383B4813D692C6E0E0D5D8E250B98BE48E495C1D6089DAD1\
            5DC7D7B46154D6B6CE8EF4AD69B15D4982559B297BCF1885C529F566660E57EC\
            68EDBC3C05726CC02FD4CBF4976EAA9AFD5138FE8376435B9FC61D2FC0EB06E3",
        g: 2,
    },
    SrpGroup {
        bits: 1536,
        n: "9DEF3CAFB939277AB1F12A8617A47BBBDBA51DF499AC4C80BEEEA961\
            4B19CC4D5F4F5F556E27CBDE51C6A94BE4607A291558903BA0D0F843\
            80B655BB9A22E8DCDF028A7CEC67F0D08134B1C8B97989149B609E0B\
            E3BAB63D47548381DBC5B1FC764E3F4B53DD9DA1158BFD3E2B9C8CF5\
            6EDF019539349627DB2FD53D24B7C48665772E437D6C7F8CE442734A\
            F7CCB7AE837C264AE3A9BEB87F8A2FE9B8B5292E5A021FFF5E91479E\
            8CE7A28C2442C6F315180F93499A234DCF76E3FED135F9BB",
        g: 2,
    },
    SrpGroup {
        bits: 2048,
        n: "AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC319294\
            3DB56050A37329CBB4A099ED8193E0757767A13DD52312AB4B03310D\
            CD7F48A9DA04FD50E8083969EDB767B0CF6095179A163AB3661A05FB\
            D5FAAAE82918A9962F0B93B855F97993EC975EEAA80D740ADBF4FF74\
            7359D041D5C33EA71D281E446B14773BCA97B43A23FB801676BD207A\
            436C6481F1D2B9078717461A5B9D32E688F87748544523B524B0D57D\
            5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6AF874E73\
            03CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB6\
            94B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F\
            9E4AFF73",
        g: 2,
    },
];

/// The known group with prime `n` and generator `g`, if any.
fn known_group(n: &[u8], g: &[u8]) -> Option<&'static SrpGroup> {
    let start = n
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(n.len());
    let hex = n[start..]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<String>();

    KNOWN_SRP_GROUPS
        .iter()
        .find(|group| group.n == hex && bit_length(g) <= 8 && g.last() == Some(&group.g))
}

/// SRP key exchange (RFC 5054).
pub(super) struct SecureRemotePassword {
    client: &'static dyn SrpClient,
    credentials: SrpCredentials,
    params: Option<ServerSrpParams>,
    premaster: Option<Zeroizing<Vec<u8>>>,
}

impl SecureRemotePassword {
    pub(super) fn new(client: &'static dyn SrpClient, credentials: SrpCredentials) -> Self {
        Self {
            client,
            credentials,
            params: None,
            premaster: None,
        }
    }
}

impl KeyExchangeStrategy for SecureRemotePassword {
    fn algorithm(&self) -> KeyExchangeAlgorithm {
        KeyExchangeAlgorithm::SRP
    }

    fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error> {
        let params = ServerSrpParams::read(r)?;

        match known_group(&params.n.0, &params.g.0) {
            Some(group) => debug!("SRP group is {} bits", group.bits),
            None => {
                warn!("Server offered an unknown SRP group");
                return Err(PeerIncompatible::UnknownSrpGroup.into());
            }
        }

        self.params = Some(params);
        Ok(())
    }

    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| missing_params("ServerSRPParams"))?;

        let exchange = self.client.exchange(
            &SrpInputs {
                n: &params.n.0,
                g: &params.g.0,
                salt: &params.salt.0,
                server_public: &params.b.0,
                identity: &self.credentials.username,
                password: &self.credentials.password,
            },
            cx.secure_random,
        )?;
        self.premaster = Some(Zeroizing::new(
            exchange
                .premaster
                .secret_bytes()
                .to_vec(),
        ));

        Ok(PayloadU16::new(exchange.client_public).get_encoding())
    }

    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        take_secret(&mut self.premaster)
    }
}
