use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zeroize::Zeroizing;

#[cfg(feature = "logging")]
use crate::log::{debug, warn};
use crate::KeyLog;

/// The environment variable naming the key log file.
const ENV_VAR: &str = "SSLKEYLOGFILE";

/// Appends secrets to a file in the NSS key log format, for tools like
/// Wireshark to decrypt captured traffic.
///
/// [`KeyLogFile::new`] takes the file name from `SSLKEYLOGFILE`.  With the
/// variable unset, or the file unusable, nothing is logged; failures are
/// reported as warnings through the `log` crate.
pub struct KeyLogFile {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl KeyLogFile {
    /// Opens the file named by `SSLKEYLOGFILE`, if set.
    pub fn new() -> Self {
        match std::env::var_os(ENV_VAR) {
            Some(path) => Self::with_path(path),
            None => Self::disabled(),
        }
    }

    /// Opens `path` for appending, creating it if needed.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match open_for_append(&path) {
            Ok(file) => {
                debug!("logging keys to {:?}", path);
                Some(file)
            }
            #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
            Err(err) => {
                warn!("cannot open key log file {:?}: {}", path, err);
                None
            }
        };

        Self {
            path: Some(path),
            file: Mutex::new(file),
        }
    }

    fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    fn append(&self, label: &str, client_random: &[u8], secret: &[u8]) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "key log lock poisoned"))?;
        match file.as_mut() {
            Some(file) => file.write_all(nss_line(label, client_random, secret).as_bytes()),
            None => Ok(()),
        }
    }
}

impl Default for KeyLogFile {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyLog for KeyLogFile {
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        if let Err(err) = self.append(label, client_random, secret) {
            warn!("writing to key log file {:?} failed: {}", self.path, err);
        }
    }

    fn will_log(&self, _label: &str) -> bool {
        self.file
            .lock()
            .map(|file| file.is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for KeyLogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLogFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn open_for_append(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
}

/// `<label> <client random hex> <secret hex>\n`, wiped once written.
fn nss_line(label: &str, client_random: &[u8], secret: &[u8]) -> Zeroizing<String> {
    let mut line = Zeroizing::new(String::with_capacity(
        label.len() + 2 * (client_random.len() + secret.len()) + 3,
    ));
    line.push_str(label);
    for bytes in [client_random, secret] {
        line.push(' ');
        for b in bytes {
            // writing to a String cannot fail
            let _ = write!(line, "{b:02x}");
        }
    }
    line.push('\n');
    line
}
