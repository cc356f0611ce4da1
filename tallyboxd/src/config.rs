use std::env::var;
use std::net::IpAddr;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MIN_KEY_BITS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,
    pub min_key_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: IpAddr::from([127, 0, 0, 1]),
            port: DEFAULT_PORT,
            min_key_bits: DEFAULT_MIN_KEY_BITS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| var(name).ok())
    }

    pub(crate) fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, String> {
        let address = match lookup("TALLYBOX_ADDRESS") {
            Some(val) => val
                .parse()
                .map_err(|e| format!("TALLYBOX_ADDRESS {:?} is not an IP address: {}", val, e))?,
            None => DEFAULT_ADDRESS
                .parse()
                .map_err(|e| format!("default address: {}", e))?,
        };

        let port = match lookup("TALLYBOX_PORT") {
            Some(val) => val
                .parse()
                .map_err(|e| format!("TALLYBOX_PORT {:?} is not a port number: {}", val, e))?,
            None => DEFAULT_PORT,
        };

        let min_key_bits: usize = match lookup("TALLYBOX_MIN_KEY_BITS") {
            Some(val) => val
                .parse()
                .map_err(|e| format!("TALLYBOX_MIN_KEY_BITS {:?} is not a number: {}", val, e))?,
            None => DEFAULT_MIN_KEY_BITS,
        };

        if min_key_bits < tallybox::MIN_MODULUS_BITS {
            return Err(format!(
                "TALLYBOX_MIN_KEY_BITS must be at least {}",
                tallybox::MIN_MODULUS_BITS
            ));
        }

        Ok(Config {
            address,
            port,
            min_key_bits,
        })
    }
}
