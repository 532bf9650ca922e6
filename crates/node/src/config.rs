use std::fs;
use std::io;
use std::time::Duration;

use chord_core::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use chord_core::consts::DEFAULT_FINGER_TABLE_SIZE;
use chord_core::consts::DEFAULT_FIX_FINGERS_INTERVAL_MS;
use chord_core::consts::DEFAULT_MAX_LOOKUP_HOPS;
use chord_core::consts::DEFAULT_MODULUS;
use chord_core::consts::DEFAULT_RPC_TIMEOUT_MS;
use chord_core::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use chord_core::dht::Node;
use chord_core::dht::RingParams;
use chord_core::dht::StabilizeIntervals;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;
use crate::util::split_address;

pub const DEFAULT_CONFIG_PATH: &str = "~/.chord/config.yaml";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:50000";

/// How a node enters a ring when the daemon starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bootstrap {
    /// Start a new ring.
    Create,
    /// Join the ring of the node listening at `host:port`.
    Join(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Listen address of the node server.
    pub bind_addr: String,
    /// Host other nodes use to reach this node. Defaults to the host of `bind_addr`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub did: u64,
    pub modulus: u64,
    pub finger_table_size: u8,
    pub rpc_timeout_ms: u64,
    pub max_lookup_hops: u32,
    pub stabilize_interval_ms: u64,
    pub fix_fingers_interval_ms: u64,
    pub check_predecessor_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<Bootstrap>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            host: None,
            did: 0,
            modulus: DEFAULT_MODULUS,
            finger_table_size: DEFAULT_FINGER_TABLE_SIZE,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            max_lookup_hops: DEFAULT_MAX_LOOKUP_HOPS,
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            fix_fingers_interval_ms: DEFAULT_FIX_FINGERS_INTERVAL_MS,
            check_predecessor_interval_ms: DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS,
            bootstrap: None,
        }
    }
}

impl Config {
    pub fn new(bind_addr: &str, did: u64) -> Self {
        Self {
            bind_addr: bind_addr.to_string(),
            did,
            ..Default::default()
        }
    }

    /// Ring constants, validated.
    pub fn params(&self) -> Result<RingParams> {
        Ok(RingParams::new(self.modulus, self.finger_table_size)?)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn intervals(&self) -> StabilizeIntervals {
        StabilizeIntervals {
            stabilize: Duration::from_millis(self.stabilize_interval_ms),
            fix_fingers: Duration::from_millis(self.fix_fingers_interval_ms),
            check_predecessor: Duration::from_millis(self.check_predecessor_interval_ms),
        }
    }

    /// Identity of the node once its server listens on `port`.
    pub fn node(&self, port: u16) -> Result<Node> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => split_address(&self.bind_addr)?.0,
        };
        Ok(Node::new(self.did, host, port))
    }

    /// Fail fast on a config the ring cannot work with.
    pub fn validate(&self) -> Result<()> {
        let params = self.params()?;
        params.check(self.did.into())?;
        split_address(&self.bind_addr)?;
        if let Some(Bootstrap::Join(introducer)) = &self.bootstrap {
            split_address(introducer)?;
        }
        if self.rpc_timeout_ms == 0 {
            return Err(Error::InvalidConfig("rpc_timeout_ms must be positive".into()));
        }
        let intervals = [
            ("stabilize_interval_ms", self.stabilize_interval_ms),
            ("fix_fingers_interval_ms", self.fix_fingers_interval_ms),
            (
                "check_predecessor_interval_ms",
                self.check_predecessor_interval_ms,
            ),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        let config: Config = serde_yaml::from_reader(f_rdr)?;
        config.validate()?;
        Ok(config)
    }
}
