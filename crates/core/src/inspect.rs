use serde::Deserialize;
use serde::Serialize;

use crate::dht::chord::NodeStatus;
use crate::dht::PeerRing;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DHTInspect {
    pub did: u64,
    pub address: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub predecessor: Option<String>,
    /// Runs of identical finger entries: `(entry, first index, last index)`.
    pub finger_table: Vec<(Option<String>, u64, u64)>,
}

impl DHTInspect {
    pub fn inspect(dht: &PeerRing) -> Result<Self> {
        let state = dht.snapshot()?;
        let finger_table = {
            let finger = state
                .finger
                .list()
                .iter()
                .map(|x| x.as_ref().map(|n| n.to_string()));
            compress_iter(finger)
        };

        Ok(Self {
            did: dht.did().value(),
            address: dht.node.address(),
            status: state.status,
            successor: state.successor.map(|n| n.to_string()),
            predecessor: state.predecessor.map(|n| n.to_string()),
            finger_table,
        })
    }
}

pub fn compress_iter<T>(iter: impl Iterator<Item = T>) -> Vec<(T, u64, u64)>
where T: PartialEq {
    let mut result = vec![];
    let mut start = 0u64;
    let mut count = 0u64;
    let mut prev: Option<T> = None;

    for (i, x) in iter.enumerate() {
        match prev {
            Some(p) if p == x => {
                count += 1;
            }
            _ => {
                if let Some(p) = prev {
                    result.push((p, start, start + count - 1));
                }
                start = i as u64;
                count = 1;
            }
        }
        prev = Some(x);
    }

    if let Some(p) = prev {
        result.push((p, start, start + count - 1));
    }

    result
}
