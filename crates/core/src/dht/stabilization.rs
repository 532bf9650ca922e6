//! Stabilization run daemons to maintain dht.

use std::sync::Arc;
use std::time::Duration;

use crate::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use crate::consts::DEFAULT_FIX_FINGERS_INTERVAL_MS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::dht::Chord;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::swarm::Swarm;

/// Periods of the three maintenance tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StabilizeIntervals {
    /// Period of [Stabilizer::stabilize].
    pub stabilize: Duration,
    /// Period of [Stabilizer::fix_fingers].
    pub fix_fingers: Duration,
    /// Period of [Stabilizer::check_predecessor].
    pub check_predecessor: Duration,
}

impl Default for StabilizeIntervals {
    fn default() -> Self {
        Self {
            stabilize: Duration::from_millis(DEFAULT_STABILIZE_INTERVAL_MS),
            fix_fingers: Duration::from_millis(DEFAULT_FIX_FINGERS_INTERVAL_MS),
            check_predecessor: Duration::from_millis(DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS),
        }
    }
}

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    swarm: Arc<Swarm>,
    dht: Arc<PeerRing>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(swarm: Arc<Swarm>) -> Self {
        let dht = swarm.dht();
        Self { swarm, dht }
    }

    /// Run stabilization once: probe the successor, adopt a closer successor reported
    /// by it, then notify the successor about self.
    pub async fn stabilize(&self) -> Result<()> {
        if !self.dht.is_active()? {
            return Ok(());
        }
        let Some(successor) = self.dht.successor()? else {
            tracing::debug!("STABILIZATION skipped, successor unknown");
            return Ok(());
        };

        let x = if successor.did == self.dht.did() {
            self.dht.predecessor()?
        } else {
            let probe = match self.swarm.get_info(&successor).await {
                Ok(_) => self.swarm.get_predecessor(&successor).await,
                Err(e) => Err(e),
            };
            match probe {
                Ok(x) => x,
                Err(e) if e.is_transport_failure() => {
                    tracing::warn!("STABILIZATION successor {} is gone: {}", successor, e);
                    self.dht.invalidate_successor(successor.did)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        };

        match self.dht.stabilize(x)? {
            PeerRingAction::None => Ok(()),
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::Notify(node)) => {
                tracing::debug!("STABILIZATION notify {}", next);
                match self.swarm.notify(&next, node).await {
                    Err(e) if e.is_transport_failure() => {
                        tracing::warn!("STABILIZATION failed to notify {}: {}", next, e);
                        Ok(())
                    }
                    other => other,
                }
            }
            act => Err(Error::InvalidAction(format!("{:?}", act))),
        }
    }

    /// Refresh every finger table entry with a lookup of its interval start.
    /// A node without successor repairs it first from its routing knowledge.
    pub async fn fix_fingers(&self) -> Result<()> {
        if !self.dht.is_active()? {
            return Ok(());
        }
        self.dht.repair_successor()?;

        for index in 0..self.dht.params.finger_table_size as usize {
            let start = self.dht.finger_start(index);
            match self.swarm.find_successor(start).await {
                Ok(node) => self.dht.set_finger(index, Some(node))?,
                Err(e) => tracing::warn!("STABILIZATION fix_finger {} ({}) failed: {}", index, start, e),
            }
        }
        Ok(())
    }

    /// Probe the predecessor, forget it if it does not answer.
    pub async fn check_predecessor(&self) -> Result<()> {
        let Some(predecessor) = self.dht.predecessor()? else {
            return Ok(());
        };
        match self.swarm.get_info(&predecessor).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_transport_failure() => {
                tracing::warn!("STABILIZATION predecessor {} is gone: {}", predecessor, e);
                self.dht.invalidate_predecessor(predecessor.did)?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

mod stabilizer {
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use futures_timer::Delay;

    use super::*;

    async fn every<F, Fut>(name: &str, interval: Duration, task: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        loop {
            Delay::new(interval).await;
            task()
                .await
                .unwrap_or_else(|e| tracing::error!("failed to {} {:?}", name, e));
        }
    }

    impl Stabilizer {
        /// Run the three maintenance tasks, each on its own interval, forever.
        pub async fn wait(self: Arc<Self>, intervals: StabilizeIntervals) {
            futures::join!(
                every("stabilize", intervals.stabilize, || self.stabilize()),
                every("fix fingers", intervals.fix_fingers, || self.fix_fingers()),
                every(
                    "check predecessor",
                    intervals.check_predecessor,
                    || self.check_predecessor()
                ),
            );
        }
    }
}
