//! # Synthetic Traffic — demo and soak-test flow source
//!
//! Stands in when no capture interface is wired up: a handful of benign
//! hosts chatter constantly, and every so often one source mounts a SYN
//! flood, a port sweep, or a bulk upload. Attack bursts persist across
//! batches so the belief tracker sees a real ramp, not a single spike.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::{IpAddr, Ipv4Addr};
use tracing::info;

use netward_detect::{FlowObservation, Protocol};

const BENIGN_HOSTS: usize = 6;
const ATTACK_START_CHANCE: f64 = 0.15;
const ATTACK_BATCHES: u32 = 8;

#[derive(Debug, Clone, Copy)]
enum AttackKind {
    Flood,
    Sweep,
    Upload,
}

struct ActiveAttack {
    source: IpAddr,
    kind: AttackKind,
    batches_left: u32,
}

pub struct SyntheticTraffic {
    rng: Mutex<StdRng>,
    attack: Mutex<Option<ActiveAttack>>,
    target: IpAddr,
}

impl SyntheticTraffic {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            attack: Mutex::new(None),
            target: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        }
    }

    #[cfg(test)]
    fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            attack: Mutex::new(None),
            target: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        }
    }

    /// One batch of flows stamped at `now_ms`.
    pub fn next_batch(&self, now_ms: i64) -> Vec<FlowObservation> {
        let mut rng = self.rng.lock();
        let mut flows = Vec::new();

        for host in 0..BENIGN_HOSTS {
            let src = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10 + host as u8));
            for _ in 0..rng.gen_range(5..40) {
                flows.push(FlowObservation {
                    ts_ms: now_ms - rng.gen_range(0..1_000),
                    src,
                    dst: self.target,
                    dst_port: [80u16, 443, 53, 22][rng.gen_range(0..4)],
                    protocol: Protocol::Tcp,
                    bytes: rng.gen_range(60..1_500),
                    syn_only: rng.gen_bool(0.05),
                });
            }
        }

        let mut attack = self.attack.lock();
        if attack.is_none() && rng.gen::<f64>() < ATTACK_START_CHANCE {
            let kind = match rng.gen_range(0..3) {
                0 => AttackKind::Flood,
                1 => AttackKind::Sweep,
                _ => AttackKind::Upload,
            };
            let source = IpAddr::V4(Ipv4Addr::new(203, 0, 113, rng.gen_range(1..250)));
            info!(source = %source, kind = ?kind, "Synthetic attack burst starting");
            *attack = Some(ActiveAttack {
                source,
                kind,
                batches_left: ATTACK_BATCHES,
            });
        }

        if let Some(active) = attack.as_mut() {
            match active.kind {
                AttackKind::Flood => {
                    for _ in 0..rng.gen_range(600..1_200) {
                        flows.push(FlowObservation {
                            ts_ms: now_ms - rng.gen_range(0..1_000),
                            src: active.source,
                            dst: self.target,
                            dst_port: 80,
                            protocol: Protocol::Tcp,
                            bytes: 60,
                            syn_only: true,
                        });
                    }
                }
                AttackKind::Sweep => {
                    for port in 0..rng.gen_range(40..80) {
                        flows.push(FlowObservation {
                            ts_ms: now_ms - rng.gen_range(0..1_000),
                            src: active.source,
                            dst: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1 + (port % 200) as u8)),
                            dst_port: 1_024 + port,
                            protocol: Protocol::Tcp,
                            bytes: 60,
                            syn_only: true,
                        });
                    }
                }
                AttackKind::Upload => {
                    for _ in 0..rng.gen_range(20..40) {
                        flows.push(FlowObservation {
                            ts_ms: now_ms - rng.gen_range(0..1_000),
                            src: active.source,
                            dst: self.target,
                            dst_port: 443,
                            protocol: Protocol::Tcp,
                            bytes: rng.gen_range(200_000..500_000),
                            syn_only: false,
                        });
                    }
                }
            }
            active.batches_left -= 1;
            if active.batches_left == 0 {
                info!(source = %active.source, "Synthetic attack burst over");
                *attack = None;
            }
        }

        // The window's eviction is a prefix trim; batches must arrive in
        // epoch order.
        flows.sort_unstable_by_key(|f| f.ts_ms);
        flows
    }
}

impl Default for SyntheticTraffic {
    fn default() -> Self {
        Self::new()
    }
}
