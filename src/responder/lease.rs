//! Lease duration and requested-address checks.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::ipv4_from_slice;
use crate::error::ConfigError;

pub const DEFAULT_MIN_LEASE_HOURS: u32 = 24;
pub const DEFAULT_MAX_LEASE_HOURS: u32 = 48;

const SECONDS_PER_HOUR: u64 = 3600;

/// Picks lease durations uniformly from `[min_hours, max_hours)`.
///
/// Durations are spread so that a rack of machines booted together does
/// not renew together. Each draw seeds its own generator from the policy
/// seed and a draw counter, so concurrent callers never contend.
pub struct LeasePolicy {
    min_hours: u32,
    max_hours: u32,
    seed: u64,
    draws: AtomicU64,
}

impl LeasePolicy {
    pub fn new(
        min_hours: u32,
        max_hours: u32,
        mut random_source: StdRng,
    ) -> Result<Self, ConfigError> {
        if min_hours >= max_hours {
            return Err(ConfigError::LeaseBounds {
                min: min_hours,
                max: max_hours,
            });
        }
        Ok(Self {
            min_hours,
            max_hours,
            seed: random_source.gen(),
            draws: AtomicU64::new(0),
        })
    }

    /// Policy seeded once from the current time.
    pub fn from_clock(min_hours: u32, max_hours: u32) -> Result<Self, ConfigError> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(min_hours, max_hours, StdRng::seed_from_u64(seed))
    }

    pub fn next_lease_duration(&self) -> Duration {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(draw));
        let hours = rng.gen_range(self.min_hours..self.max_hours);
        Duration::from_secs(u64::from(hours) * SECONDS_PER_HOUR)
    }
}

/// True only for a well-formed, non-zero address equal to the assigned one.
pub fn validate_requested_address(requested: &[u8], assigned: Ipv4Addr) -> bool {
    match ipv4_from_slice(requested) {
        Some(ip) => !ip.is_unspecified() && ip == assigned,
        None => false,
    }
}
