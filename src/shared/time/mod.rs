//! Cached coarse clock to avoid syscalls on the hot path.
//!
//! TTL comparisons work on whole seconds since a fixed epoch, so a 32-bit
//! counter refreshed in the background is enough. Readers pay two loads
//! and a compare per expiry check.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unix timestamp of the clock epoch (2024-01-01T00:00:00Z).
const EPOCH_UNIX: u64 = 1_704_067_200;

/// Refresh cadence of the background ticker.
const RESOLUTION: Duration = Duration::from_millis(100);

static CLOCK: AtomicU32 = AtomicU32::new(0);
static STARTED: AtomicBool = AtomicBool::new(false);

/// Starts the clock ticker if it is not already running.
/// Called by every cache constructor; only the first call spawns the
/// refresh thread. The thread is detached and lives for the process.
pub fn init() {
    if STARTED.swap(true, Ordering::SeqCst) {
        return;
    }
    CLOCK.store(wall_secs(), Ordering::Release);
    std::thread::Builder::new()
        .name("shardlru-clock".into())
        .spawn(|| loop {
            std::thread::sleep(RESOLUTION);
            CLOCK.store(wall_secs(), Ordering::Release);
        })
        .expect("spawn clock ticker");
}

/// Returns whole seconds elapsed since the clock epoch.
pub fn now() -> u32 {
    CLOCK.load(Ordering::Acquire)
}

/// Converts a clock reading back to wall time.
pub fn to_system_time(secs: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(EPOCH_UNIX + secs as u64)
}

fn wall_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
        .saturating_sub(EPOCH_UNIX) as u32
}
