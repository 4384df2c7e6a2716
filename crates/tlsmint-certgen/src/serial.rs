//! Time-derived certificate serial numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rcgen::SerialNumber;

static LAST_LEAF_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Next leaf serial: the current time in hundred-microsecond units.
///
/// Never returns the same value twice within a process; if the clock repeats
/// or steps backwards the previous value is incremented instead.
pub fn next_leaf_serial() -> u64 {
    let now = hundred_micros_since_epoch();
    let mut last = LAST_LEAF_SERIAL.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_LEAF_SERIAL.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Root serial: whole seconds since the epoch, scaled by 10000.
pub fn root_serial() -> u64 {
    hundred_micros_since_epoch() / 10_000 * 10_000
}

pub(crate) fn to_serial_number(serial: u64) -> SerialNumber {
    let bytes = serial.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    SerialNumber::from(bytes[start..].to_vec())
}

fn hundred_micros_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_micros() / 100).unwrap_or(u64::MAX)
        })
}
