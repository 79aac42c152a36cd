use std::sync::OnceLock;
use std::time::Instant;

static BOOT: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed on the monotonic clock since the first call in this process.
///
/// Inbound media timestamps are mapped onto this clock so that packets from
/// reconnecting publishers stay consistent with what is already buffered.
pub fn boot_ms() -> u64 {
    let boot = BOOT.get_or_init(Instant::now);
    boot.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_boot_clock_monotonic() {
        let t1 = boot_ms();
        thread::sleep(Duration::from_millis(10));
        let t2 = boot_ms();
        assert!(t2 >= t1 + 10);
    }
}
