use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Table size at which [`ThrottleStage`](crate::ThrottleStage) sweeps out
/// addresses whose window has already passed.
pub const PRUNE_THRESHOLD: usize = 1024;

/// Outcome of [`ThrottleTable::check_and_record`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The attempt was allowed and `now` is recorded for the address.
    Allowed(ThrottleMark),
    /// The window has not elapsed yet.
    Throttled { retry_after: Duration },
}

/// What an allowed attempt changed, so it can be undone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThrottleMark {
    pub ip: String,
    pub recorded: DateTime<Utc>,
    pub previous: Option<DateTime<Utc>>,
}

/// Last accepted comment time per client address.
///
/// Process-local and never persisted. Check and update for one address
/// happen under that address's shard lock, so two simultaneous attempts
/// from the same IP cannot both pass.
#[derive(Debug, Default)]
pub struct ThrottleTable {
    last: DashMap<String, DateTime<Utc>>,
}

impl ThrottleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow and record `now` if at least `window` has passed since the last
    /// recorded time for `ip`. A throttled attempt leaves the table as is.
    pub fn check_and_record(&self, ip: &str, now: DateTime<Utc>, window: Duration) -> ThrottleDecision {
        match self.last.entry(ip.to_string()) {
            Entry::Occupied(mut slot) => {
                let elapsed = now - *slot.get();
                if elapsed < window {
                    return ThrottleDecision::Throttled {
                        retry_after: window - elapsed,
                    };
                }
                let previous = slot.insert(now);
                ThrottleDecision::Allowed(ThrottleMark {
                    ip: ip.to_string(),
                    recorded: now,
                    previous: Some(previous),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                ThrottleDecision::Allowed(ThrottleMark {
                    ip: ip.to_string(),
                    recorded: now,
                    previous: None,
                })
            }
        }
    }

    /// Undo a mark whose comment was never stored. A no-op if a later
    /// attempt has already replaced it.
    pub fn rollback(&self, mark: &ThrottleMark) {
        match mark.previous {
            Some(previous) => {
                if let Some(mut current) = self.last.get_mut(&mark.ip) {
                    if *current == mark.recorded {
                        *current = previous;
                    }
                }
            }
            None => {
                self.last.remove_if(&mark.ip, |_, at| *at == mark.recorded);
            }
        }
    }

    /// Forget every address whose window has passed at `now`. Those
    /// addresses would be allowed anyway. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let before = self.last.len();
        self.last.retain(|_, at| now - *at < window);
        before.saturating_sub(self.last.len())
    }

    pub fn last_seen(&self, ip: &str) -> Option<DateTime<Utc>> {
        self.last.get(ip).map(|at| *at)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use quire_types::millis_to_datetime;

    use super::*;

    fn t0() -> DateTime<Utc> {
        millis_to_datetime(1_700_000_000_000)
    }

    // ---------------------------------------------------------------
    // Window behaviour
    // ---------------------------------------------------------------

    #[test]
    fn second_attempt_inside_window_is_throttled() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        assert!(matches!(
            table.check_and_record("1.2.3.4", t0(), window),
            ThrottleDecision::Allowed(_)
        ));
        let decision = table.check_and_record("1.2.3.4", t0() + Duration::minutes(2), window);
        assert_eq!(
            decision,
            ThrottleDecision::Throttled {
                retry_after: Duration::minutes(3)
            }
        );
        assert!(matches!(
            table.check_and_record("1.2.3.4", t0() + Duration::minutes(5), window),
            ThrottleDecision::Allowed(_)
        ));
    }

    #[test]
    fn rejected_attempts_do_not_slide_the_window() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        table.check_and_record("ip", t0(), window);
        table.check_and_record("ip", t0() + Duration::minutes(4), window);
        assert_eq!(table.last_seen("ip"), Some(t0()));
    }

    #[test]
    fn addresses_are_independent() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        table.check_and_record("a", t0(), window);
        assert!(matches!(
            table.check_and_record("b", t0(), window),
            ThrottleDecision::Allowed(_)
        ));
        assert_eq!(table.len(), 2);
    }

    // ---------------------------------------------------------------
    // Rollback
    // ---------------------------------------------------------------

    #[test]
    fn rollback_restores_previous_state() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        let ThrottleDecision::Allowed(first) = table.check_and_record("ip", t0(), window) else {
            panic!("first attempt throttled");
        };
        table.rollback(&first);
        assert!(table.is_empty());

        table.check_and_record("ip", t0(), window);
        let later = t0() + Duration::minutes(10);
        let ThrottleDecision::Allowed(second) = table.check_and_record("ip", later, window) else {
            panic!("second attempt throttled");
        };
        table.rollback(&second);
        assert_eq!(table.last_seen("ip"), Some(t0()));
    }

    #[test]
    fn stale_rollback_is_ignored() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        let ThrottleDecision::Allowed(mark) = table.check_and_record("ip", t0(), window) else {
            panic!("throttled");
        };
        let later = t0() + Duration::minutes(6);
        table.check_and_record("ip", later, window);
        table.rollback(&mark);
        assert_eq!(table.last_seen("ip"), Some(later));
    }

    #[test]
    fn prune_drops_only_expired_addresses() {
        let table = ThrottleTable::new();
        let window = Duration::minutes(5);
        table.check_and_record("old", t0(), window);
        table.check_and_record("fresh", t0() + Duration::minutes(4), window);

        let removed = table.prune(t0() + Duration::minutes(6), window);
        assert_eq!(removed, 1);
        assert_eq!(table.last_seen("old"), None);
        assert_eq!(table.last_seen("fresh"), Some(t0() + Duration::minutes(4)));
    }

    // ---------------------------------------------------------------
    // Concurrency
    // ---------------------------------------------------------------

    #[test]
    fn concurrent_attempts_from_one_ip_admit_one() {
        let table = Arc::new(ThrottleTable::new());
        let allowed = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let allowed = Arc::clone(&allowed);
                thread::spawn(move || {
                    if let ThrottleDecision::Allowed(_) =
                        table.check_and_record("10.0.0.9", t0(), Duration::minutes(5))
                    {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(allowed.load(Ordering::SeqCst), 1);
    }
}
