//! Sliding-window rate limiting. The limiter is an ordinary value built once
//! and handed to whoever needs it; time and storage are injected.

use rusqlite::Connection;

use crate::error::Result;

pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Where hit timestamps live between checks.
pub trait HitStore {
    /// Hits for `key` at or after `since`, oldest first.
    fn hits_since(&mut self, key: &str, since: i64) -> Result<Vec<i64>>;
    fn record(&mut self, key: &str, at: i64) -> Result<()>;
    fn prune(&mut self, key: &str, before: i64) -> Result<()>;
}

/// In-process store for short-lived limiters and tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    hits: std::collections::HashMap<String, Vec<i64>>,
}

#[cfg(test)]
impl HitStore for MemoryStore {
    fn hits_since(&mut self, key: &str, since: i64) -> Result<Vec<i64>> {
        let mut hits: Vec<i64> = self
            .hits
            .get(key)
            .map(|h| h.iter().copied().filter(|&t| t >= since).collect())
            .unwrap_or_default();
        hits.sort_unstable();
        Ok(hits)
    }

    fn record(&mut self, key: &str, at: i64) -> Result<()> {
        self.hits.entry(key.to_string()).or_default().push(at);
        Ok(())
    }

    fn prune(&mut self, key: &str, before: i64) -> Result<()> {
        if let Some(hits) = self.hits.get_mut(key) {
            hits.retain(|&t| t >= before);
        }
        Ok(())
    }
}

/// Hits kept in the `rate_limit_hits` table so limits survive across runs.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HitStore for SqliteStore<'_> {
    fn hits_since(&mut self, key: &str, since: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT hit_at FROM rate_limit_hits WHERE key = ?1 AND hit_at >= ?2 ORDER BY hit_at",
        )?;
        let hits = stmt
            .query_map(rusqlite::params![key, since], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(hits)
    }

    fn record(&mut self, key: &str, at: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rate_limit_hits (key, hit_at) VALUES (?1, ?2)",
            rusqlite::params![key, at],
        )?;
        Ok(())
    }

    fn prune(&mut self, key: &str, before: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM rate_limit_hits WHERE key = ?1 AND hit_at < ?2",
            rusqlite::params![key, before],
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: usize },
    Limited { retry_after: i64 },
}

pub struct RateLimiter<C, S> {
    clock: C,
    store: S,
    max_hits: usize,
    window_secs: i64,
}

impl<C: Clock, S: HitStore> RateLimiter<C, S> {
    pub fn new(clock: C, store: S, max_hits: usize, window_secs: i64) -> Self {
        Self {
            clock,
            store,
            max_hits,
            window_secs: window_secs.max(1),
        }
    }

    /// Whether `key` has room in the current window, without using it.
    pub fn peek(&mut self, key: &str) -> Result<Decision> {
        let now = self.clock.now();
        let window_start = now - self.window_secs + 1;
        self.store.prune(key, window_start)?;
        let hits = self.store.hits_since(key, window_start)?;

        if hits.len() >= self.max_hits {
            let oldest = hits.first().copied().unwrap_or(now);
            return Ok(Decision::Limited {
                retry_after: (oldest + self.window_secs - now).max(1),
            });
        }
        Ok(Decision::Allowed {
            remaining: self.max_hits - hits.len(),
        })
    }

    /// Count one hit against `key` now.
    pub fn record(&mut self, key: &str) -> Result<()> {
        let now = self.clock.now();
        self.store.record(key, now)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::db::test_db;

    #[derive(Clone)]
    struct FakeClock(Rc<Cell<i64>>);

    impl FakeClock {
        fn at(t: i64) -> Self {
            Self(Rc::new(Cell::new(t)))
        }

        fn advance(&self, secs: i64) {
            self.0.set(self.0.get() + secs);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> i64 {
            self.0.get()
        }
    }

    /// Peek, then record when there is room; the import command's sequence.
    fn admit<C: Clock, S: HitStore>(limiter: &mut RateLimiter<C, S>, key: &str) -> Decision {
        match limiter.peek(key).unwrap() {
            Decision::Allowed { remaining } => {
                limiter.record(key).unwrap();
                Decision::Allowed {
                    remaining: remaining - 1,
                }
            }
            limited => limited,
        }
    }

    #[test]
    fn test_allows_up_to_limit() {
        let clock = FakeClock::at(1_000);
        let mut limiter = RateLimiter::new(clock, MemoryStore::default(), 2, 60);
        assert_eq!(admit(&mut limiter, "a"), Decision::Allowed { remaining: 1 });
        assert_eq!(admit(&mut limiter, "a"), Decision::Allowed { remaining: 0 });
        assert_eq!(admit(&mut limiter, "a"), Decision::Limited { retry_after: 60 });
    }

    #[test]
    fn test_peek_does_not_use_a_slot() {
        let clock = FakeClock::at(1_000);
        let mut limiter = RateLimiter::new(clock, MemoryStore::default(), 1, 60);
        assert_eq!(limiter.peek("a").unwrap(), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.peek("a").unwrap(), Decision::Allowed { remaining: 1 });
        limiter.record("a").unwrap();
        assert_eq!(limiter.peek("a").unwrap(), Decision::Limited { retry_after: 60 });
    }

    #[test]
    fn test_window_slides() {
        let clock = FakeClock::at(1_000);
        let mut limiter = RateLimiter::new(clock.clone(), MemoryStore::default(), 1, 60);
        assert!(matches!(admit(&mut limiter, "a"), Decision::Allowed { .. }));
        clock.advance(30);
        assert_eq!(admit(&mut limiter, "a"), Decision::Limited { retry_after: 30 });
        clock.advance(30);
        assert!(matches!(admit(&mut limiter, "a"), Decision::Allowed { .. }));
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = FakeClock::at(0);
        let mut limiter = RateLimiter::new(clock, MemoryStore::default(), 1, 60);
        assert!(matches!(admit(&mut limiter, "a"), Decision::Allowed { .. }));
        assert!(matches!(admit(&mut limiter, "b"), Decision::Allowed { .. }));
        assert!(matches!(admit(&mut limiter, "a"), Decision::Limited { .. }));
    }

    #[test]
    fn test_sqlite_store_persists_hits() {
        let (_dir, conn) = test_db();
        let clock = FakeClock::at(5_000);
        {
            let mut limiter = RateLimiter::new(clock.clone(), SqliteStore::new(&conn), 1, 3600);
            assert!(matches!(admit(&mut limiter, "import:1"), Decision::Allowed { .. }));
        }
        clock.advance(10);
        let mut limiter = RateLimiter::new(clock.clone(), SqliteStore::new(&conn), 1, 3600);
        assert_eq!(
            admit(&mut limiter, "import:1"),
            Decision::Limited { retry_after: 3590 }
        );
        clock.advance(3590);
        assert!(matches!(admit(&mut limiter, "import:1"), Decision::Allowed { .. }));
        let stored: i64 = conn
            .query_row("SELECT count(*) FROM rate_limit_hits", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 1);
    }
}
