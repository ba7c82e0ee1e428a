use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

/// Per-room phase deadline scheduler.
///
/// At most one timer exists per room: `start` cancels and replaces any
/// previous one. Each timer runs two tasks: an expiry task that fires the
/// phase-end handler at the deadline, and a ticker that periodically
/// reports the remaining time for client display. Tick cadence is advisory
/// only; clients derive ground truth from the deadline timestamp.
pub struct PhaseTimer {
    entries: Arc<DashMap<Uuid, TimerEntry>>,
    generations: AtomicU64,
    tick_interval: Duration,
}

struct TimerEntry {
    deadline: Instant,
    generation: u64,
    expiry: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl TimerEntry {
    fn abort(&self) {
        self.expiry.abort();
        self.ticker.abort();
    }
}

impl PhaseTimer {
    /// Create a scheduler emitting ticks at the given cadence.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
            tick_interval,
        }
    }

    /// Arm the timer for a room, replacing any previous one.
    ///
    /// `on_tick` is invoked with the remaining time at every tick until
    /// the deadline. `on_expire` is invoked once at the deadline with the
    /// generation token returned here; handlers compare it against the
    /// generation they armed to ignore stale expirations.
    pub fn start<T, E, Fut>(
        &self,
        room_id: Uuid,
        duration: Duration,
        on_tick: T,
        on_expire: E,
    ) -> u64
    where
        T: Fn(Duration) + Send + Sync + 'static,
        E: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let deadline = Instant::now() + duration;

        let entries = Arc::clone(&self.entries);
        let expiry = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            // The expiry task removes its own entry before running the
            // handler: `cancel` must never abort a handler mid-flight,
            // and `remaining` has to read 0 from this point on.
            match entries.remove_if(&room_id, |_, entry| entry.generation == generation) {
                Some((_, entry)) => entry.ticker.abort(),
                None => {
                    debug!(%room_id, generation, "expiry for a replaced timer, ignoring");
                    return;
                }
            }
            on_expire(generation).await;
        });

        let tick_every = self.tick_interval;
        let ticker = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_every, tick_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                on_tick(remaining);
            }
        });

        if let Some(previous) = self.entries.insert(
            room_id,
            TimerEntry {
                deadline,
                generation,
                expiry,
                ticker,
            },
        ) {
            debug!(%room_id, "replacing active phase timer");
            previous.abort();
        }

        generation
    }

    /// Remaining time before the room's deadline; zero when no timer is
    /// armed or the deadline has passed.
    pub fn remaining(&self, room_id: Uuid) -> Duration {
        self.entries
            .get(&room_id)
            .map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Whether `generation` is the room's currently armed timer.
    pub fn is_current(&self, room_id: Uuid, generation: u64) -> bool {
        self.entries
            .get(&room_id)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// Stop both the tick schedule and the pending expiry for a room.
    ///
    /// Required on game end and room teardown so no stale callback fires
    /// into a destroyed session.
    pub fn cancel(&self, room_id: Uuid) {
        if let Some((_, entry)) = self.entries.remove(&room_id) {
            entry.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn timer() -> PhaseTimer {
        PhaseTimer::new(Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_counts_down_to_zero() {
        let timer = timer();
        let room = Uuid::new_v4();
        timer.start(room, Duration::from_secs(30), |_| {}, |_| async {});

        assert_eq!(timer.remaining(room), Duration::from_secs(30));
        time::advance(Duration::from_secs(12)).await;
        let mid = timer.remaining(room);
        assert!(mid <= Duration::from_secs(18));
        time::advance(Duration::from_secs(30)).await;
        // Let the expiry task run and drop its entry.
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining(room), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_is_zero_without_a_timer() {
        assert_eq!(timer().remaining(Uuid::new_v4()), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_once_with_its_generation() {
        let timer = timer();
        let room = Uuid::new_v4();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicU64::new(0));

        let fired_in = Arc::clone(&fired);
        let seen_in = Arc::clone(&seen);
        let generation = timer.start(room, Duration::from_secs(5), |_| {}, move |generation| {
            let fired = fired_in;
            let seen = seen_in;
            async move {
                fired.fetch_add(1, Ordering::SeqCst);
                seen.store(generation, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), generation);
        assert!(!timer.is_current(room, generation));
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_timer_silences_the_first_deadline() {
        let timer = timer();
        let room = Uuid::new_v4();
        let first_fired = Arc::new(AtomicUsize::new(0));
        let second_fired = Arc::new(AtomicUsize::new(0));

        let flag = Arc::clone(&first_fired);
        timer.start(room, Duration::from_secs(5), |_| {}, move |_| {
            let flag = flag;
            async move {
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });

        let flag = Arc::clone(&second_fired);
        let generation = timer.start(room, Duration::from_secs(20), |_| {}, move |_| {
            let flag = flag;
            async move {
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(first_fired.load(Ordering::SeqCst), 0);
        assert_eq!(second_fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_current(room, generation));

        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(first_fired.load(Ordering::SeqCst), 0);
        assert_eq!(second_fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_expiry_and_ticks() {
        let timer = timer();
        let room = Uuid::new_v4();
        let fired = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));

        let fired_in = Arc::clone(&fired);
        let ticks_in = Arc::clone(&ticks);
        timer.start(
            room,
            Duration::from_secs(30),
            move |_| {
                ticks_in.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                let fired = fired_in;
                async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        timer.cancel(room);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining(room), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_reports_remaining_until_the_deadline() {
        let timer = timer();
        let room = Uuid::new_v4();
        let ticks = Arc::new(AtomicUsize::new(0));

        let ticks_in = Arc::clone(&ticks);
        timer.start(
            room,
            Duration::from_secs(35),
            move |remaining| {
                assert!(remaining <= Duration::from_secs(35));
                ticks_in.fetch_add(1, Ordering::SeqCst);
            },
            |_| async {},
        );

        time::sleep(Duration::from_secs(40)).await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected at least 3 ticks, saw {seen}");
    }
}
