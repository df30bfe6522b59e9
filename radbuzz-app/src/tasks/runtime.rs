//! Worker runtime
//!
//! Every worker gets its own thread. The thread runs `on_startup` once and
//! then alternates between `on_activation` and sleeping until the worker's
//! wakeup is signalled or the requested timeout expires.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embassy_futures::select::select;
use embassy_time::Timer;
use pollster::block_on;

use radbuzz_core::state::Wakeup;
use radbuzz_core::traits::Worker;

/// Start `worker` on a named thread
pub fn spawn_worker<W>(name: &str, mut worker: W, wakeup: Arc<Wakeup>) -> io::Result<JoinHandle<()>>
where
    W: Worker + Send + 'static,
{
    let name = name.to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        tracing::debug!(worker = %name, "starting");

        worker.on_startup();
        loop {
            let timeout = worker.on_activation();
            wait_for_activation(&wakeup, timeout);
        }
    })
}

/// Block until `wakeup` is signalled or `timeout` expires
pub fn wait_for_activation(wakeup: &Wakeup, timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => {
            let micros = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
            let timer = Timer::after(embassy_time::Duration::from_micros(micros));
            block_on(select(wakeup.wait(), timer));
        }
        None => block_on(wakeup.wait()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[test]
    fn test_signal_wakes_immediately() {
        let wakeup = Wakeup::new();
        wakeup.signal(());

        let start = Instant::now();
        wait_for_activation(&wakeup, Some(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_timeout_expires() {
        let wakeup = Wakeup::new();

        let start = Instant::now();
        wait_for_activation(&wakeup, Some(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    struct Counter(Arc<AtomicU32>);

    impl Worker for Counter {
        fn on_activation(&mut self) -> Option<Duration> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn test_worker_runs_on_signal() {
        let count = Arc::new(AtomicU32::new(0));
        let wakeup = Arc::new(Wakeup::new());
        spawn_worker("counter", Counter(count.clone()), wakeup.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 1 && Instant::now() < deadline {
            thread::yield_now();
        }

        wakeup.signal(());
        while count.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::yield_now();
        }
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
