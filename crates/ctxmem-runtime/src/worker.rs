use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A named background worker that runs `tick` on an interval until stopped.
///
/// Modeled on the teacher's `WorkspaceSupervisor`/`SessionWatcher` thread
/// pattern, generalized from filesystem-event polling to plain interval
/// ticking: every ctxmem worker (embedding drain, consolidation sweep,
/// helpfulness scoring, turn-state cleanup, replication) is "do some work,
/// then wait up to `interval` for a stop signal" rather than reacting to
/// file events, so there's no `notify`/`PollWatcher` dependency here.
pub struct Worker {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns `tick` on its own OS thread, calling it once immediately and
    /// then again every `interval` until `stop()` is called. A panic inside
    /// `tick` is caught and logged rather than taking the whole process
    /// down — one bad batch shouldn't kill every other worker.
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let thread_name = name.clone();

        let handle = std::thread::Builder::new().name(name.clone()).spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut tick));
                if let Err(panic) = result {
                    eprintln!("ctxmem worker '{}' panicked: {}", thread_name, describe_panic(&panic));
                }
                if !thread_running.load(Ordering::SeqCst) {
                    break;
                }
                park_for(interval, &thread_running);
            }
        })?;

        Ok(Self {
            name,
            running,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signals the worker to stop and joins its thread. Safe to call more
    /// than once; a second call is a no-op.
    pub fn stop(mut self) {
        self.stop_mut();
    }

    fn stop_mut(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop_mut();
    }
}

/// Sleeps in short slices so a `stop()` during a long `interval` takes
/// effect within a bounded latency instead of waiting out the whole sleep.
fn park_for(interval: Duration, running: &Arc<AtomicBool>) {
    const SLICE: Duration = Duration::from_millis(200);
    let mut elapsed = Duration::ZERO;
    while elapsed < interval {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        let remaining = interval - elapsed;
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        elapsed += step;
    }
}

fn describe_panic(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn worker_ticks_at_least_once_before_being_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let thread_count = count.clone();
        let worker = Worker::spawn("test-worker", Duration::from_millis(10), move || {
            thread_count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        worker.stop();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn a_panicking_tick_does_not_poison_the_worker() {
        let worker = Worker::spawn("panicky", Duration::from_millis(5), || {
            panic!("boom");
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert!(worker.is_running());
        worker.stop();
    }
}
