use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

type Waiter = oneshot::Sender<OwnedSemaphorePermit>;

/// Admission control for outbound catalog calls: at most `max_in_flight`
/// requests running at once, consecutive dispatches spaced at least
/// `min_spacing` apart, waiters admitted in submission order.
///
/// A single scheduler task owns the queue and the counters; callers only see
/// `admit()`. The slot is released when the returned [`GatePass`] drops.
#[derive(Debug, Clone)]
pub struct RequestGate {
    queue: mpsc::UnboundedSender<Waiter>,
}

#[derive(Debug)]
pub struct GatePass {
    _permit: OwnedSemaphorePermit,
}

impl RequestGate {
    pub fn new(max_in_flight: usize, min_spacing: Duration) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(schedule(rx, max_in_flight, min_spacing));
        Self { queue }
    }

    /// Waits for a dispatch slot. Keep the pass alive until the upstream
    /// request has completed.
    pub async fn admit(&self) -> Result<GatePass> {
        let (reply, pass) = oneshot::channel();
        self.queue
            .send(reply)
            .map_err(|_| anyhow!("request gate scheduler stopped"))?;
        let permit = pass
            .await
            .map_err(|_| anyhow!("request gate scheduler stopped"))?;
        Ok(GatePass { _permit: permit })
    }
}

async fn schedule(
    mut queue: mpsc::UnboundedReceiver<Waiter>,
    max_in_flight: usize,
    min_spacing: Duration,
) {
    let slots = Arc::new(Semaphore::new(max_in_flight));
    let mut next_dispatch = Instant::now();

    while let Some(waiter) = queue.recv().await {
        let permit = match slots.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return,
        };
        tokio::time::sleep_until(next_dispatch).await;
        next_dispatch = Instant::now() + min_spacing;
        // A caller that gave up while queued frees its slot right away.
        if waiter.send(permit).is_err() {
            debug!("gated caller went away before dispatch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn never_exceeds_in_flight_cap() {
        let gate = RequestGate::new(3, Duration::from_millis(1));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let pass = gate.admit().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(15)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                drop(pass);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_dispatches_at_least_min_interval() {
        let spacing = Duration::from_millis(20);
        let gate = RequestGate::new(10, spacing);
        let dispatched = Arc::new(Mutex::new(Vec::new()));

        let admits = (0..6).map(|_| {
            let gate = gate.clone();
            let dispatched = dispatched.clone();
            async move {
                let pass = gate.admit().await.unwrap();
                dispatched.lock().unwrap().push(Instant::now());
                drop(pass);
            }
        });
        futures::future::join_all(admits).await;

        // Paused time makes the recorded instants exact, so every
        // consecutive pair must sit at least one spacing apart.
        let dispatched = dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 6);
        for pair in dispatched.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= spacing);
        }
    }

    #[tokio::test]
    async fn admits_in_submission_order() {
        let gate = RequestGate::new(2, Duration::from_millis(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let admits = (0..5).map(|i| {
            let gate = gate.clone();
            let order = order.clone();
            async move {
                let pass = gate.admit().await.unwrap();
                order.lock().unwrap().push(i);
                drop(pass);
            }
        });
        futures::future::join_all(admits).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
