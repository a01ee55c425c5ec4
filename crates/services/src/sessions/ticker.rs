use chrono::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Background task publishing the elapsed time of a running test.
///
/// Ticks are measured on the tokio clock from the moment the ticker starts,
/// on top of the elapsed time it was started with. The task is aborted when
/// the ticker is dropped, which closes every subscribed receiver.
#[derive(Debug)]
pub struct ElapsedTicker {
    receiver: watch::Receiver<Duration>,
    task: JoinHandle<()>,
}

impl ElapsedTicker {
    /// Start ticking every `period`, or `None` outside a tokio runtime.
    #[must_use]
    pub fn spawn(initial: Duration, period: std::time::Duration) -> Option<Self> {
        let handle = Handle::try_current().ok()?;
        let (sender, receiver) = watch::channel(initial);
        let origin = Instant::now();

        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval_at(origin + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let ran = i64::try_from(origin.elapsed().as_secs()).unwrap_or(i64::MAX);
                if sender.send(initial + Duration::seconds(ran)).is_err() {
                    break;
                }
            }
        });

        Some(Self { receiver, task })
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.receiver.clone()
    }

    /// Most recently published elapsed time.
    #[must_use]
    pub fn latest(&self) -> Duration {
        *self.receiver.borrow()
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
