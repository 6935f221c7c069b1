//! Periodic notification housekeeping.

use std::time::Duration;

use platform_db::DbPool;
use products_hr::notifications;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

const EXPIRED_EVERY: Duration = Duration::from_secs(60 * 60);
const OLD_READ_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

/// Handles to the running cleanup tasks.
pub struct CleanupJobs {
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Clone, Copy, Debug)]
enum Sweep {
    Expired,
    OldRead,
}

impl Sweep {
    async fn run(self, pool: &DbPool) {
        let at = chrono::Utc::now().fixed_offset();
        let result = match self {
            Sweep::Expired => notifications::cleanup_expired(pool, at).await,
            Sweep::OldRead => notifications::cleanup_old_read(pool, at).await,
        };
        if let Err(err) = result {
            error!(sweep = ?self, error = %err, "notification cleanup failed");
        }
    }
}

impl CleanupJobs {
    pub fn spawn(pool: DbPool) -> Self {
        let (stop, _) = watch::channel(false);
        let handles = [(Sweep::Expired, EXPIRED_EVERY), (Sweep::OldRead, OLD_READ_EVERY)]
            .into_iter()
            .map(|(sweep, period)| {
                let pool = pool.clone();
                let mut stopped = stop.subscribe();
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => sweep.run(&pool).await,
                            _ = stopped.changed() => break,
                        }
                    }
                })
            })
            .collect();
        info!("notification cleanup scheduled");
        Self { stop, handles }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "cleanup task ended abnormally");
            }
        }
        info!("notification cleanup stopped");
    }
}
