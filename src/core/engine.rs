use crate::core::fetcher::fetch_with_retry;
use crate::core::packager::package_sb3;
use crate::core::session::SessionRecorder;
use crate::core::{ConfigProvider, IdSource, ProjectFetcher, Storage};
use crate::domain::model::{DownloadedProject, ProjectId, SessionSummary};
use crate::utils::backoff::Backoff;
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;

/// In-flight ids per worker.
pub const WINDOW_PER_WORKER: usize = 4;

/// Cloneable handle that asks a running engine to stop submitting work.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Stops the engine on Ctrl-C or SIGTERM.
pub fn install_signal_handlers(handle: StopHandle) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::warn!("Signal received, waiting for in-flight downloads to finish…");
        handle.stop();
    });
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    // A dropped sender means nobody can stop us any more.
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub struct DownloadEngine<F: ProjectFetcher + 'static, S: Storage> {
    fetcher: Arc<F>,
    recorder: SessionRecorder<S>,
    workers: usize,
    window: usize,
    retry_attempts: u32,
    retry_backoff: Backoff,
    target: Option<u64>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl<F: ProjectFetcher + 'static, S: Storage> DownloadEngine<F, S> {
    pub fn new<C: ConfigProvider>(fetcher: F, recorder: SessionRecorder<S>, config: &C) -> Self {
        let workers = config.workers().max(1);
        let (stop_tx, _) = watch::channel(false);
        Self {
            fetcher: Arc::new(fetcher),
            recorder,
            workers,
            window: workers * WINDOW_PER_WORKER,
            retry_attempts: config.retry_attempts(),
            retry_backoff: Backoff::default(),
            target: config.target_successes(),
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Backoff) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    fn target_reached(&self) -> bool {
        self.target
            .is_some_and(|target| self.recorder.downloaded() >= target)
    }

    fn spawn_download(
        &self,
        in_flight: &mut JoinSet<(ProjectId, Option<Result<DownloadedProject>>)>,
        semaphore: &Arc<Semaphore>,
        id: ProjectId,
    ) {
        let fetcher = Arc::clone(&self.fetcher);
        let semaphore = Arc::clone(semaphore);
        let attempts = self.retry_attempts;
        let backoff = self.retry_backoff.clone();

        in_flight.spawn(async move {
            // A closed semaphore means the run was stopped before this id started.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (id, None);
            };
            let result = fetch_with_retry(fetcher.as_ref(), id, attempts, backoff)
                .await
                .and_then(|project| {
                    Ok(DownloadedProject {
                        id: project.id,
                        archive: package_sb3(&project.json)?,
                        metadata: project.metadata,
                    })
                });
            (id, Some(result))
        });
    }

    async fn record(&mut self, id: ProjectId, result: Result<DownloadedProject>) -> Result<()> {
        match result {
            Ok(project) => {
                self.recorder.record_success(&project).await?;
                tracing::info!("✅ [{}] downloaded", id);
            }
            Err(e) => {
                self.recorder.record_failure(id).await?;
                tracing::warn!("❌ [{}] failed: {}", id, e);
            }
        }
        Ok(())
    }

    /// Downloads ids from `ids` until the source runs dry, the success target is
    /// met or a stop is requested. Local write failures abort the run.
    ///
    /// Results are collected while the source is still producing, so a slow or
    /// failing source never holds back the target check.
    pub async fn run<I: IdSource + ?Sized>(mut self, ids: &mut I) -> Result<SessionSummary> {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut in_flight = JoinSet::new();
        let mut stop_rx = self.stop_tx.subscribe();

        tracing::info!(
            "Downloading with {} workers from {}",
            self.workers,
            ids.describe()
        );
        if let Some(target) = self.target {
            tracing::info!("Target: {} successful downloads", target);
        }

        let (id_tx, mut id_rx) = mpsc::channel(1);
        let feed = feed_ids(ids, id_tx);
        tokio::pin!(feed);
        let mut feeding = true;
        let mut exhausted = false;

        loop {
            let accepting = !exhausted
                && !semaphore.is_closed()
                && !self.target_reached()
                && in_flight.len() < self.window;
            if !accepting && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = stopped(&mut stop_rx), if !semaphore.is_closed() => {
                    semaphore.close();
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok((id, Some(result))) => self.record(id, result).await?,
                        Ok((id, None)) => tracing::debug!("[{}] skipped after stop", id),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => tracing::error!("Download task panicked: {}", e),
                    }

                    if self.target_reached() {
                        tracing::info!(
                            "Target of successful downloads reached: {}",
                            self.recorder.downloaded()
                        );
                        in_flight.shutdown().await;
                        break;
                    }
                }
                next = id_rx.recv(), if accepting => match next {
                    Some(id) => self.spawn_download(&mut in_flight, &semaphore, id),
                    None => {
                        tracing::debug!("Id source exhausted");
                        exhausted = true;
                    }
                },
                _ = &mut feed, if feeding && accepting => {
                    feeding = false;
                }
                else => break,
            }
        }

        Ok(self.recorder.summary(started.elapsed()))
    }
}

/// Pulls ids into `tx` until the source ends or the engine stops listening.
async fn feed_ids<I: IdSource + ?Sized>(ids: &mut I, tx: mpsc::Sender<ProjectId>) {
    while let Some(id) = ids.next_id().await {
        if tx.send(id).await.is_err() {
            break;
        }
    }
}
