use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::BYTES_PER_MB;
use crate::shuffle::{ShuffleConfig, ShuffleMode, ShuffleStats};
use crate::shuffle::constants::SHUTDOWN_CHECK_INTERVAL_MS;
use crate::shuffle::error::{ShuffleError, ShuffleResult};
use crate::shuffle::handles::{Placement, SynchronizedReader, SynchronizedWriter};
use crate::shuffle::line_counter::tally_lines;
use crate::shuffle::permutation::{resolve_seed, RunRandomness};
use crate::shuffle::sizer::{size_with_limit, PoolSize};
use crate::shuffle::staging::StagedOutput;
use crate::shuffle::worker::{Jitter, ShuffleWorker, WorkerReport};

pub struct ShuffleCoordinator {
    config: ShuffleConfig,
    shutdown_flag: Arc<AtomicBool>,
}

/// What came back from the worker pool
#[derive(Debug, Default)]
pub(crate) struct PoolOutcome {
    pub lines_read: usize,
    pub first_failure: Option<ShuffleError>,
    pub interrupted: bool,
    pub deadline_hit: bool,
}

impl ShuffleCoordinator {
    pub fn new(config: ShuffleConfig) -> ShuffleResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub async fn shuffle(&self, input: &Path, output: &Path) -> ShuffleResult<ShuffleStats> {
        let start_time = Instant::now();

        let input_file = File::open(input).await.map_err(|source| ShuffleError::OpenInput {
            path: input.to_path_buf(),
            source,
        })?;
        let (staged, output_file) = StagedOutput::create(output).await?;

        let count_path = input.to_path_buf();
        let tally = tokio::task::spawn_blocking(move || tally_lines(&count_path))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| ShuffleError::Count {
                path: input.to_path_buf(),
                source,
            })?;

        if tally.trailing_fragment {
            debug!("{} has an unterminated final line, it will be terminated in the output", input.display());
        }

        self.check_memory_budget(&input_file).await;

        let pool = size_with_limit(tally.lines(), self.config.max_workers);
        let seed = resolve_seed(self.config.seed);

        info!(
            "Shuffling {} lines with {} workers (quota {}, mode {:?}, seed {})",
            pool.line_count, pool.worker_count, pool.quota, self.config.mode, seed
        );

        if pool.is_empty() {
            let mut output_file = output_file;
            output_file.flush().await.map_err(|source| ShuffleError::Flush { source })?;
            drop(output_file);
            staged.commit().await?;
            return Ok(ShuffleStats {
                seed,
                mode: self.config.mode,
                processing_time_ms: start_time.elapsed().as_millis() as u64,
                ..ShuffleStats::default()
            });
        }

        if self.shutdown_requested() {
            return Err(ShuffleError::Cancelled);
        }
        if self.deadline_passed(start_time) {
            return Err(self.deadline_error());
        }

        let mut randomness = RunRandomness::new(seed);
        let placement = match self.config.mode {
            ShuffleMode::Permuted => Placement::Slots(randomness.slots(pool.line_count)),
            ShuffleMode::Interleaved => Placement::Append,
        };

        let buffer_size = self.config.io_buffer_size_bytes();
        let reader = Arc::new(SynchronizedReader::new(BufReader::with_capacity(buffer_size, input_file)));
        let writer = Arc::new(SynchronizedWriter::new(BufWriter::with_capacity(buffer_size, output_file), placement));

        let outcome = self
            .run_workers(&pool, &mut randomness, &reader, &writer, start_time)
            .await;

        if let Some(failure) = outcome.first_failure {
            return Err(failure);
        }
        if outcome.deadline_hit {
            return Err(self.deadline_error());
        }
        if outcome.interrupted {
            return Err(ShuffleError::Cancelled);
        }

        let lines_written = writer.finish().await.map_err(|source| ShuffleError::Flush { source })?;
        drop(writer);
        staged.commit().await?;

        if outcome.lines_read < pool.line_count {
            warn!(
                "Input yielded {} of {} counted lines; it may have changed during the run",
                outcome.lines_read, pool.line_count
            );
        }
        if lines_written != outcome.lines_read {
            warn!("Read {} lines but wrote {}", outcome.lines_read, lines_written);
        }

        let stats = ShuffleStats {
            line_count: pool.line_count,
            lines_read: outcome.lines_read,
            lines_written,
            workers_spawned: pool.worker_count,
            quota: pool.quota,
            seed,
            mode: self.config.mode,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!("Shuffle finished: {} lines written in {}ms", stats.lines_written, stats.processing_time_ms);
        Ok(stats)
    }

    /// Spawn the pool and collect every worker's result. The first real
    /// failure raises the internal cancel flag and wins over the
    /// `Cancelled` results it causes.
    pub(crate) async fn run_workers<R, W>(
        &self,
        pool: &PoolSize,
        randomness: &mut RunRandomness,
        reader: &Arc<SynchronizedReader<R>>,
        writer: &Arc<SynchronizedWriter<W>>,
        started: Instant,
    ) -> PoolOutcome
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for index in 1..=pool.worker_count {
            let worker = ShuffleWorker::new(
                index,
                pool.share(index),
                pool.quota,
                Jitter::new(self.config.jitter_micros, pool.worker_count, index, randomness.worker_seed()),
                Arc::clone(reader),
                Arc::clone(writer),
                Arc::clone(&cancel),
            );
            tasks.spawn(async move { (index, worker.run().await) });
        }

        debug!("Spawned {} workers", tasks.len());

        let mut outcome = PoolOutcome::default();
        let mut finished = vec![false; pool.worker_count + 1];
        let mut panicked = 0;

        loop {
            if !cancel.load(Ordering::Relaxed) {
                if self.shutdown_requested() {
                    info!("Shutdown requested, stopping {} workers", tasks.len());
                    outcome.interrupted = true;
                    cancel.store(true, Ordering::Relaxed);
                } else if self.deadline_passed(started) {
                    warn!("Deadline reached, stopping {} workers", tasks.len());
                    outcome.deadline_hit = true;
                    cancel.store(true, Ordering::Relaxed);
                }
            }

            let task_result = tokio::time::timeout(
                Duration::from_millis(SHUTDOWN_CHECK_INTERVAL_MS),
                tasks.join_next(),
            )
            .await;

            match task_result {
                Ok(Some(Ok((index, result)))) => {
                    finished[index] = true;
                    match result {
                        Ok(WorkerReport { lines_read, .. }) => outcome.lines_read += lines_read,
                        Err(ShuffleError::Cancelled) => outcome.interrupted = true,
                        Err(e) => {
                            warn!("{}", e);
                            cancel.store(true, Ordering::Relaxed);
                            outcome.first_failure.get_or_insert(e);
                        }
                    }
                }
                Ok(Some(Err(join_error))) => {
                    warn!("Worker task failed: {}", join_error);
                    cancel.store(true, Ordering::Relaxed);
                    panicked += 1;
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        if panicked > 0 && outcome.first_failure.is_none() {
            let index = (1..=pool.worker_count).find(|&i| !finished[i]).unwrap_or_default();
            outcome.first_failure = Some(ShuffleError::WorkerPanicked { index });
        }

        outcome
    }

    async fn check_memory_budget(&self, input_file: &File) {
        let Ok(metadata) = input_file.metadata().await else {
            return;
        };

        let limit = self.config.memory_limit_bytes();
        if limit > 0 && metadata.len() > limit {
            warn!(
                "Input is {:.1} MB but the memory budget is {:.1} MB; every line is held in memory while shuffling",
                metadata.len() as f64 / BYTES_PER_MB as f64,
                limit as f64 / BYTES_PER_MB as f64
            );
        }
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.config
            .deadline_seconds
            .is_some_and(|seconds| started.elapsed() >= Duration::from_secs(seconds))
    }

    fn deadline_error(&self) -> ShuffleError {
        ShuffleError::DeadlineExceeded {
            seconds: self.config.deadline_seconds.unwrap_or_default(),
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }
}
