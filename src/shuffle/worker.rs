use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, trace};

use crate::shuffle::constants::MAX_JITTER_SLEEP_MICROS;
use crate::shuffle::error::{ShuffleError, ShuffleResult};
use crate::shuffle::handles::{Line, SynchronizedReader, SynchronizedWriter};

/// Random pauses for one worker, stretched by `worker_count / index`
/// so that lower-indexed workers tend to wait longer.
pub struct Jitter {
    base_micros: u64,
    scale: f64,
    rng: StdRng,
}

impl Jitter {
    pub fn new(base_micros: u64, worker_count: usize, index: usize, seed: u64) -> Self {
        Self {
            base_micros,
            scale: worker_count.max(1) as f64 / index.max(1) as f64,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        if self.base_micros == 0 {
            return Duration::ZERO;
        }

        let raw = self.rng.gen_range(0..=self.base_micros) as f64;
        let micros = (raw * self.scale).min(MAX_JITTER_SLEEP_MICROS as f64);
        Duration::from_micros(micros as u64)
    }

    pub async fn pause(&mut self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub index: usize,
    pub lines_read: usize,
    pub lines_written: usize,
}

pub struct ShuffleWorker<R, W> {
    index: usize,
    share: usize,
    quota: usize,
    jitter: Jitter,
    reader: Arc<SynchronizedReader<R>>,
    writer: Arc<SynchronizedWriter<W>>,
    cancel: Arc<AtomicBool>,
}

impl<R, W> ShuffleWorker<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        index: usize,
        share: usize,
        quota: usize,
        jitter: Jitter,
        reader: Arc<SynchronizedReader<R>>,
        writer: Arc<SynchronizedWriter<W>>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            index,
            share,
            quota,
            jitter,
            reader,
            writer,
            cancel,
        }
    }

    pub async fn run(mut self) -> ShuffleResult<WorkerReport> {
        let mut buffer: Vec<Line> = Vec::with_capacity(self.quota.max(self.share));

        self.checkpoint()?;
        self.jitter.pause().await;

        for _ in 0..self.share {
            self.checkpoint()?;
            self.jitter.pause().await;

            let line = self
                .reader
                .next_line()
                .await
                .map_err(|source| ShuffleError::Worker { index: self.index, source })?;

            match line {
                Some(line) => buffer.push(line),
                None => {
                    debug!("Worker {} hit end of input after {} lines", self.index, buffer.len());
                    break;
                }
            }

            tokio::task::yield_now().await;
        }

        let lines_read = buffer.len();
        trace!("Worker {} buffered {} lines", self.index, lines_read);

        self.checkpoint()?;
        self.jitter.pause().await;

        let mut lines_written = 0;
        for line in buffer {
            self.checkpoint()?;
            self.jitter.pause().await;

            self.writer
                .write_line(line)
                .await
                .map_err(|source| ShuffleError::Worker { index: self.index, source })?;
            lines_written += 1;
        }

        Ok(WorkerReport {
            index: self.index,
            lines_read,
            lines_written,
        })
    }

    fn checkpoint(&self) -> ShuffleResult<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(ShuffleError::Cancelled);
        }
        Ok(())
    }
}
