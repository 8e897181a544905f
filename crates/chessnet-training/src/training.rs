//! Back-propagation of every network on its curated dataset.
//!
//! One scoped worker per network runs `repeats` epochs over the network's dataset.
//! For each sample the worker:
//!
//! 1. back-propagates the encoded position towards the clamped, scaled trainer score
//! 2. re-evaluates the position and adds the absolute error to a running mean
//!
//! Each network sits in its own [`Mutex`]. A worker holds the lock for a single
//! sample, and the control thread takes it briefly to write checkpoints every
//! `checkpoint_interval`, so a checkpoint never sees a half-applied update.
//!
//! Worker progress (epoch, processed samples, running mean error) is published through
//! atomics in [`WorkerProgress`] and logged at each checkpoint.

use std::{
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    thread,
    time::Instant,
};

use chessnet_engine::{CancellationToken, Position, encoding};
use chessnet_network::Network;

use crate::{
    analysis::TrainData,
    barrier::{CompletionBarrier, TICK},
    config::PipelineConfig,
    events::{LifecycleEvent, LifecycleSink, TrainingStanding},
    store::{PopulationStore, StoreError},
};

/// Networks shown in the final top list.
const TOP_LIST_SIZE: usize = 5;

#[derive(Debug, Default)]
pub struct WorkerProgress {
    epoch: AtomicUsize,
    processed: AtomicUsize,
    mean_error_bits: AtomicU32,
}

impl WorkerProgress {
    /// Current epoch, starting at 1 once the worker runs.
    #[must_use]
    pub fn epoch(&self) -> usize {
        self.epoch.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Running mean of the absolute output error, `None` before the first sample.
    #[must_use]
    pub fn mean_error(&self) -> Option<f32> {
        (self.processed() > 0).then(|| f32::from_bits(self.mean_error_bits.load(Ordering::Relaxed)))
    }

    fn record(&self, processed: usize, mean_error: f32) {
        self.mean_error_bits
            .store(mean_error.to_bits(), Ordering::Relaxed);
        self.processed.store(processed, Ordering::Relaxed);
    }
}

/// Final statistics of one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub network: String,
    pub samples: usize,
    pub skipped: usize,
    pub mean_error: Option<f32>,
}

fn lock<'a, 'n>(cell: &'a Mutex<&'n mut Network>) -> MutexGuard<'a, &'n mut Network> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Encodes a dataset for one network. Samples with unreadable FENs are skipped.
fn prepare(network: &Network, dataset: &[TrainData]) -> (Vec<(Vec<f32>, [f32; 1])>, usize) {
    let Some(encoding) = encoding::Encoding::for_input_size(network.input_size()) else {
        return (vec![], dataset.len());
    };
    let mut skipped = 0;
    let samples = dataset
        .iter()
        .filter_map(|sample| match Position::from_fen(&sample.fen) {
            Ok(position) => Some((
                encoding.encode(&position),
                [encoding::target_from_score(sample.true_evaluation)],
            )),
            Err(err) => {
                log::warn!("{network}: skipping sample: {err}");
                skipped += 1;
                None
            }
        })
        .collect();
    (samples, skipped)
}

pub struct TrainingStage<'a> {
    config: &'a PipelineConfig,
    store: &'a PopulationStore,
    sink: &'a dyn LifecycleSink,
    cancel: &'a CancellationToken,
}

impl<'a> TrainingStage<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        store: &'a PopulationStore,
        sink: &'a dyn LifecycleSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            store,
            sink,
            cancel,
        }
    }

    /// Trains `population[i]` on `datasets[i]`, then saves every network.
    ///
    /// Networks without a dataset are left untouched. Returns one report per trained
    /// network, best mean error first.
    pub fn run(
        &self,
        population: &mut [Network],
        datasets: &[Vec<TrainData>],
    ) -> Result<Vec<TrainingReport>, StoreError> {
        let units = population.len().min(datasets.len());
        let cells = population[..units]
            .iter_mut()
            .map(Mutex::new)
            .collect::<Vec<_>>();
        let progress = (0..units)
            .map(|_| WorkerProgress::default())
            .collect::<Vec<_>>();
        let mut skipped = vec![0; units];

        let barrier = CompletionBarrier::new(units);
        thread::scope(|s| {
            for (unit, ((cell, dataset), skipped)) in
                cells.iter().zip(datasets).zip(&mut skipped).enumerate()
            {
                let barrier = &barrier;
                let progress = &progress[unit];
                s.spawn(move || {
                    let _guard = barrier.guard(unit);
                    *skipped = self.train(cell, dataset, progress);
                });
            }

            let mut last_checkpoint = Instant::now();
            barrier.wait(TICK, |_| {
                if last_checkpoint.elapsed() >= self.config.checkpoint_interval() {
                    self.checkpoint(&cells, &progress);
                    last_checkpoint = Instant::now();
                }
            });
        });

        let mut reports = cells
            .iter()
            .zip(&progress)
            .zip(&skipped)
            .map(|((cell, progress), &skipped)| TrainingReport {
                network: lock(cell).to_string(),
                samples: progress.processed(),
                skipped,
                mean_error: progress.mean_error(),
            })
            .collect::<Vec<_>>();
        drop(cells);

        for network in population.iter_mut() {
            self.store.save(network, true)?;
        }

        // Networks without samples go last.
        reports.sort_by(|a, b| match (a.mean_error, b.mean_error) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (a, b) => b.is_some().cmp(&a.is_some()),
        });
        self.sink.emit(LifecycleEvent::TrainingFinished {
            top: reports
                .iter()
                .take(TOP_LIST_SIZE)
                .map(|report| TrainingStanding {
                    network: report.network.clone(),
                    mean_error: report.mean_error,
                })
                .collect(),
        });
        Ok(reports)
    }

    /// Returns the number of skipped samples.
    fn train(
        &self,
        cell: &Mutex<&mut Network>,
        dataset: &[TrainData],
        progress: &WorkerProgress,
    ) -> usize {
        let (samples, skipped) = prepare(&lock(cell), dataset);

        let mut error_sum = 0.0_f64;
        let mut processed = 0_usize;
        for epoch in 1..=self.config.repeats {
            progress.epoch.store(epoch, Ordering::Relaxed);
            for (input, target) in &samples {
                if self.cancel.is_cancelled() {
                    return skipped;
                }
                let error = {
                    let mut network = lock(cell);
                    network.back_propagate(input, target);
                    (network.evaluate(input) - target[0]).abs()
                };
                error_sum += f64::from(error);
                processed += 1;
                #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
                let mean_error = (error_sum / processed as f64) as f32;
                progress.record(processed, mean_error);
            }
        }
        skipped
    }

    fn checkpoint(&self, cells: &[Mutex<&mut Network>], progress: &[WorkerProgress]) {
        for (cell, progress) in cells.iter().zip(progress) {
            let mut network = lock(cell);
            if let Err(err) = self.store.save(&mut network, true) {
                log::warn!("checkpoint of {} failed: {err}", **network);
                continue;
            }
            log::info!(
                "checkpoint: {} | epoch {}/{} | {} samples | mean error {}",
                **network,
                progress.epoch(),
                self.config.repeats,
                progress.processed(),
                progress
                    .mean_error()
                    .map_or_else(|| "-".to_owned(), |e| format!("{e:.5}"))
            );
        }
    }
}
