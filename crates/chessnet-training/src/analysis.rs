//! Self-play analysis: harvesting labeled positions.
//!
//! Every network plays one game against the reference trainer, with a random colour.
//! While the network searches, each position it evaluates is also scored by the
//! trainer, producing a [`TrainData`] sample:
//!
//! - `true_evaluation` - the trainer's score, from white's point of view
//! - `network_error` - `|network score - true_evaluation|`, both from white's point
//!   of view
//!
//! Games run concurrently, one scoped worker per network. The control thread waits on
//! a [`CompletionBarrier`] and then [`curate`]s each network's samples: duplicates
//! (same FEN) are dropped keeping the first occurrence, the rest is sorted by
//! descending error and capped at `dataset_size`. Training therefore focuses on the
//! positions the network misjudges the most.

use std::{cell::RefCell, collections::HashSet, thread};

use chessnet_engine::{
    CancellationToken, GameSettings, NetworkEvaluator, Position, PositionEvaluator, SearchPlayer,
    evaluator, game,
};
use chessnet_network::Network;
use rand::Rng;

use crate::{
    barrier::{CompletionBarrier, TICK},
    config::PipelineConfig,
};

/// A position labeled by the trainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainData {
    pub fen: String,
    /// Trainer score in centipawns, white's point of view.
    pub true_evaluation: i32,
    pub network_error: i32,
}

/// De-duplicates by FEN (first occurrence wins), sorts by descending
/// `network_error` (stable) and keeps at most `cap` samples.
#[must_use]
pub fn curate(samples: Vec<TrainData>, cap: usize) -> Vec<TrainData> {
    let mut seen = HashSet::new();
    let mut unique = samples
        .into_iter()
        .filter(|sample| seen.insert(sample.fen.clone()))
        .collect::<Vec<_>>();
    unique.sort_by(|a, b| b.network_error.cmp(&a.network_error));
    unique.truncate(cap);
    unique
}

/// Network evaluator that records a trainer-labeled sample for every position it
/// scores.
struct GradedEvaluator<'a, T: ?Sized> {
    network: NetworkEvaluator<'a>,
    trainer: &'a T,
    samples: RefCell<Vec<TrainData>>,
}

impl<'a, T> GradedEvaluator<'a, T>
where
    T: PositionEvaluator + ?Sized,
{
    fn new(network: &'a Network, trainer: &'a T) -> Self {
        Self {
            network: NetworkEvaluator::new(network),
            trainer,
            samples: RefCell::new(vec![]),
        }
    }

    fn into_samples(self) -> Vec<TrainData> {
        self.samples.into_inner()
    }
}

impl<T> PositionEvaluator for GradedEvaluator<'_, T>
where
    T: PositionEvaluator + ?Sized,
{
    fn evaluate(&self, position: &Position) -> i32 {
        let network_score = self.network.white_score(position);
        let true_evaluation =
            evaluator::from_white_perspective(position, self.trainer.evaluate(position));
        let network_error =
            i32::try_from(network_score.abs_diff(true_evaluation)).unwrap_or(i32::MAX);
        self.samples.borrow_mut().push(TrainData {
            fen: position.to_fen(),
            true_evaluation,
            network_error,
        });
        self.network.evaluate(position)
    }
}

#[derive(Debug)]
pub struct AnalysisStage<'a, T: ?Sized> {
    config: &'a PipelineConfig,
    trainer: &'a T,
    cancel: &'a CancellationToken,
}

struct WorkerPlan {
    network_is_white: bool,
    network_seed: u64,
    trainer_seed: u64,
}

impl<'a, T> AnalysisStage<'a, T>
where
    T: PositionEvaluator + Sync + ?Sized,
{
    pub fn new(config: &'a PipelineConfig, trainer: &'a T, cancel: &'a CancellationToken) -> Self {
        Self {
            config,
            trainer,
            cancel,
        }
    }

    /// Plays one game per network and returns the curated dataset of each network,
    /// in population order.
    pub fn run<R>(&self, population: &[Network], rng: &mut R) -> Vec<Vec<TrainData>>
    where
        R: Rng + ?Sized,
    {
        let plans = population
            .iter()
            .map(|_| WorkerPlan {
                network_is_white: rng.random_bool(0.5),
                network_seed: rng.random(),
                trainer_seed: rng.random(),
            })
            .collect::<Vec<_>>();
        let settings = GameSettings {
            clock: self.config.self_play_clock(),
            max_plies: self.config.max_plies,
        };

        let barrier = CompletionBarrier::new(population.len());
        let mut datasets = vec![vec![]; population.len()];
        thread::scope(|s| {
            for (unit, ((network, plan), dataset)) in population
                .iter()
                .zip(&plans)
                .zip(&mut datasets)
                .enumerate()
            {
                let barrier = &barrier;
                let settings = &settings;
                s.spawn(move || {
                    let _guard = barrier.guard(unit);
                    let samples = self.analyse(network, plan, settings);
                    *dataset = curate(samples, self.config.dataset_size);
                    log::debug!("{network}: {} curated positions", dataset.len());
                });
            }

            let mut reported = 0;
            barrier.wait(TICK, |barrier| {
                let finished = barrier.finished();
                if finished != reported {
                    reported = finished;
                    log::debug!("analysis: {finished}/{} games finished", barrier.len());
                }
            });
        });

        datasets
    }

    fn analyse(&self, network: &Network, plan: &WorkerPlan, settings: &GameSettings) -> Vec<TrainData> {
        let depth = self.config.search_depth;
        let mut network_player =
            SearchPlayer::new(GradedEvaluator::new(network, self.trainer), depth, plan.network_seed);
        let mut trainer_player = SearchPlayer::new(self.trainer, depth, plan.trainer_seed);

        let outcome = if plan.network_is_white {
            game::play(&mut network_player, &mut trainer_player, settings, self.cancel)
        } else {
            game::play(&mut trainer_player, &mut network_player, settings, self.cancel)
        };
        let samples = network_player.into_evaluator().into_samples();
        log::info!(
            "{network} played {} against the trainer: {} after {} plies, {} positions graded",
            if plan.network_is_white { "white" } else { "black" },
            outcome.result,
            outcome.plies,
            samples.len()
        );
        samples
    }
}
