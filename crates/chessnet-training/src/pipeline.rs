//! The phase controller.
//!
//! [`Pipeline`] owns the population and runs Analysis → Training → Duel → Analysis
//! until it is cancelled or has run the requested number of cycles. Datasets
//! produced by the analysis phase live only until the following training phase.

use std::mem;

use chessnet_engine::{CancellationToken, PositionEvaluator};
use chessnet_network::Network;
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;

use crate::{
    PipelineError,
    analysis::{AnalysisStage, TrainData},
    config::PipelineConfig,
    duel::DuelStage,
    events::{LifecycleEvent, LifecycleSink},
    store::PopulationStore,
    training::TrainingStage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Phase {
    #[display("analysis")]
    Analysis,
    #[display("training")]
    Training,
    #[display("duel")]
    Duel,
}

impl Phase {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Analysis => Self::Training,
            Self::Training => Self::Duel,
            Self::Duel => Self::Analysis,
        }
    }
}

pub struct Pipeline<T> {
    config: PipelineConfig,
    store: PopulationStore,
    trainer: T,
    sink: Box<dyn LifecycleSink>,
    cancel: CancellationToken,
    rng: Pcg64Mcg,
    population: Vec<Network>,
    datasets: Vec<Vec<TrainData>>,
    phase: Phase,
}

impl<T> Pipeline<T>
where
    T: PositionEvaluator + Sync,
{
    /// Validates the configuration and loads the stored population.
    ///
    /// An empty store is fine: the first duel phase fills the population up to
    /// `max_networks`.
    pub fn new(
        config: PipelineConfig,
        trainer: T,
        sink: Box<dyn LifecycleSink>,
        cancel: CancellationToken,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = PopulationStore::new(config.store.clone());
        let population = store.list_all()?;
        log::info!(
            "loaded {} networks from {}",
            population.len(),
            store.directory().display()
        );
        let rng = Pcg64Mcg::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        Ok(Self {
            config,
            store,
            trainer,
            sink,
            cancel,
            rng,
            population,
            datasets: vec![],
            phase: Phase::Analysis,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &PopulationStore {
        &self.store
    }

    #[must_use]
    pub fn population(&self) -> &[Network] {
        &self.population
    }

    /// Datasets of the last analysis phase, consumed by the next training phase.
    #[must_use]
    pub fn datasets(&self) -> &[Vec<TrainData>] {
        &self.datasets
    }

    /// The phase the next [`Pipeline::run_phase`] call runs.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the current phase and advances to the next one. Returns the phase that
    /// ran.
    pub fn run_phase(&mut self) -> Result<Phase, PipelineError> {
        let phase = self.phase;
        self.sink.emit(LifecycleEvent::PhaseStarted(phase));
        match phase {
            Phase::Analysis => {
                self.datasets = AnalysisStage::new(&self.config, &self.trainer, &self.cancel)
                    .run(&self.population, &mut self.rng);
            }
            Phase::Training => {
                let datasets = mem::take(&mut self.datasets);
                TrainingStage::new(&self.config, &self.store, &*self.sink, &self.cancel)
                    .run(&mut self.population, &datasets)?;
            }
            Phase::Duel => {
                DuelStage::new(&self.config, &self.store, &*self.sink, &self.cancel)
                    .run(&mut self.population, &mut self.rng)?;
            }
        }
        log::debug!("{phase} phase finished");
        self.phase = phase.next();
        Ok(phase)
    }

    /// Runs phases until the pipeline is back at the analysis phase.
    ///
    /// Returns `false` when the cycle was cut short by cancellation.
    pub fn run_cycle(&mut self) -> Result<bool, PipelineError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            self.run_phase()?;
            if self.phase == Phase::Analysis {
                return Ok(!self.cancel.is_cancelled());
            }
        }
    }

    /// Runs cycles until cancelled, or until `cycles` cycles have completed.
    ///
    /// Returns the number of completed cycles.
    pub fn run(&mut self, cycles: Option<usize>) -> Result<usize, PipelineError> {
        let mut completed = 0;
        while cycles.is_none_or(|limit| completed < limit) {
            if !self.run_cycle()? {
                log::info!("pipeline cancelled after {completed} cycles");
                break;
            }
            completed += 1;
            log::info!(
                "cycle {completed} finished with {} networks",
                self.population.len()
            );
        }
        Ok(completed)
    }
}
