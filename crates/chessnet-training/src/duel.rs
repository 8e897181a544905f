//! Round-robin duels between networks.
//!
//! The population is split into three rotation lists: `White`, `Black` (⌊N/2⌋
//! networks each) and `Queue` (the remainder). In each iteration `White[i]` plays
//! `Black[i]` on its own board, all boards concurrently. When every board has
//! finished, the results are applied:
//!
//! - win: `+1` fitness, draw: `+0.5` fitness for both sides
//! - the persistent win/draw/loss record of both networks is updated
//!
//! The networks are then ranked by fitness, persisted and the lists are rotated
//! ([`DuelLists::rotate`]) so the next iteration brings new pairings. Aborted games
//! (cancellation, a player without a move) count for nobody.
//!
//! After the last iteration the population is reordered by rank and handed to the
//! [`ReplacementPolicy`].

use std::{collections::VecDeque, thread};

use chessnet_engine::{
    CancellationToken, Color, GameResult, GameSettings, NetworkEvaluator, SearchPlayer, game,
};
use chessnet_network::Network;
use rand::{Rng, seq::SliceRandom as _};

use crate::{
    PipelineError,
    barrier::{CompletionBarrier, TICK},
    config::PipelineConfig,
    events::{DuelStanding, LifecycleEvent, LifecycleSink},
    replacement::ReplacementPolicy,
    store::PopulationStore,
};

const TOP_LIST_SIZE: usize = 5;

const WIN_FITNESS: f32 = 1.0;
const DRAW_FITNESS: f32 = 0.5;

/// Population indices split into the three rotation lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelLists {
    white: VecDeque<usize>,
    black: VecDeque<usize>,
    queue: VecDeque<usize>,
}

impl DuelLists {
    /// Randomly partitions the indices `0..population_size`.
    pub fn partition<R>(population_size: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut indices = (0..population_size).collect::<Vec<_>>();
        indices.shuffle(rng);
        let half = population_size / 2;
        let mut rest = indices.into_iter();
        Self {
            white: rest.by_ref().take(half).collect(),
            black: rest.by_ref().take(half).collect(),
            queue: VecDeque::from(rest.collect::<Vec<_>>()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.white.len() + self.black.len() + self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn white(&self) -> &VecDeque<usize> {
        &self.white
    }

    #[must_use]
    pub fn black(&self) -> &VecDeque<usize> {
        &self.black
    }

    #[must_use]
    pub fn queue(&self) -> &VecDeque<usize> {
        &self.queue
    }

    /// `(white, black)` index pairs, one per board.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.white.iter().copied().zip(self.black.iter().copied())
    }

    /// White, then Black, then Queue. Ties in the ranking keep this order.
    pub fn ranking_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.white
            .iter()
            .chain(&self.black)
            .chain(&self.queue)
            .copied()
    }

    /// Moves `White[0]` and `Black[last]` to the back of the queue, then the queue
    /// head to the front of `Black` and the next queue head to the back of `White`.
    ///
    /// List sizes are unchanged. Populations of fewer than two networks are left as
    /// they are.
    pub fn rotate(&mut self) {
        if self.len() < 2 {
            return;
        }
        if let Some(first_white) = self.white.pop_front() {
            self.queue.push_back(first_white);
        }
        if let Some(last_black) = self.black.pop_back() {
            self.queue.push_back(last_black);
        }
        if let Some(next) = self.queue.pop_front() {
            self.black.push_front(next);
        }
        if let Some(next) = self.queue.pop_front() {
            self.white.push_back(next);
        }
    }
}

struct Board {
    white: usize,
    black: usize,
    white_seed: u64,
    black_seed: u64,
}

pub struct DuelStage<'a> {
    config: &'a PipelineConfig,
    store: &'a PopulationStore,
    sink: &'a dyn LifecycleSink,
    cancel: &'a CancellationToken,
}

impl<'a> DuelStage<'a> {
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

    /// Runs `duel_iterations` rounds, then ranks and replaces the population.
    ///
    /// On return the population is ordered by rank (best first) and, unless the stage
    /// was cancelled, holds exactly `max_networks` networks.
    pub fn run<R>(&self, population: &mut Vec<Network>, rng: &mut R) -> Result<(), PipelineError>
    where
        R: Rng + ?Sized,
    {
        for network in population.iter_mut() {
            network.set_fitness(0.0);
        }
        let mut lists = DuelLists::partition(population.len(), rng);
        let mut ranking = lists.ranking_order().collect::<Vec<_>>();

        let total = self.config.duel_iterations;
        for iteration in 1..=total {
            if self.cancel.is_cancelled() {
                break;
            }
            let boards = lists
                .pairs()
                .map(|(white, black)| Board {
                    white,
                    black,
                    white_seed: rng.random(),
                    black_seed: rng.random(),
                })
                .collect::<Vec<_>>();
            let results = self.play_boards(population, &boards);
            for (board, result) in boards.iter().zip(results) {
                if let Some(result) = result {
                    apply_result(population, board.white, board.black, result);
                }
            }

            ranking = rank(population, &lists);
            self.sink.emit(LifecycleEvent::DuelRound {
                iteration,
                total,
                top: ranking
                    .iter()
                    .take(TOP_LIST_SIZE)
                    .map(|&index| DuelStanding {
                        network: population[index].to_string(),
                        fitness: population[index].fitness(),
                        record: *population[index].record(),
                    })
                    .collect(),
            });
            for network in population.iter_mut() {
                self.store.save(network, true)?;
            }
            lists.rotate();
        }

        reorder(population, &ranking);
        if self.cancel.is_cancelled() {
            log::warn!("duels cancelled; skipping population replacement");
            return Ok(());
        }
        ReplacementPolicy::from_config(self.config).apply(population, self.store, self.sink, rng)?;
        Ok(())
    }

    /// Plays every board concurrently. `None` marks a game that did not finish.
    fn play_boards(&self, population: &[Network], boards: &[Board]) -> Vec<Option<GameResult>> {
        let settings = GameSettings {
            clock: self.config.duel_clock(),
            max_plies: self.config.max_plies,
        };
        let depth = self.config.search_depth;

        let barrier = CompletionBarrier::new(boards.len());
        let mut results = vec![None; boards.len()];
        thread::scope(|s| {
            for (unit, (board, result)) in boards.iter().zip(&mut results).enumerate() {
                let barrier = &barrier;
                let settings = &settings;
                let white_network = &population[board.white];
                let black_network = &population[board.black];
                s.spawn(move || {
                    let _guard = barrier.guard(unit);
                    let mut white = SearchPlayer::new(
                        NetworkEvaluator::new(white_network),
                        depth,
                        board.white_seed,
                    );
                    let mut black = SearchPlayer::new(
                        NetworkEvaluator::new(black_network),
                        depth,
                        board.black_seed,
                    );
                    let outcome = game::play(&mut white, &mut black, settings, self.cancel);
                    log::debug!(
                        "{white_network} vs {black_network}: {} after {} plies",
                        outcome.result,
                        outcome.plies
                    );
                    if !outcome.result.is_aborted() {
                        *result = Some(outcome.result);
                    }
                });
            }
            barrier.wait(TICK, |_| {});
        });
        results
    }
}

fn apply_result(population: &mut [Network], white: usize, black: usize, result: GameResult) {
    let (winner, loser) = match result.winner() {
        Some(Color::White) => (white, black),
        Some(Color::Black) => (black, white),
        None => {
            for index in [white, black] {
                let network = &mut population[index];
                network.record_mut().draws += 1;
                network.set_fitness(network.fitness() + DRAW_FITNESS);
            }
            return;
        }
    };
    let network = &mut population[winner];
    network.record_mut().wins += 1;
    network.set_fitness(network.fitness() + WIN_FITNESS);
    population[loser].record_mut().losses += 1;
}

/// Population indices by descending fitness, ties in White, Black, Queue order.
fn rank(population: &[Network], lists: &DuelLists) -> Vec<usize> {
    let mut ranking = lists.ranking_order().collect::<Vec<_>>();
    ranking.sort_by(|&a, &b| population[b].fitness().total_cmp(&population[a].fitness()));
    ranking
}

/// Reorders the population so that `population[i]` is the network at `ranking[i]`.
fn reorder(population: &mut Vec<Network>, ranking: &[usize]) {
    let mut position = vec![0; population.len()];
    for (rank, &index) in ranking.iter().enumerate() {
        position[index] = rank;
    }
    let mut ranked = population.drain(..).zip(position).collect::<Vec<_>>();
    ranked.sort_by_key(|&(_, rank)| rank);
    population.extend(ranked.into_iter().map(|(network, _)| network));
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chessnet_network::Activation;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{config::StoreConfig, events::testing::MemorySink};

    fn lists(white: &[usize], black: &[usize], queue: &[usize]) -> DuelLists {
        DuelLists {
            white: white.iter().copied().collect(),
            black: black.iter().copied().collect(),
            queue: queue.iter().copied().collect(),
        }
    }

    #[test]
    fn test_partition_sizes() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        for n in 0..12 {
            let lists = DuelLists::partition(n, &mut rng);
            assert_eq!(lists.white().len(), n / 2);
            assert_eq!(lists.black().len(), n / 2);
            assert_eq!(lists.queue().len(), n % 2);
            let all = lists.ranking_order().collect::<HashSet<_>>();
            assert_eq!(all, (0..n).collect());
        }
    }

    #[test]
    fn test_rotate_moves() {
        let mut l = lists(&[0, 1], &[2, 3], &[4]);
        l.rotate();
        // 0 and 3 join the queue behind 4; 4 goes to Black, 0 to White.
        assert_eq!(l, lists(&[1, 0], &[4, 2], &[3]));
    }

    #[test]
    fn test_rotate_two_networks_swaps_colours() {
        let mut l = lists(&[0], &[1], &[]);
        l.rotate();
        assert_eq!(l, lists(&[1], &[0], &[]));
        l.rotate();
        assert_eq!(l, lists(&[0], &[1], &[]));
    }

    #[test]
    fn test_rotate_skipped_below_two() {
        let mut l = lists(&[], &[], &[7]);
        l.rotate();
        assert_eq!(l, lists(&[], &[], &[7]));
        let mut empty = lists(&[], &[], &[]);
        empty.rotate();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_rotation_closure() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        for n in 2..15 {
            let mut l = DuelLists::partition(n, &mut rng);
            let sizes = (l.white().len(), l.black().len(), l.queue().len());
            for _ in 0..3 * n {
                l.rotate();
                assert_eq!((l.white().len(), l.black().len(), l.queue().len()), sizes);
                let all = l.ranking_order().collect::<HashSet<_>>();
                assert_eq!(all.len(), n);
            }
        }
    }

    fn network(name: &str) -> Network {
        Network::new(vec![64, 4, 1], vec![Activation::Tanh; 2], name).unwrap()
    }

    #[test]
    fn test_rotation_after_partition_keeps_every_network() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut duel = DuelLists::partition(4, &mut rng);
        for _ in 0..8 {
            duel.rotate();
            let seen = duel.ranking_order().collect::<HashSet<_>>();
            assert_eq!(seen, (0..4).collect::<HashSet<_>>());
            assert_eq!(duel.len(), 4);
            assert_eq!((duel.white().len(), duel.black().len()), (2, 2));
        }
    }

    #[test]
    fn test_apply_result_and_rank() {
        let mut population = vec![network("A"), network("B"), network("C"), network("D")];
        apply_result(&mut population, 0, 1, GameResult::BlackIsMated);
        apply_result(&mut population, 2, 3, GameResult::Repetition);
        apply_result(
            &mut population,
            3,
            2,
            GameResult::TimeIsUp {
                loser: Color::White,
            },
        );

        assert_eq!(population[0].fitness(), 1.0);
        assert_eq!(population[0].record().wins, 1);
        assert_eq!(population[1].record().losses, 1);
        assert_eq!(population[2].fitness(), 1.5);
        assert_eq!(population[3].fitness(), 0.5);
        assert_eq!(population[3].record().draws, 1);
        assert_eq!(population[3].record().losses, 1);

        // 0 and 1 tie at 1.0; ties keep White, Black, Queue order.
        population[1].set_fitness(1.0);
        let ranking = rank(&population, &lists(&[3, 0], &[1], &[2]));
        assert_eq!(ranking, vec![2, 0, 1, 3]);

        reorder(&mut population, &ranking);
        let names = population.iter().map(Network::name).collect::<Vec<_>>();
        assert_eq!(names, ["C", "A", "B", "D"]);
    }

    #[test]
    fn test_duel_stage_keeps_population_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            duel_iterations: 2,
            duel_seconds: 2,
            max_plies: 8,
            search_depth: 1,
            max_networks: 5,
            elite_count: 2,
            store: StoreConfig {
                directory: dir.path().to_owned(),
                ..StoreConfig::default()
            },
            ..PipelineConfig::default()
        };
        let store = PopulationStore::new(config.store.clone());
        let sink = MemorySink::default();
        let cancel = CancellationToken::new();
        let mut rng = Pcg64Mcg::seed_from_u64(8);

        let mut population = (0..4)
            .map(|i| network(&format!("Duelist {i}")))
            .collect::<Vec<_>>();
        DuelStage::new(&config, &store, &sink, &cancel)
            .run(&mut population, &mut rng)
            .unwrap();

        assert_eq!(population.len(), 5);
        let rounds = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::DuelRound { iteration, top, .. } => Some((iteration, top)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].0, 2);
        // Two boards per round, both eight plies at most: every game counts.
        let games = rounds[1].1.iter().map(|s| s.record.games()).sum::<u32>();
        assert_eq!(games, 8);
        assert!(
            rounds[1]
                .1
                .windows(2)
                .all(|w| w[0].fitness >= w[1].fitness)
        );
        assert_eq!(store.list_all().unwrap().len(), 5);
    }
}
