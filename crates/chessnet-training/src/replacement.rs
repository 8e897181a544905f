//! Banded population replacement after the duels.
//!
//! The population arrives sorted by fitness, best first. With `N` networks,
//! `K = elite_count`, `M = max_networks`, `d = not_editing_divisor` and
//! `D = destroy_count`, the ranks are split into bands:
//!
//! | Band      | Ranks                      | Fate                                      |
//! |-----------|----------------------------|-------------------------------------------|
//! | elite     | `0..min(K, N)`             | kept, crossover partners                  |
//! | preserved | `0..p`                     | kept                                      |
//! | evolved   | `p..max(p, n - D)`         | replaced by a crossover child             |
//! | destroyed | `max(p, n - D)..n`         | replaced by a fresh random network        |
//! | evicted   | `n..N`                     | deleted                                   |
//!
//! where `n = min(N, M)` and `p = min(n, K + (n - K) / d)`. The population is then
//! refilled with fresh networks up to exactly `M` members.

use std::{mem, ops::Range};

use chessnet_network::{Network, genetic};
use rand::Rng;

use crate::{
    PipelineError,
    config::PipelineConfig,
    events::{LifecycleEvent, LifecycleSink},
    store::PopulationStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementPolicy {
    pub max_networks: usize,
    pub elite_count: usize,
    pub not_editing_divisor: usize,
    pub destroy_count: usize,
}

/// Band boundaries for one population size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPlan {
    pub elite: usize,
    pub preserved: usize,
    pub evolved: Range<usize>,
    pub destroyed: Range<usize>,
    pub evicted: Range<usize>,
    pub created: usize,
}

impl ReplacementPolicy {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_networks: config.max_networks,
            elite_count: config.elite_count,
            not_editing_divisor: config.not_editing_divisor,
            destroy_count: config.destroy_count,
        }
    }

    /// Computes the bands for a population of `population_size` networks.
    #[must_use]
    pub fn plan(&self, population_size: usize) -> ReplacementPlan {
        let kept = population_size.min(self.max_networks);
        let divisor = self.not_editing_divisor.max(1);
        let preserved = kept
            .min(self.elite_count + kept.saturating_sub(self.elite_count) / divisor);
        let destroy_from = preserved.max(kept.saturating_sub(self.destroy_count));
        ReplacementPlan {
            elite: self.elite_count.min(population_size),
            preserved,
            evolved: preserved..destroy_from,
            destroyed: destroy_from..kept,
            evicted: kept..population_size,
            created: self.max_networks - kept,
        }
    }

    /// Applies the plan to a population sorted by fitness (best first).
    ///
    /// Every new network is saved without overwriting, every removed network's file
    /// is deleted. Afterwards `population.len() == max_networks`.
    pub fn apply<R>(
        &self,
        population: &mut Vec<Network>,
        store: &PopulationStore,
        sink: &dyn LifecycleSink,
        rng: &mut R,
    ) -> Result<ReplacementPlan, PipelineError>
    where
        R: Rng + ?Sized,
    {
        let plan = self.plan(population.len());
        let elite = population[..plan.elite].to_vec();

        for network in population.drain(plan.evicted.clone()) {
            store.delete(&network)?;
            sink.emit(LifecycleEvent::Destroyed {
                network: network.to_string(),
            });
        }

        for rank in plan.evolved.clone() {
            let current = &population[rank];
            let partner = elite
                .iter()
                .find(|e| e.same_architecture(current))
                .unwrap_or(current);
            let partner_name = partner.to_string();
            let child = genetic::crossover(current, partner, rng)?;

            let parent = mem::replace(&mut population[rank], child);
            store.delete(&parent)?;
            store.save(&mut population[rank], false)?;
            sink.emit(LifecycleEvent::Evolved {
                parent1: parent.to_string(),
                parent2: partner_name,
                child: population[rank].to_string(),
            });
        }

        for rank in plan.destroyed.clone() {
            let removed = mem::replace(&mut population[rank], genetic::random_network(rng));
            store.delete(&removed)?;
            store.save(&mut population[rank], false)?;
            sink.emit(LifecycleEvent::Replaced {
                removed: removed.to_string(),
                added: population[rank].to_string(),
            });
        }

        while population.len() < self.max_networks {
            let mut network = genetic::random_network(rng);
            store.save(&mut network, false)?;
            sink.emit(LifecycleEvent::Created {
                network: network.to_string(),
            });
            population.push(network);
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use chessnet_network::Activation;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{config::StoreConfig, events::testing::MemorySink};

    fn policy(m: usize, k: usize, d: usize, destroy: usize) -> ReplacementPolicy {
        ReplacementPolicy {
            max_networks: m,
            elite_count: k,
            not_editing_divisor: d,
            destroy_count: destroy,
        }
    }

    #[test]
    fn test_plan_default_bands() {
        let plan = policy(16, 4, 3, 2).plan(16);
        assert_eq!(
            plan,
            ReplacementPlan {
                elite: 4,
                preserved: 8,
                evolved: 8..14,
                destroyed: 14..16,
                evicted: 16..16,
                created: 0,
            }
        );
    }

    #[test]
    fn test_plan_small_populations() {
        // Fewer networks than elites: everything is kept and refilled.
        let plan = policy(16, 4, 3, 2).plan(3);
        assert_eq!(plan.elite, 3);
        assert_eq!(plan.preserved, 3);
        assert!(plan.evolved.is_empty());
        assert!(plan.destroyed.is_empty());
        assert_eq!(plan.created, 13);

        let plan = policy(16, 4, 3, 2).plan(0);
        assert_eq!(plan.preserved, 0);
        assert_eq!(plan.created, 16);

        // The destroyed band never reaches into the preserved ranks.
        let plan = policy(6, 4, 1, 10).plan(6);
        assert_eq!(plan.preserved, 6);
        assert_eq!(plan.destroyed, 6..6);

        let plan = policy(10, 2, 4, 5).plan(10);
        assert_eq!(plan.preserved, 4);
        assert_eq!(plan.evolved, 4..5);
        assert_eq!(plan.destroyed, 5..10);
    }

    #[test]
    fn test_plan_oversized_population() {
        let plan = policy(16, 4, 3, 2).plan(20);
        assert_eq!(plan.evicted, 16..20);
        assert_eq!(plan.preserved, 8);
        assert_eq!(plan.destroyed, 14..16);
        assert_eq!(plan.created, 0);
    }

    #[test]
    fn test_plan_without_elites() {
        let plan = policy(9, 0, 3, 3).plan(9);
        assert_eq!(plan.elite, 0);
        assert_eq!(plan.preserved, 3);
        assert_eq!(plan.evolved, 3..6);
        assert_eq!(plan.destroyed, 6..9);
    }

    #[test]
    fn test_plan_bands_partition_ranks() {
        for m in 1..10 {
            for k in 0..=m {
                for n in 0..14 {
                    let plan = policy(m, k, 2, 2).plan(n);
                    assert_eq!(plan.evolved.start, plan.preserved);
                    assert_eq!(plan.evolved.end, plan.destroyed.start);
                    assert_eq!(plan.destroyed.end, plan.evicted.start);
                    assert_eq!(plan.evicted.end, n);
                    assert_eq!(plan.evicted.start + plan.created, m);
                    assert!(plan.preserved >= plan.elite.min(m));
                }
            }
        }
    }

    fn ranked_population(rng: &mut Pcg64Mcg, count: usize) -> Vec<Network> {
        (0..count)
            .map(|i| {
                let mut network = Network::random(
                    rng,
                    vec![64, 4, 1],
                    vec![Activation::Tanh; 2],
                    format!("Rank {i}"),
                )
                .unwrap();
                #[expect(clippy::cast_precision_loss)]
                let fitness = (count - i) as f32;
                network.set_fitness(fitness);
                network
            })
            .collect()
    }

    fn test_store(dir: &tempfile::TempDir) -> PopulationStore {
        PopulationStore::new(StoreConfig {
            directory: dir.path().to_owned(),
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_apply_keeps_elites_and_refills() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let sink = MemorySink::default();
        let mut rng = Pcg64Mcg::seed_from_u64(5);

        let mut population = ranked_population(&mut rng, 8);
        for network in &mut population {
            store.save(network, false).unwrap();
        }
        let before = population.clone();

        let policy = policy(8, 2, 3, 2);
        let plan = policy
            .apply(&mut population, &store, &sink, &mut rng)
            .unwrap();
        assert_eq!(plan.evolved, 4..6);
        assert_eq!(plan.destroyed, 6..8);

        assert_eq!(population.len(), 8);
        for (old, new) in before.iter().zip(&population).take(plan.preserved) {
            assert_eq!(old.name(), new.name());
            assert!(old.weights().eq(new.weights()));
        }
        for rank in plan.evolved.clone() {
            let child = &population[rank];
            assert_eq!(child.identity().parent1, format!("Rank {rank}"));
            // Every network shares one architecture, so the best elite is the partner.
            assert_eq!(child.identity().parent2, "Rank 0");
            assert_eq!(child.identity().generation, 1);
        }

        let events = sink.events();
        let evolved = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Evolved { .. }))
            .count();
        let replaced = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Replaced { .. }))
            .count();
        assert_eq!((evolved, replaced), (2, 2));

        let on_disk = store.list_all().unwrap();
        assert_eq!(on_disk.len(), 8);
        for rank in 4..8 {
            assert!(!on_disk.iter().any(|n| n.name() == format!("Rank {rank}")));
        }
    }

    fn two_board_network(rng: &mut Pcg64Mcg, rank: usize, fitness: f32) -> Network {
        let mut network = Network::random(
            rng,
            vec![128, 4, 1],
            vec![Activation::Tanh; 2],
            format!("Rank {rank}"),
        )
        .unwrap();
        network.set_fitness(fitness);
        network
    }

    #[test]
    fn test_evolved_without_matching_elite_crosses_with_itself() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let sink = MemorySink::default();
        let mut rng = Pcg64Mcg::seed_from_u64(8);

        let mut population = ranked_population(&mut rng, 8);
        population[4] = two_board_network(&mut rng, 4, 4.0);
        for network in &mut population {
            store.save(network, false).unwrap();
        }

        policy(8, 2, 3, 2)
            .apply(&mut population, &store, &sink, &mut rng)
            .unwrap();

        let child = &population[4];
        assert_eq!(child.layer_sizes(), [128, 4, 1]);
        assert_eq!(child.identity().parent1, "Rank 4");
        assert_eq!(child.identity().parent2, "Rank 4");
        assert_eq!(population[5].identity().parent2, "Rank 0");
        assert!(sink.events().contains(&LifecycleEvent::Evolved {
            parent1: "Rank 4 (0)".to_owned(),
            parent2: "Rank 4 (0)".to_owned(),
            child: child.to_string(),
        }));
    }

    #[test]
    fn test_evolved_picks_elite_with_same_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let sink = MemorySink::default();
        let mut rng = Pcg64Mcg::seed_from_u64(9);

        let mut population = ranked_population(&mut rng, 8);
        population[1] = two_board_network(&mut rng, 1, 7.0);
        population[4] = two_board_network(&mut rng, 4, 4.0);
        for network in &mut population {
            store.save(network, false).unwrap();
        }

        policy(8, 2, 3, 2)
            .apply(&mut population, &store, &sink, &mut rng)
            .unwrap();

        assert_eq!(population[4].layer_sizes(), [128, 4, 1]);
        assert_eq!(population[4].identity().parent2, "Rank 1");
        assert_eq!(population[5].layer_sizes(), [64, 4, 1]);
        assert_eq!(population[5].identity().parent2, "Rank 0");
    }

    #[test]
    fn test_apply_evicts_and_bootstraps() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let sink = MemorySink::default();
        let mut rng = Pcg64Mcg::seed_from_u64(6);

        let mut population = ranked_population(&mut rng, 5);
        for network in &mut population {
            store.save(network, false).unwrap();
        }
        policy(3, 3, 1, 0)
            .apply(&mut population, &store, &sink, &mut rng)
            .unwrap();
        assert_eq!(population.len(), 3);
        assert_eq!(
            sink.events(),
            vec![
                LifecycleEvent::Destroyed {
                    network: "Rank 3 (0)".to_owned()
                },
                LifecycleEvent::Destroyed {
                    network: "Rank 4 (0)".to_owned()
                },
            ]
        );
        assert_eq!(store.list_all().unwrap().len(), 3);

        let mut empty = vec![];
        policy(4, 2, 3, 2)
            .apply(&mut empty, &store, &sink, &mut rng)
            .unwrap();
        assert_eq!(empty.len(), 4);
        assert_eq!(store.list_all().unwrap().len(), 7);
    }

    #[test]
    fn test_apply_sizes_for_any_population() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let sink = MemorySink::default();
        let mut rng = Pcg64Mcg::seed_from_u64(7);

        for n in 0..7 {
            let mut population = ranked_population(&mut rng, n);
            let elite = population
                .iter()
                .take(2)
                .map(|network| network.name().to_owned())
                .collect::<Vec<_>>();
            policy(4, 2, 2, 1)
                .apply(&mut population, &store, &sink, &mut rng)
                .unwrap();
            assert_eq!(population.len(), 4);
            assert!(population.iter().zip(&elite).all(|(kept, name)| kept.name() == name));
        }
    }
}
