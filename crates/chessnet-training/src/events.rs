//! Lifecycle notifications.
//!
//! Stages report what happens to the population (phase changes, networks created,
//! destroyed, replaced or evolved, top lists) as [`LifecycleEvent`] values sent to a
//! [`LifecycleSink`]. [`LogSink`] renders them through the `log` facade in the
//! configured [`Language`]; other sinks can collect them for a UI or for tests.

use std::{fmt::Write as _, sync::Arc};

use chessnet_network::Record;

use crate::{config::Language, pipeline::Phase};

#[derive(Debug, Clone, PartialEq)]
pub struct DuelStanding {
    pub network: String,
    pub fitness: f32,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStanding {
    pub network: String,
    pub mean_error: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    PhaseStarted(Phase),
    /// A fresh network joined the population to refill it.
    Created { network: String },
    /// A network was removed without a replacement.
    Destroyed { network: String },
    /// A network was replaced by a fresh random one.
    Replaced { removed: String, added: String },
    /// A network was replaced by a crossover child.
    Evolved {
        parent1: String,
        parent2: String,
        child: String,
    },
    DuelRound {
        iteration: usize,
        total: usize,
        top: Vec<DuelStanding>,
    },
    TrainingFinished { top: Vec<TrainingStanding> },
}

impl LifecycleEvent {
    #[must_use]
    pub fn message(&self, language: Language) -> String {
        use Language::{English, Russian};

        match (self, language) {
            (Self::PhaseStarted(phase), _) => phase_message(*phase, language).to_owned(),
            (Self::Created { network }, English) => format!("Added new network {network}."),
            (Self::Created { network }, Russian) => format!("Добавлена новая сеть {network}."),
            (Self::Destroyed { network }, English) => format!("Network {network} removed!"),
            (Self::Destroyed { network }, Russian) => format!("Сеть {network} удалена!"),
            (Self::Replaced { removed, added }, English) => {
                format!("The network {removed} has been removed and {added} has been added.")
            }
            (Self::Replaced { removed, added }, Russian) => {
                format!("Сеть {removed} удалена и добавлена новая сеть - {added}.")
            }
            (
                Self::Evolved {
                    parent1,
                    parent2,
                    child,
                },
                English,
            ) => format!("New network: {parent1} + {parent2} => {child}."),
            (
                Self::Evolved {
                    parent1,
                    parent2,
                    child,
                },
                Russian,
            ) => format!("Новая сеть: {parent1} + {parent2} => {child}."),
            (
                Self::DuelRound {
                    iteration,
                    total,
                    top,
                },
                _,
            ) => {
                let mut text = match language {
                    English => format!("Duel iteration: {iteration}/{total}.\nTop list:"),
                    Russian => format!("Раунд дуэли: {iteration}/{total}.\nСписок лучших:"),
                };
                for (i, standing) in top.iter().enumerate() {
                    let _ = write!(
                        text,
                        "\n{} | {:.1} | {} | {}",
                        i + 1,
                        standing.fitness,
                        standing.record,
                        standing.network
                    );
                }
                text
            }
            (Self::TrainingFinished { top }, _) => {
                let mut text = match language {
                    English => "Top list:".to_owned(),
                    Russian => "Список лучших:".to_owned(),
                };
                for (i, standing) in top.iter().enumerate() {
                    let error = standing
                        .mean_error
                        .map_or_else(|| "-".to_owned(), |e| format!("{e:.5}"));
                    let _ = write!(text, "\n{} | {error} | {}", i + 1, standing.network);
                }
                text
            }
        }
    }
}

fn phase_message(phase: Phase, language: Language) -> &'static str {
    match (phase, language) {
        (Phase::Analysis, Language::English) => "The analysis phase has begun!",
        (Phase::Analysis, Language::Russian) => "Начался этап анализа!",
        (Phase::Training, Language::English) => "The training phase has begun!",
        (Phase::Training, Language::Russian) => "Начался этап обучения!",
        (Phase::Duel, Language::English) => "The stage of duels has begun!",
        (Phase::Duel, Language::Russian) => "Начался этап дуэлей!",
    }
}

pub trait LifecycleSink: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

/// Writes every event to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    language: Language,
}

impl LogSink {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl LifecycleSink for LogSink {
    fn emit(&self, event: LifecycleEvent) {
        log::info!("{}", event.message(self.language));
    }
}

impl<S> LifecycleSink for Arc<S>
where
    S: LifecycleSink + ?Sized,
{
    fn emit(&self, event: LifecycleEvent) {
        (**self).emit(event);
    }
}
