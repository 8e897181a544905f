//! Clocked games between two players.
//!
//! [`play`] alternates [`Player::choose_move`] calls until the game ends. Each side
//! has its own clock of [`GameSettings::clock`]; the time a player spends choosing a
//! move is subtracted from its clock, and a player whose clock runs out loses on
//! time. [`GameSettings::max_plies`] caps runaway games, which then end as a
//! [`GameResult::MoveLimit`] draw.

use std::time::{Duration, Instant};

use chess::{ChessMove, Color};
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;

use crate::{
    CancellationToken, DrawReason, GameStatus, Position, PositionEvaluator,
    search::{self, SearchLimits},
};

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum GameResult {
    #[display("white is mated")]
    WhiteIsMated,
    #[display("black is mated")]
    BlackIsMated,
    #[display("stalemate")]
    Stalemate,
    #[display("repetition")]
    Repetition,
    #[display("fifty-move rule")]
    FiftyMoveRule,
    #[display("insufficient material")]
    InsufficientMaterial,
    #[display("{loser:?} ran out of time")]
    TimeIsUp { loser: Color },
    #[display("move limit reached")]
    MoveLimit,
    #[display("aborted")]
    Aborted,
}

impl GameResult {
    #[must_use]
    pub fn winner(self) -> Option<Color> {
        match self {
            Self::WhiteIsMated => Some(Color::Black),
            Self::BlackIsMated => Some(Color::White),
            Self::TimeIsUp { loser } => Some(!loser),
            Self::Stalemate
            | Self::Repetition
            | Self::FiftyMoveRule
            | Self::InsufficientMaterial
            | Self::MoveLimit
            | Self::Aborted => None,
        }
    }

    fn from_status(status: GameStatus) -> Option<Self> {
        match status {
            GameStatus::Ongoing => None,
            GameStatus::Checkmate {
                loser: Color::White,
            } => Some(Self::WhiteIsMated),
            GameStatus::Checkmate {
                loser: Color::Black,
            } => Some(Self::BlackIsMated),
            GameStatus::Stalemate => Some(Self::Stalemate),
            GameStatus::Draw(DrawReason::Repetition) => Some(Self::Repetition),
            GameStatus::Draw(DrawReason::FiftyMove) => Some(Self::FiftyMoveRule),
            GameStatus::Draw(DrawReason::InsufficientMaterial) => {
                Some(Self::InsufficientMaterial)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Thinking time available to each side for the whole game.
    pub clock: Duration,
    pub max_plies: usize,
}

#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub result: GameResult,
    pub plies: usize,
    pub final_position: Position,
}

pub trait Player {
    /// Picks a move in `position`, which has at least one legal move.
    ///
    /// `deadline` is when the player's clock would run out. Returning `None` aborts
    /// the game.
    fn choose_move(
        &mut self,
        position: &Position,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Option<ChessMove>;
}

// Share of the remaining clock a search may spend on one move.
const MOVE_TIME_DIVISOR: u32 = 20;

/// Plays with a fixed-depth alpha-beta search over an evaluator.
#[derive(Debug, Clone)]
pub struct SearchPlayer<E> {
    evaluator: E,
    depth: u8,
    rng: Pcg64Mcg,
}

impl<E> SearchPlayer<E>
where
    E: PositionEvaluator,
{
    pub fn new(evaluator: E, depth: u8, seed: u64) -> Self {
        Self {
            evaluator,
            depth,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn into_evaluator(self) -> E {
        self.evaluator
    }
}

impl<E> Player for SearchPlayer<E>
where
    E: PositionEvaluator,
{
    fn choose_move(
        &mut self,
        position: &Position,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Option<ChessMove> {
        let now = Instant::now();
        let budget = deadline.saturating_duration_since(now) / MOVE_TIME_DIVISOR;
        let limits = SearchLimits {
            depth: self.depth,
            deadline: now + budget,
            cancel,
        };
        search::search(position, &self.evaluator, &limits, &mut self.rng).map(|r| r.best_move)
    }
}

/// Plays one game from the starting position.
pub fn play<'a>(
    white: &'a mut dyn Player,
    black: &'a mut dyn Player,
    settings: &GameSettings,
    cancel: &CancellationToken,
) -> GameOutcome {
    play_from(Position::new_game(), white, black, settings, cancel)
}

/// Plays one game from an arbitrary position.
pub fn play_from<'a>(
    mut position: Position,
    white: &'a mut dyn Player,
    black: &'a mut dyn Player,
    settings: &GameSettings,
    cancel: &CancellationToken,
) -> GameOutcome {
    let mut clocks = [settings.clock; 2];
    let mut plies = 0;

    let result = loop {
        if let Some(result) = GameResult::from_status(position.status()) {
            break result;
        }
        if plies >= settings.max_plies {
            break GameResult::MoveLimit;
        }
        if cancel.is_cancelled() {
            break GameResult::Aborted;
        }

        let side = position.side_to_move();
        let (player, clock) = match side {
            Color::White => (&mut *white, &mut clocks[0]),
            Color::Black => (&mut *black, &mut clocks[1]),
        };
        let started = Instant::now();
        let chosen = player.choose_move(&position, started + *clock, cancel);
        let elapsed = started.elapsed();
        if elapsed >= *clock {
            break GameResult::TimeIsUp { loser: side };
        }
        *clock -= elapsed;

        let Some(mv) = chosen else {
            break GameResult::Aborted;
        };
        if let Err(err) = position.apply_move(mv) {
            log::warn!("{err}; aborting game");
            break GameResult::Aborted;
        }
        plies += 1;
    };

    log::debug!("game finished after {plies} plies: {result}");
    GameOutcome {
        result,
        plies,
        final_position: position,
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chess::Square;

    use super::*;
    use crate::{ConstantEvaluator, MaterialEvaluator};

    /// Plays a fixed list of moves, then gives up.
    struct ScriptedPlayer {
        moves: Vec<ChessMove>,
        delay: Duration,
    }

    impl ScriptedPlayer {
        fn new(moves: &[(Square, Square)]) -> Self {
            Self {
                moves: moves
                    .iter()
                    .rev()
                    .map(|&(from, to)| ChessMove::new(from, to, None))
                    .collect(),
                delay: Duration::ZERO,
            }
        }
    }

    impl Player for ScriptedPlayer {
        fn choose_move(
            &mut self,
            _position: &Position,
            _deadline: Instant,
            _cancel: &CancellationToken,
        ) -> Option<ChessMove> {
            thread::sleep(self.delay);
            self.moves.pop()
        }
    }

    fn settings(max_plies: usize) -> GameSettings {
        GameSettings {
            clock: Duration::from_secs(30),
            max_plies,
        }
    }

    #[test]
    fn test_fools_mate_result() {
        let mut white = ScriptedPlayer::new(&[(Square::F2, Square::F3), (Square::G2, Square::G4)]);
        let mut black = ScriptedPlayer::new(&[(Square::E7, Square::E5), (Square::D8, Square::H4)]);
        let outcome = play(&mut white, &mut black, &settings(100), &CancellationToken::new());
        assert_eq!(outcome.result, GameResult::WhiteIsMated);
        assert_eq!(outcome.result.winner(), Some(Color::Black));
        assert_eq!(outcome.plies, 4);
    }

    #[test]
    fn test_move_limit() {
        let mut white = SearchPlayer::new(ConstantEvaluator(0), 1, 1);
        let mut black = SearchPlayer::new(ConstantEvaluator(0), 1, 2);
        let outcome = play(&mut white, &mut black, &settings(10), &CancellationToken::new());
        assert!(outcome.plies <= 10);
        if outcome.plies == 10 {
            assert_eq!(outcome.result, GameResult::MoveLimit);
        }
        assert_eq!(outcome.result.winner(), None);
    }

    #[test]
    fn test_flag_fall_loses() {
        let mut white = ScriptedPlayer::new(&[(Square::E2, Square::E4)]);
        white.delay = Duration::from_millis(30);
        let mut black = ScriptedPlayer::new(&[(Square::E7, Square::E5)]);
        let settings = GameSettings {
            clock: Duration::from_millis(10),
            max_plies: 100,
        };
        let outcome = play(&mut white, &mut black, &settings, &CancellationToken::new());
        assert_eq!(
            outcome.result,
            GameResult::TimeIsUp {
                loser: Color::White
            }
        );
        assert_eq!(outcome.result.winner(), Some(Color::Black));
        assert_eq!(outcome.plies, 0);
    }

    #[test]
    fn test_player_without_move_aborts() {
        let mut white = ScriptedPlayer::new(&[]);
        let mut black = ScriptedPlayer::new(&[]);
        let outcome = play(&mut white, &mut black, &settings(100), &CancellationToken::new());
        assert_eq!(outcome.result, GameResult::Aborted);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut white = SearchPlayer::new(MaterialEvaluator, 2, 1);
        let mut black = SearchPlayer::new(MaterialEvaluator, 2, 2);
        let outcome = play(&mut white, &mut black, &settings(100), &cancel);
        assert_eq!(outcome.result, GameResult::Aborted);
        assert_eq!(outcome.plies, 0);
    }

    #[test]
    fn test_search_player_converts_winning_endgame() {
        // King and queen against a lone king, mate in one available: Qc8#.
        let position = Position::from_fen("k7/8/1K6/8/8/8/8/2Q5 w - - 0 1").unwrap();
        let mut white = SearchPlayer::new(MaterialEvaluator, 2, 5);
        let mut black = SearchPlayer::new(MaterialEvaluator, 2, 6);
        let outcome = play_from(
            position,
            &mut white,
            &mut black,
            &settings(1),
            &CancellationToken::new(),
        );
        assert_eq!(outcome.result, GameResult::BlackIsMated);
        assert_eq!(outcome.plies, 1);
    }
}
