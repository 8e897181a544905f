//! Chess-side collaborators of the training pipeline.
//!
//! The rules themselves come from the [`chess`] crate. This crate wraps them into the
//! small surface the pipeline needs and adds everything that turns a network into a
//! chess player:
//!
//! - [`position`] - [`Position`]: a board plus the history needed for draw detection
//! - [`encoding`] - Board → network input, network output → centipawn score
//! - [`evaluator`] - [`PositionEvaluator`] and its implementations (reference trainer,
//!   constant, network)
//! - [`search`] - Alpha-beta negamax over any evaluator
//! - [`game`] - Clocked games between two [`Player`]s
//! - [`cancel`] - [`CancellationToken`] shared by every long-running loop
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use chessnet_engine::{
//!     CancellationToken, GameSettings, MaterialEvaluator, SearchPlayer, game,
//! };
//!
//! let mut white = SearchPlayer::new(MaterialEvaluator, 1, 1);
//! let mut black = SearchPlayer::new(MaterialEvaluator, 1, 2);
//! let settings = GameSettings {
//!     clock: Duration::from_secs(5),
//!     max_plies: 6,
//! };
//! let outcome = game::play(&mut white, &mut black, &settings, &CancellationToken::new());
//! assert!(outcome.plies <= 6);
//! ```

pub use chess::{ChessMove, Color, Piece, Square};

pub use self::{
    cancel::CancellationToken,
    evaluator::{ConstantEvaluator, MaterialEvaluator, NetworkEvaluator, PositionEvaluator},
    game::{GameOutcome, GameResult, GameSettings, Player, SearchPlayer},
    position::{DrawReason, GameStatus, Position},
};

pub mod cancel;
pub mod encoding;
pub mod evaluator;
pub mod game;
pub mod position;
pub mod search;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PositionError {
    #[display("invalid FEN '{fen}'")]
    InvalidFen { fen: String },
    #[display("illegal move {mv} in position {fen}")]
    IllegalMove { mv: ChessMove, fen: String },
}
