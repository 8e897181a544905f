//! Conversions between positions, network inputs and centipawn scores.
//!
//! # Board Encodings
//!
//! Squares are visited in [`chess::ALL_SQUARES`] order (a1, b1, ..., h8). Each piece
//! has a fixed magnitude, positive for white and negative for black:
//!
//! | Piece  | Value |
//! |--------|-------|
//! | empty  | 0.01  |
//! | pawn   | 0.1   |
//! | rook   | 0.2   |
//! | knight | 0.3   |
//! | bishop | 0.4   |
//! | queen  | 0.7   |
//! | king   | 0.9   |
//!
//! - [`Encoding::OneBoard`] (64 inputs) - one signed value per square
//! - [`Encoding::TwoBoard`] (128 inputs) - a white plane followed by a black plane;
//!   a square not occupied by that plane's colour holds 0.01
//!
//! # Scores
//!
//! A network output `o` is read as `trunc(o × 10000)` centipawns from white's point
//! of view, clamped below the mate scores of the search. Training targets go the other way: the reference score is clamped to
//! ±9000 and divided by 10000, so targets stay inside the range of `tanh`.

use chess::{ALL_SQUARES, Color, Piece};

use crate::{Position, search::MATE_SCORE};

const EMPTY_VALUE: f32 = 0.01;
const SCORE_SCALE: f32 = 10_000.0;
const TARGET_LIMIT: i32 = 9_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    OneBoard,
    TwoBoard,
}

impl Encoding {
    /// Picks the encoding matching a network's input layer.
    #[must_use]
    pub fn for_input_size(input_size: usize) -> Option<Self> {
        match input_size {
            64 => Some(Self::OneBoard),
            128 => Some(Self::TwoBoard),
            _ => None,
        }
    }

    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::OneBoard => 64,
            Self::TwoBoard => 128,
        }
    }

    #[must_use]
    pub fn encode(self, position: &Position) -> Vec<f32> {
        let squares = signed_square_values(position);
        match self {
            Self::OneBoard => squares.to_vec(),
            Self::TwoBoard => {
                let white = squares.iter().map(|&v| if v > 0.0 { v } else { EMPTY_VALUE });
                let black = squares.iter().map(|&v| if v < 0.0 { v } else { EMPTY_VALUE });
                white.chain(black).collect()
            }
        }
    }
}

#[must_use]
pub fn piece_value(piece: Piece) -> f32 {
    match piece {
        Piece::Pawn => 0.1,
        Piece::Rook => 0.2,
        Piece::Knight => 0.3,
        Piece::Bishop => 0.4,
        Piece::Queen => 0.7,
        Piece::King => 0.9,
    }
}

fn signed_square_values(position: &Position) -> [f32; 64] {
    let board = position.board();
    let mut values = [EMPTY_VALUE; 64];
    for (value, square) in values.iter_mut().zip(ALL_SQUARES) {
        if let (Some(piece), Some(color)) = (board.piece_on(square), board.color_on(square)) {
            *value = match color {
                Color::White => piece_value(piece),
                Color::Black => -piece_value(piece),
            };
        }
    }
    values
}

/// Largest score magnitude a network output converts to.
pub const MAX_NETWORK_SCORE: i32 = MATE_SCORE - 1;

/// Network output → centipawns (white perspective).
///
/// NaN converts to 0.
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn score_from_output(output: f32) -> i32 {
    let limit = MAX_NETWORK_SCORE as f32;
    (output * SCORE_SCALE).clamp(-limit, limit) as i32
}

/// Centipawns (white perspective) → training target.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn target_from_score(score: i32) -> f32 {
    score.clamp(-TARGET_LIMIT, TARGET_LIMIT) as f32 / SCORE_SCALE
}
