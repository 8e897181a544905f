//! Fixed-depth alpha-beta search.
//!
//! Negamax with alpha-beta pruning over [`Position::after`]. Leaves are scored by a
//! [`PositionEvaluator`]; mates are scored as `±MATE_SCORE` adjusted by distance so
//! that faster mates are preferred. Root moves are shuffled before searching, so
//! equally scored moves are picked at random and two identical players do not
//! replay the same game.
//!
//! The deadline and the cancellation token are checked between root moves. When
//! either fires, the best move found so far is returned.

use std::time::Instant;

use chess::ChessMove;
use rand::{Rng, seq::SliceRandom as _};

use crate::{CancellationToken, GameStatus, Position, PositionEvaluator};

pub const MATE_SCORE: i32 = 1_000_000;
const INFINITY: i32 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: ChessMove,
    /// Score of `best_move` from the side to move's point of view.
    pub score: i32,
    /// `false` when the deadline or cancellation cut the root loop short.
    pub completed: bool,
}

pub struct SearchLimits<'a> {
    pub depth: u8,
    pub deadline: Instant,
    pub cancel: &'a CancellationToken,
}

/// Searches `position` and returns the best move, or `None` if the side to move has
/// no legal move.
pub fn search<E, R>(
    position: &Position,
    evaluator: &E,
    limits: &SearchLimits<'_>,
    rng: &mut R,
) -> Option<SearchResult>
where
    E: PositionEvaluator + ?Sized,
    R: Rng + ?Sized,
{
    let mut moves = position.legal_moves();
    moves.shuffle(rng);
    let depth = limits.depth.max(1);

    let mut best: Option<SearchResult> = None;
    let mut alpha = -INFINITY;
    for (i, &mv) in moves.iter().enumerate() {
        if i > 0 && (limits.cancel.is_cancelled() || Instant::now() >= limits.deadline) {
            if let Some(best) = &mut best {
                best.completed = false;
            }
            return best;
        }
        let child = position.after(mv);
        let score = -negamax(&child, evaluator, depth - 1, 1, -INFINITY, -alpha);
        if best.is_none_or(|b| score > b.score) {
            best = Some(SearchResult {
                best_move: mv,
                score,
                completed: true,
            });
            alpha = alpha.max(score);
        }
    }
    best
}

fn negamax<E>(position: &Position, evaluator: &E, depth: u8, ply: i32, mut alpha: i32, beta: i32) -> i32
where
    E: PositionEvaluator + ?Sized,
{
    match position.status() {
        GameStatus::Checkmate { .. } => return -(MATE_SCORE - ply),
        GameStatus::Stalemate | GameStatus::Draw(_) => return 0,
        GameStatus::Ongoing => {}
    }
    if depth == 0 {
        return evaluator.evaluate(position);
    }

    for mv in position.legal_moves() {
        let score = -negamax(&position.after(mv), evaluator, depth - 1, ply + 1, -beta, -alpha);
        if score >= beta {
            return beta;
        }
        alpha = alpha.max(score);
    }
    alpha
}
