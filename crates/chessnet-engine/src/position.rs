//! Game state on top of [`chess::Board`].
//!
//! [`chess::Board`] knows legal moves, check, mate and stalemate, but nothing about
//! the game's past. [`Position`] adds the halfmove clock and the hashes of every
//! position since the last irreversible move, which is what the fifty-move and
//! threefold-repetition rules need.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece};

use crate::PositionError;

/// Why a game ended in a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DrawReason {
    #[display("threefold repetition")]
    Repetition,
    #[display("fifty-move rule")]
    FiftyMove,
    #[display("insufficient material")]
    InsufficientMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum GameStatus {
    Ongoing,
    Checkmate { loser: Color },
    Stalemate,
    Draw(DrawReason),
}

const FIFTY_MOVE_HALFMOVES: u32 = 100;
const REPETITION_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    // Hashes since the last pawn move or capture, current position included.
    history: Vec<u64>,
}

impl Default for Position {
    fn default() -> Self {
        Self::new_game()
    }
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn new_game() -> Self {
        Self::from_board(Board::default(), 0)
    }

    /// Parses a FEN string. The halfmove clock field is honoured when present.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let board = Board::from_str(fen).map_err(|_| PositionError::InvalidFen {
            fen: fen.to_owned(),
        })?;
        let halfmove_clock = fen
            .split_whitespace()
            .nth(4)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        Ok(Self::from_board(board, halfmove_clock))
    }

    fn from_board(board: Board, halfmove_clock: u32) -> Self {
        Self {
            history: vec![board.get_hash()],
            board,
            halfmove_clock,
        }
    }

    /// FEN of the piece placement, side to move, castling rights and en-passant
    /// square. Move counters are fixed to `0 1`, so the same arrangement always
    /// produces the same string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        self.board.to_string()
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    #[must_use]
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    /// Plays a legal move.
    pub fn apply_move(&mut self, mv: ChessMove) -> Result<(), PositionError> {
        if !self.board.legal(mv) {
            return Err(PositionError::IllegalMove {
                mv,
                fen: self.to_fen(),
            });
        }
        *self = self.after(mv);
        Ok(())
    }

    /// Returns the position reached by `mv`, which must be legal.
    #[must_use]
    pub fn after(&self, mv: ChessMove) -> Self {
        let irreversible = self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            || self.board.piece_on(mv.get_dest()).is_some();
        let board = self.board.make_move_new(mv);
        let hash = board.get_hash();
        if irreversible {
            Self::from_board(board, 0)
        } else {
            let mut history = Vec::with_capacity(self.history.len() + 1);
            history.extend_from_slice(&self.history);
            history.push(hash);
            Self {
                board,
                halfmove_clock: self.halfmove_clock + 1,
                history,
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> GameStatus {
        match self.board.status() {
            BoardStatus::Checkmate => {
                return GameStatus::Checkmate {
                    loser: self.board.side_to_move(),
                };
            }
            BoardStatus::Stalemate => return GameStatus::Stalemate,
            BoardStatus::Ongoing => {}
        }
        if self.is_insufficient_material() {
            GameStatus::Draw(DrawReason::InsufficientMaterial)
        } else if self.halfmove_clock >= FIFTY_MOVE_HALFMOVES {
            GameStatus::Draw(DrawReason::FiftyMove)
        } else if self.repetitions() >= REPETITION_COUNT {
            GameStatus::Draw(DrawReason::Repetition)
        } else {
            GameStatus::Ongoing
        }
    }

    /// How many times the current position has occurred.
    #[must_use]
    pub fn repetitions(&self) -> usize {
        let current = self.board.get_hash();
        self.history.iter().filter(|&&h| h == current).count()
    }

    /// Bare kings, or kings plus a single minor piece.
    fn is_insufficient_material(&self) -> bool {
        let board = &self.board;
        let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
        if heavy.popcnt() > 0 {
            return false;
        }
        let minors = *board.pieces(Piece::Knight) | *board.pieces(Piece::Bishop);
        minors.popcnt() <= 1
    }
}
