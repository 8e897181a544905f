//! Static position evaluators.
//!
//! Every evaluator scores a position in centipawns **from the side to move's point of
//! view**: positive means the player about to move is better. The search negates
//! scores when it steps down a ply, so this convention is what keeps negamax simple.
//!
//! # Reference Evaluator
//!
//! [`MaterialEvaluator`] is the trainer whose scores become the networks' training
//! labels. Per side it adds:
//!
//! 1. **Material** - pawn 100, knight 300, bishop 320, rook 500, queen 900
//! 2. **Piece-square tables** - positional bonus per piece and square
//! 3. **King safety** - the middlegame king table, faded out as the opponent's
//!    non-pawn material disappears
//! 4. **Mop-up** - when a side is ahead by more than two pawns in an endgame, a bonus
//!    for pushing the enemy king to the edge and bringing its own king closer
//!
//! The endgame weight of a side is `1 - min(1, material_without_pawns / 1820)`, where
//! 1820 is two rooks, a bishop and a knight.

use chess::{BitBoard, Board, Color, Piece, Square};
use chessnet_network::Network;

use crate::{
    Position,
    encoding::{self, Encoding},
};

pub trait PositionEvaluator {
    /// Scores `position` from the side to move's point of view.
    fn evaluate(&self, position: &Position) -> i32;
}

impl<E> PositionEvaluator for &E
where
    E: PositionEvaluator + ?Sized,
{
    fn evaluate(&self, position: &Position) -> i32 {
        (**self).evaluate(position)
    }
}

/// Converts a white-perspective score to the side to move's perspective.
#[must_use]
pub fn from_white_perspective(position: &Position, score: i32) -> i32 {
    match position.side_to_move() {
        Color::White => score,
        Color::Black => score.saturating_neg(),
    }
}

/// Returns the same score for every position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantEvaluator(pub i32);

impl PositionEvaluator for ConstantEvaluator {
    fn evaluate(&self, _position: &Position) -> i32 {
        self.0
    }
}

pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 300;
pub const BISHOP_VALUE: i32 = 320;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;

// Two rooks, a bishop and a knight.
const ENDGAME_MATERIAL_START: f32 = 1820.0;

// Tables are laid out from white's side with rank 8 first.
#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_MIDDLE_TABLE: [i32; 64] = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
     20, 20,  0,  0,  0,  0, 20, 20,
     20, 30, 10,  0,  0, 10, 30, 20,
];

fn table_value(table: &[i32; 64], square: Square, color: Color) -> i32 {
    let rank = square.get_rank().to_index();
    let file = square.get_file().to_index();
    let row = match color {
        Color::White => 7 - rank,
        Color::Black => rank,
    };
    table[row * 8 + file]
}

fn centre_manhattan_distance(square: Square) -> i32 {
    let distance = |i: usize| {
        let i = i32::try_from(i).unwrap_or(0);
        (3 - i).max(i - 4)
    };
    distance(square.get_file().to_index()) + distance(square.get_rank().to_index())
}

fn manhattan_distance(a: Square, b: Square) -> i32 {
    let coords = |s: Square| {
        (
            i32::try_from(s.get_file().to_index()).unwrap_or(0),
            i32::try_from(s.get_rank().to_index()).unwrap_or(0),
        )
    };
    let ((af, ar), (bf, br)) = (coords(a), coords(b));
    (af - bf).abs() + (ar - br).abs()
}

/// Material, piece-square tables, king safety and endgame mop-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialEvaluator;

impl MaterialEvaluator {
    /// Score from white's point of view.
    #[must_use]
    pub fn white_score(board: &Board) -> i32 {
        let white = SideSummary::new(board, Color::White);
        let black = SideSummary::new(board, Color::Black);

        let white_eval = white.material
            + mop_up(board, &white, &black)
            + piece_square_score(board, Color::White, black.endgame_weight);
        let black_eval = black.material
            + mop_up(board, &black, &white)
            + piece_square_score(board, Color::Black, white.endgame_weight);
        white_eval - black_eval
    }
}

impl PositionEvaluator for MaterialEvaluator {
    fn evaluate(&self, position: &Position) -> i32 {
        from_white_perspective(position, Self::white_score(position.board()))
    }
}

struct SideSummary {
    color: Color,
    material: i32,
    endgame_weight: f32,
}

impl SideSummary {
    #[expect(clippy::cast_precision_loss)]
    fn new(board: &Board, color: Color) -> Self {
        let count = |piece| i32::try_from(pieces_of(board, piece, color).popcnt()).unwrap_or(0);
        let pawns = count(Piece::Pawn) * PAWN_VALUE;
        let without_pawns = count(Piece::Knight) * KNIGHT_VALUE
            + count(Piece::Bishop) * BISHOP_VALUE
            + count(Piece::Rook) * ROOK_VALUE
            + count(Piece::Queen) * QUEEN_VALUE;
        Self {
            color,
            material: pawns + without_pawns,
            endgame_weight: 1.0 - (without_pawns as f32 / ENDGAME_MATERIAL_START).min(1.0),
        }
    }
}

fn pieces_of(board: &Board, piece: Piece, color: Color) -> BitBoard {
    *board.pieces(piece) & *board.color_combined(color)
}

#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn mop_up(board: &Board, me: &SideSummary, opponent: &SideSummary) -> i32 {
    let endgame_weight = opponent.endgame_weight;
    if me.material <= opponent.material + PAWN_VALUE * 2 || endgame_weight <= 0.0 {
        return 0;
    }
    let my_king = board.king_square(me.color);
    let their_king = board.king_square(opponent.color);
    let score = centre_manhattan_distance(their_king) * 10
        + (14 - manhattan_distance(my_king, their_king)) * 4;
    (score as f32 * endgame_weight) as i32
}

#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn piece_square_score(board: &Board, color: Color, opponent_endgame_weight: f32) -> i32 {
    let tables = [
        (Piece::Pawn, &PAWN_TABLE),
        (Piece::Rook, &ROOK_TABLE),
        (Piece::Knight, &KNIGHT_TABLE),
        (Piece::Bishop, &BISHOP_TABLE),
        (Piece::Queen, &QUEEN_TABLE),
    ];
    let mut value = 0;
    for (piece, table) in tables {
        for square in pieces_of(board, piece, color) {
            value += table_value(table, square, color);
        }
    }
    let king_early = table_value(&KING_MIDDLE_TABLE, board.king_square(color), color);
    value + (king_early as f32 * (1.0 - opponent_endgame_weight)) as i32
}

/// Scores with a network: `trunc(output × 10000)` from white's point of view,
/// converted to the side to move and pushed away from zero to at least ±10.
#[derive(Debug, Clone, Copy)]
pub struct NetworkEvaluator<'a> {
    network: &'a Network,
    encoding: Encoding,
}

/// Smallest score magnitude a network player reports.
pub const MIN_NETWORK_SCORE: i32 = 10;

impl<'a> NetworkEvaluator<'a> {
    #[must_use]
    pub fn new(network: &'a Network) -> Self {
        let encoding = Encoding::for_input_size(network.input_size()).unwrap_or(Encoding::TwoBoard);
        Self { network, encoding }
    }

    #[must_use]
    pub fn network(&self) -> &'a Network {
        self.network
    }

    /// Raw network score from white's point of view.
    #[must_use]
    pub fn white_score(&self, position: &Position) -> i32 {
        let input = self.encoding.encode(position);
        encoding::score_from_output(self.network.evaluate(&input))
    }
}

impl PositionEvaluator for NetworkEvaluator<'_> {
    fn evaluate(&self, position: &Position) -> i32 {
        let score = from_white_perspective(position, self.white_score(position));
        if score.saturating_abs() >= MIN_NETWORK_SCORE {
            score
        } else if score > 0 {
            MIN_NETWORK_SCORE
        } else {
            -MIN_NETWORK_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use chessnet_network::{Activation, Identity, Record};

    use super::*;

    #[test]
    fn test_start_position_is_balanced() {
        let position = Position::new_game();
        assert_eq!(MaterialEvaluator.evaluate(&position), 0);
    }

    #[test]
    fn test_material_advantage() {
        // White is a queen up.
        let position =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        let white_to_move = MaterialEvaluator.evaluate(&position);
        assert!(white_to_move > 800, "{white_to_move}");

        let position =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(MaterialEvaluator.evaluate(&position), -white_to_move);
    }

    #[test]
    fn test_mop_up_prefers_cornered_king() {
        let centre = Position::from_fen("8/8/8/3k4/8/8/8/4QK2 w - - 0 1").unwrap();
        let corner = Position::from_fen("k7/8/1K6/8/8/8/8/4Q3 w - - 0 1").unwrap();
        assert!(MaterialEvaluator.evaluate(&corner) > MaterialEvaluator.evaluate(&centre));
    }

    #[test]
    fn test_table_mirroring() {
        assert_eq!(table_value(&PAWN_TABLE, Square::E2, Color::White), -20);
        assert_eq!(table_value(&PAWN_TABLE, Square::E7, Color::Black), -20);
        assert_eq!(table_value(&PAWN_TABLE, Square::A7, Color::White), 50);
        assert_eq!(table_value(&KING_MIDDLE_TABLE, Square::G1, Color::White), 30);
        assert_eq!(table_value(&KING_MIDDLE_TABLE, Square::G8, Color::Black), 30);
    }

    #[test]
    fn test_distances() {
        assert_eq!(centre_manhattan_distance(Square::E4), 0);
        assert_eq!(centre_manhattan_distance(Square::A1), 6);
        assert_eq!(centre_manhattan_distance(Square::H8), 6);
        assert_eq!(manhattan_distance(Square::A1, Square::H8), 14);
    }

    #[test]
    fn test_constant_evaluator() {
        assert_eq!(ConstantEvaluator(42).evaluate(&Position::new_game()), 42);
    }

    fn constant_network(weight: f32) -> Network {
        Network::from_parts(
            vec![64, 1],
            vec![Activation::LeakyRelu],
            &[weight; 64],
            Identity::founder("Constant"),
            Record::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_network_evaluator_perspective() {
        // Start position inputs sum to 0.32 (32 empty squares at 0.01, pieces cancel).
        let network = constant_network(1.0);
        let evaluator = NetworkEvaluator::new(&network);
        let white = Position::new_game();
        let raw = evaluator.white_score(&white);
        assert!((3190..=3200).contains(&raw), "{raw}");
        assert_eq!(evaluator.evaluate(&white), raw);

        let black =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(evaluator.evaluate(&black), -raw);
    }

    #[test]
    fn test_network_evaluator_minimum_magnitude() {
        let network = constant_network(0.0);
        let evaluator = NetworkEvaluator::new(&network);
        let position = Position::new_game();
        assert_eq!(evaluator.white_score(&position), 0);
        assert_eq!(evaluator.evaluate(&position).abs(), MIN_NETWORK_SCORE);
    }

    #[test]
    fn test_network_evaluator_saturated_output() {
        let network = constant_network(-1.0e9);
        let evaluator = NetworkEvaluator::new(&network);
        let white = Position::new_game();
        assert_eq!(evaluator.white_score(&white), -encoding::MAX_NETWORK_SCORE);
        assert_eq!(evaluator.evaluate(&white), -encoding::MAX_NETWORK_SCORE);

        let black =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(evaluator.evaluate(&black), encoding::MAX_NETWORK_SCORE);
    }

    #[test]
    fn test_white_perspective_saturates() {
        let black =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(from_white_perspective(&black, i32::MIN), i32::MAX);
    }
}
