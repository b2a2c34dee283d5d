// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `Position` object: board state, incremental Zobrist keys, the
//! state history stack, and every rule-level predicate the search needs.
//!
//! This engine plays Atomic chess. Every capture detonates the
//! destination square: the captured piece, the capturing piece, and every
//! non-pawn piece on the eight adjacent squares are all removed from the
//! board. Kings are not exempt - blowing up the enemy king wins the game
//! on the spot, and blowing up your own loses it - which reshapes
//! legality throughout: kings may never capture, kings may not be
//! captured directly, adjacent kings neutralize check entirely, and a
//! move that explodes the checking piece is a valid answer to check.
use std::convert::TryFrom;
use std::fmt::{self, Write};

use crate::attacks;
use crate::bitboard::{Bitboard, BitboardSet};
use crate::boards::PositionBoards;
use crate::movegen::{self, MoveVec};
use crate::moves::{Move, MoveType};
use crate::nnue::{self, NnueState, NnueUpdates};
use crate::opts;
use crate::rays::{ray_between, ray_through};
use crate::types::{relative_rank, TableIndex};
use crate::types::{Color, File, Piece, PieceKind, Rank, Square, COLORS, FILES, RANKS};
use crate::zobrist;

/// Possible errors that can arise when parsing a FEN string into a `Position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FenParseError {
    MissingRanks,
    MissingSideToMove,
    MissingCastling,
    MissingEnPassant,
    MissingHalfmove,
    MissingFullmove,
    ExcessFields,
    TooManyRanks,
    TooManyFiles(u32),
    NotEnoughFiles(u32),
    UnknownPiece(char),
    TooManyPieces,
    WrongKingCount(Color),
    InvalidSideToMove,
    InvalidCastle,
    InvalidEnPassant,
    InvalidHalfmove,
    InvalidFullmove,
}

impl fmt::Display for FenParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FenParseError::MissingRanks => write!(f, "missing piece placement field"),
            FenParseError::MissingSideToMove => write!(f, "missing side to move field"),
            FenParseError::MissingCastling => write!(f, "missing castling availability field"),
            FenParseError::MissingEnPassant => write!(f, "missing en passant field"),
            FenParseError::MissingHalfmove => write!(f, "missing halfmove clock field"),
            FenParseError::MissingFullmove => write!(f, "missing fullmove number field"),
            FenParseError::ExcessFields => write!(f, "excess fields after fullmove number"),
            FenParseError::TooManyRanks => write!(f, "too many ranks"),
            FenParseError::TooManyFiles(rank) => write!(f, "too many files in rank {}", rank),
            FenParseError::NotEnoughFiles(rank) => write!(f, "not enough files in rank {}", rank),
            FenParseError::UnknownPiece(c) => write!(f, "invalid piece character {:?}", c),
            FenParseError::TooManyPieces => write!(f, "more than 32 pieces on the board"),
            FenParseError::WrongKingCount(color) => {
                write!(f, "{} must have exactly one king", color)
            }
            FenParseError::InvalidSideToMove => write!(f, "invalid side to move"),
            FenParseError::InvalidCastle => write!(f, "invalid castling availability"),
            FenParseError::InvalidEnPassant => write!(f, "invalid en passant square"),
            FenParseError::InvalidHalfmove => write!(f, "invalid halfmove clock"),
            FenParseError::InvalidFullmove => write!(f, "invalid fullmove number"),
        }
    }
}

/// The castling rook home squares of one color, or `None` where the
/// right has been lost. Tracking rook origin squares instead of flag
/// bits lets one representation cover orthodox chess and all 960
/// starting positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RookPair {
    pub kingside: Option<Square>,
    pub queenside: Option<Square>,
}

impl RookPair {
    fn clear(&mut self) {
        self.kingside = None;
        self.queenside = None;
    }

    fn unset(&mut self, sq: Square) {
        if self.kingside == Some(sq) {
            self.kingside = None;
        } else if self.queenside == Some(sq) {
            self.queenside = None;
        }
    }
}

/// Castling rook origins for both colors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CastlingRooks {
    rooks: [RookPair; 2],
}

impl CastlingRooks {
    fn startpos() -> CastlingRooks {
        CastlingRooks {
            rooks: [
                RookPair {
                    kingside: Some(Square::H1),
                    queenside: Some(Square::A1),
                },
                RookPair {
                    kingside: Some(Square::H8),
                    queenside: Some(Square::A8),
                },
            ],
        }
    }

    pub fn color(&self, color: Color) -> RookPair {
        self.rooks[color.as_index()]
    }

    fn color_mut(&mut self, color: Color) -> &mut RookPair {
        &mut self.rooks[color.as_index()]
    }

    pub fn white(&self) -> RookPair {
        self.color(Color::White)
    }

    pub fn black(&self) -> RookPair {
        self.color(Color::Black)
    }
}

/// One ply's worth of board state. `Position` keeps a stack of these and
/// copies the top on every move application, so everything here is plain
/// old data.
#[derive(Copy, Clone, Debug)]
pub struct BoardState {
    pub boards: PositionBoards,
    kings: [Square; 2],
    pub castling_rooks: CastlingRooks,
    pub en_passant: Option<Square>,
    pub halfmove: u16,
    pub key: u64,
    pub checkers: Bitboard,
    pub pinned: Bitboard,
    pub threats: Bitboard,
    pub last_move: Move,
}

impl Default for BoardState {
    fn default() -> BoardState {
        BoardState {
            boards: PositionBoards::default(),
            kings: [Square::A1; 2],
            castling_rooks: CastlingRooks::default(),
            en_passant: None,
            halfmove: 0,
            key: 0,
            checkers: Bitboard::none(),
            pinned: Bitboard::none(),
            threats: Bitboard::none(),
            last_move: Move::null(),
        }
    }
}

impl BoardState {
    pub fn king(&self, color: Color) -> Square {
        self.kings[color.as_index()]
    }

    fn king_mut(&mut self, color: Color) -> &mut Square {
        &mut self.kings[color.as_index()]
    }
}

#[derive(Debug)]
pub struct Position {
    states: Vec<BoardState>,
    keys: Vec<u64>,
    black_to_move: bool,
    fullmove: u32,
}

// cloning preserves the capacity reservations so that a cloned position
// can grow its stacks without reallocating mid-search
impl Clone for Position {
    fn clone(&self) -> Position {
        let mut states = Vec::with_capacity(self.states.capacity());
        states.extend_from_slice(&self.states);
        let mut keys = Vec::with_capacity(self.keys.capacity());
        keys.extend_from_slice(&self.keys);

        Position {
            states,
            keys,
            black_to_move: self.black_to_move,
            fullmove: self.fullmove,
        }
    }
}

//
// Construction and initialization
//

impl Position {
    pub fn new() -> Position {
        let mut states = Vec::with_capacity(256);
        states.push(BoardState::default());

        Position {
            states,
            keys: Vec::with_capacity(512),
            black_to_move: false,
            fullmove: 1,
        }
    }

    /// A position set up for the orthodox starting array.
    pub fn starting() -> Position {
        let mut position = Position::new();
        position.reset_to_starting();
        position
    }

    /// Parses a FEN string into a position, logging a one-line
    /// diagnostic on failure.
    pub fn from_fen<S: AsRef<str>>(fen: S) -> Result<Position, FenParseError> {
        let mut position = Position::new();
        if let Err(err) = position.reset_from_fen(fen.as_ref()) {
            warn!("failed to parse fen {:?}: {}", fen.as_ref(), err);
            return Err(err);
        }

        Ok(position)
    }

    /// Sets up the Scharnagl start position with the given index, or
    /// `None` when the index is out of range.
    pub fn from_frc_index(n: u32) -> Option<Position> {
        let mut position = Position::new();
        if !position.reset_from_frc_index(n) {
            return None;
        }

        Some(position)
    }

    /// Sets up a double Fischer-random start position: `n / 960` selects
    /// Black's backrank and `n % 960` White's.
    pub fn from_dfrc_index(n: u32) -> Option<Position> {
        let mut position = Position::new();
        if !position.reset_from_dfrc_index(n) {
            return None;
        }

        Some(position)
    }

    pub fn reset_to_starting(&mut self) {
        self.states.truncate(1);
        self.keys.clear();

        let state = self.curr_state_mut();
        *state = BoardState::default();

        let bbs = state.boards.bbs_mut();
        *bbs.for_kind_mut(PieceKind::Pawn) = Bitboard::from_bits(0x00FF_0000_0000_FF00);
        *bbs.for_kind_mut(PieceKind::Knight) = Bitboard::from_bits(0x4200_0000_0000_0042);
        *bbs.for_kind_mut(PieceKind::Bishop) = Bitboard::from_bits(0x2400_0000_0000_0024);
        *bbs.for_kind_mut(PieceKind::Rook) = Bitboard::from_bits(0x8100_0000_0000_0081);
        *bbs.for_kind_mut(PieceKind::Queen) = Bitboard::from_bits(0x0800_0000_0000_0008);
        *bbs.for_kind_mut(PieceKind::King) = Bitboard::from_bits(0x1000_0000_0000_0010);
        *bbs.for_color_mut(Color::White) = Bitboard::from_bits(0x0000_0000_0000_FFFF);
        *bbs.for_color_mut(Color::Black) = Bitboard::from_bits(0xFFFF_0000_0000_0000);

        state.castling_rooks = CastlingRooks::startpos();

        self.black_to_move = false;
        self.fullmove = 1;

        self.regen::<false>();
    }

    pub fn reset_from_fen(&mut self, fen: &str) -> Result<(), FenParseError> {
        let tokens: Vec<&str> = fen.split_whitespace().collect();

        match tokens.len() {
            0 => return Err(FenParseError::MissingRanks),
            1 => return Err(FenParseError::MissingSideToMove),
            2 => return Err(FenParseError::MissingCastling),
            3 => return Err(FenParseError::MissingEnPassant),
            4 => return Err(FenParseError::MissingHalfmove),
            5 => return Err(FenParseError::MissingFullmove),
            6 => {}
            _ => return Err(FenParseError::ExcessFields),
        }

        let mut new_state = BoardState::default();

        let ranks: Vec<&str> = tokens[0].split('/').collect();
        for (rank_idx, rank) in ranks.iter().enumerate() {
            if rank_idx >= 8 {
                return Err(FenParseError::TooManyRanks);
            }

            let mut file_idx = 0u32;
            for c in rank.chars() {
                if file_idx >= 8 {
                    return Err(FenParseError::TooManyFiles(rank_idx as u32));
                }

                if let Some(empty) = c.to_digit(10) {
                    file_idx += empty;
                } else if let Ok(piece) = Piece::try_from(c) {
                    let rank = Rank::from_index(7 - rank_idx);
                    let file = File::from_index(file_idx as usize);
                    new_state.boards.set_piece(Square::of(rank, file), piece);
                    file_idx += 1;
                } else {
                    return Err(FenParseError::UnknownPiece(c));
                }
            }

            // the last character may have been a digit overshooting the rank
            if file_idx > 8 {
                return Err(FenParseError::TooManyFiles(rank_idx as u32));
            }
            if file_idx < 8 {
                return Err(FenParseError::NotEnoughFiles(rank_idx as u32));
            }
        }

        let bbs = *new_state.boards.bbs();
        for &color in COLORS.iter() {
            if bbs.kings(color).count() != 1 {
                return Err(FenParseError::WrongKingCount(color));
            }
        }

        if bbs.occupancy().count() > 32 {
            return Err(FenParseError::TooManyPieces);
        }

        let new_black_to_move = match tokens[1] {
            "w" => false,
            "b" => true,
            _ => return Err(FenParseError::InvalidSideToMove),
        };

        parse_castling(tokens[2], &mut new_state)?;

        new_state.en_passant = match tokens[3] {
            "-" => None,
            ep => Some(square_from_str(ep).ok_or(FenParseError::InvalidEnPassant)?),
        };

        new_state.halfmove = tokens[4]
            .parse::<u16>()
            .map_err(|_| FenParseError::InvalidHalfmove)?;

        let new_fullmove = tokens[5]
            .parse::<u32>()
            .map_err(|_| FenParseError::InvalidFullmove)?;

        self.states.truncate(1);
        self.keys.clear();

        self.black_to_move = new_black_to_move;
        self.fullmove = new_fullmove;
        *self.curr_state_mut() = new_state;

        self.regen::<false>();

        Ok(())
    }

    pub fn reset_from_frc_index(&mut self, n: u32) -> bool {
        debug_assert!(opts::opts().chess960);

        if n >= 960 {
            warn!("invalid frc position index {}", n);
            return false;
        }

        self.reset_backranks(scharnagl_to_backrank(n), scharnagl_to_backrank(n));
        true
    }

    pub fn reset_from_dfrc_index(&mut self, n: u32) -> bool {
        debug_assert!(opts::opts().chess960);

        if n >= 960 * 960 {
            warn!("invalid dfrc position index {}", n);
            return false;
        }

        self.reset_backranks(scharnagl_to_backrank(n % 960), scharnagl_to_backrank(n / 960));
        true
    }

    fn reset_backranks(&mut self, white: [PieceKind; 8], black: [PieceKind; 8]) {
        self.states.truncate(1);
        self.keys.clear();

        let state = self.curr_state_mut();
        *state = BoardState::default();

        for (file_idx, &file) in FILES.iter().enumerate() {
            state.boards.set_piece(
                Square::of(Rank::Two, file),
                Piece::new(PieceKind::Pawn, Color::White),
            );
            state.boards.set_piece(
                Square::of(Rank::Seven, file),
                Piece::new(PieceKind::Pawn, Color::Black),
            );

            let white_square = Square::of(Rank::One, file);
            let black_square = Square::of(Rank::Eight, file);
            state
                .boards
                .set_piece(white_square, Piece::new(white[file_idx], Color::White));
            state
                .boards
                .set_piece(black_square, Piece::new(black[file_idx], Color::Black));

            if white[file_idx] == PieceKind::Rook {
                let pair = state.castling_rooks.color_mut(Color::White);
                if pair.queenside.is_none() && pair.kingside.is_none() {
                    pair.queenside = Some(white_square);
                } else {
                    pair.kingside = Some(white_square);
                }
            }

            if black[file_idx] == PieceKind::Rook {
                let pair = state.castling_rooks.color_mut(Color::Black);
                if pair.queenside.is_none() && pair.kingside.is_none() {
                    pair.queenside = Some(black_square);
                } else {
                    pair.kingside = Some(black_square);
                }
            }
        }

        self.black_to_move = false;
        self.fullmove = 1;

        self.regen::<false>();
    }

    /// Replaces this position's state with the current state of another
    /// position, dropping all history. Used when handing a search root
    /// to a worker.
    pub fn copy_state_from(&mut self, other: &Position) {
        self.states.clear();
        self.keys.clear();

        self.states.push(*other.curr_state());

        self.black_to_move = other.black_to_move;
        self.fullmove = other.fullmove;
    }

    /// Drops all stacked states except the current one.
    pub fn clear_state_history(&mut self) {
        let state = *self.curr_state();
        self.states.truncate(1);
        *self.curr_state_mut() = state;
    }
}

//
// State getters
//

impl Position {
    fn curr_state(&self) -> &BoardState {
        self.states.last().expect("state stack is never empty")
    }

    fn curr_state_mut(&mut self) -> &mut BoardState {
        self.states.last_mut().expect("state stack is never empty")
    }

    pub fn state(&self) -> &BoardState {
        self.curr_state()
    }

    pub fn boards(&self) -> &PositionBoards {
        &self.curr_state().boards
    }

    pub fn bbs(&self) -> &BitboardSet {
        self.curr_state().boards.bbs()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.curr_state().boards.piece_at(square)
    }

    pub fn to_move(&self) -> Color {
        if self.black_to_move {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn opponent(&self) -> Color {
        self.to_move().toggle()
    }

    pub fn king(&self, color: Color) -> Square {
        self.curr_state().king(color)
    }

    pub fn en_passant_square(&self) -> Option<Square> {
        self.curr_state().en_passant
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.curr_state().halfmove
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove
    }

    pub fn key(&self) -> u64 {
        self.curr_state().key
    }

    pub fn checkers(&self) -> Bitboard {
        self.curr_state().checkers
    }

    pub fn pinned(&self) -> Bitboard {
        self.curr_state().pinned
    }

    pub fn threats(&self) -> Bitboard {
        self.curr_state().threats
    }

    pub fn castling_rooks(&self) -> &CastlingRooks {
        &self.curr_state().castling_rooks
    }

    pub fn is_check(&self) -> bool {
        !self.curr_state().checkers.empty()
    }

    /// The game is over the instant either king has been exploded.
    pub fn is_variant_over(&self) -> bool {
        let bbs = self.bbs();
        bbs.kings(Color::White).empty() || bbs.kings(Color::Black).empty()
    }
}

//
// Move application
//

impl Position {
    /// Applies a move without checking its legality. `UPDATE_NNUE`
    /// gates emission of incremental evaluator updates (`nnue` must then
    /// be `Some`); `STATE_HISTORY` selects between pushing a state copy
    /// (undoable via `pop_move`) and mutating in place.
    pub fn apply_move_unchecked<const UPDATE_NNUE: bool, const STATE_HISTORY: bool>(
        &mut self,
        mov: Move,
        nnue: Option<&mut NnueState>,
    ) {
        if UPDATE_NNUE {
            debug_assert!(nnue.is_some());
        }

        self.curr_state_mut().last_move = mov;

        if STATE_HISTORY {
            debug_assert!(self.states.len() < self.states.capacity());
            let copy = *self.curr_state();
            self.states.push(copy);
        }

        let prev_key = if STATE_HISTORY {
            self.states[self.states.len() - 2].key
        } else {
            self.curr_state().key
        };
        self.keys.push(prev_key);

        self.black_to_move = !self.black_to_move;

        {
            let state = self.curr_state_mut();
            state.key ^= zobrist::black_to_move();
            if let Some(ep) = state.en_passant.take() {
                state.key ^= zobrist::en_passant(ep);
            }
        }

        if mov.is_null() {
            let pinned = self.calc_pinned();
            let threats = self.calc_threats();
            let state = self.curr_state_mut();
            state.pinned = pinned;
            state.threats = threats;

            self.debug_verify::<STATE_HISTORY>();
            return;
        }

        let move_type = mov.move_type();
        let src = mov.source();
        let dst = mov.destination();

        // after the flip above, the mover is the "opponent"
        let stm = self.opponent();
        let nstm = stm.toggle();

        if stm == Color::Black {
            self.fullmove += 1;
        }

        let moving = self
            .curr_state()
            .boards
            .piece_at(src)
            .expect("no piece at move source square");

        let mut updates = NnueUpdates::default();
        let captured = match move_type {
            MoveType::Standard => self.move_piece::<true, UPDATE_NNUE>(moving, src, dst, &mut updates),
            MoveType::Promotion => self.promote_pawn::<true, UPDATE_NNUE>(
                moving,
                src,
                dst,
                mov.promotion_kind(),
                &mut updates,
            ),
            MoveType::Castling => {
                self.castle::<true, UPDATE_NNUE>(moving, src, dst, &mut updates);
                None
            }
            MoveType::EnPassant => {
                Some(self.en_passant_capture::<true, UPDATE_NNUE>(moving, src, dst, &mut updates))
            }
        };

        if UPDATE_NNUE {
            let nnue = nnue.expect("nnue updates requested without an nnue state");
            let state = self.curr_state();
            nnue.update::<STATE_HISTORY>(
                &updates,
                state.boards.bbs(),
                state.king(Color::White),
                state.king(Color::Black),
            );
        }

        let mut new_rooks = self.curr_state().castling_rooks;

        if captured.is_some() {
            // the blast may have swept rooks off their home squares
            for &color in COLORS.iter() {
                let rook = Piece::new(PieceKind::Rook, color);
                let pair = new_rooks.color(color);
                if let Some(sq) = pair.kingside {
                    if self.piece_at(sq) != Some(rook) {
                        new_rooks.color_mut(color).kingside = None;
                    }
                }
                if let Some(sq) = pair.queenside {
                    if self.piece_at(sq) != Some(rook) {
                        new_rooks.color_mut(color).queenside = None;
                    }
                }
            }
        }

        if moving.kind == PieceKind::Rook {
            new_rooks.color_mut(stm).unset(src);
        } else if moving.kind == PieceKind::King {
            new_rooks.color_mut(stm).clear();
        } else if moving == Piece::new(PieceKind::Pawn, Color::White)
            && src.rank() == Rank::Two
            && dst.rank() == Rank::Four
        {
            let ep = Square::of(Rank::Three, src.file());
            let state = self.curr_state_mut();
            state.en_passant = Some(ep);
            state.key ^= zobrist::en_passant(ep);
        } else if moving == Piece::new(PieceKind::Pawn, Color::Black)
            && src.rank() == Rank::Seven
            && dst.rank() == Rank::Five
        {
            let ep = Square::of(Rank::Six, src.file());
            let state = self.curr_state_mut();
            state.en_passant = Some(ep);
            state.key ^= zobrist::en_passant(ep);
        }

        if captured.is_none() && moving.kind != PieceKind::Pawn {
            self.curr_state_mut().halfmove += 1;
        } else {
            self.curr_state_mut().halfmove = 0;
        }

        if let Some(captured) = captured {
            if captured.kind == PieceKind::Rook {
                new_rooks.color_mut(nstm).unset(dst);
            }
        }

        if new_rooks != self.curr_state().castling_rooks {
            let old_key = castling_key(&self.curr_state().castling_rooks);
            let state = self.curr_state_mut();
            state.key ^= old_key;
            state.key ^= castling_key(&new_rooks);
            state.castling_rooks = new_rooks;
        }

        let checkers = self.calc_checkers();
        let pinned = self.calc_pinned();
        let threats = self.calc_threats();
        let state = self.curr_state_mut();
        state.checkers = checkers;
        state.pinned = pinned;
        state.threats = threats;

        self.debug_verify::<STATE_HISTORY>();
    }

    /// Undoes the most recent move applied with `STATE_HISTORY` set.
    pub fn pop_move<const UPDATE_NNUE: bool>(&mut self, nnue: Option<&mut NnueState>) {
        debug_assert!(self.states.len() > 1, "pop_move with no previous move");

        if UPDATE_NNUE {
            nnue.expect("nnue updates requested without an nnue state")
                .pop();
        }

        self.states.pop();
        self.keys.pop();

        self.black_to_move = !self.black_to_move;

        if self.curr_state().last_move.is_null() {
            return;
        }

        if self.to_move() == Color::Black {
            self.fullmove -= 1;
        }
    }
}

//
// Piece movement primitives
//

impl Position {
    /// Removes every non-pawn piece inside the blast radius of `dst`.
    /// Kings are not spared; an exploded king ends the game.
    fn explode<const UPDATE_KEY: bool, const UPDATE_NNUE: bool>(
        &mut self,
        dst: Square,
        updates: &mut NnueUpdates,
    ) {
        for blast_sq in attacks::blast_radius(dst) {
            let swept = match self.curr_state().boards.piece_at(blast_sq) {
                Some(piece) if piece.kind != PieceKind::Pawn => piece,
                _ => continue,
            };

            let state = self.curr_state_mut();
            state.boards.remove_piece(blast_sq, swept);

            if UPDATE_NNUE {
                updates.push_sub(swept, blast_sq);
            }
            if UPDATE_KEY {
                state.key ^= zobrist::piece_square(swept, blast_sq);
            }
        }
    }

    fn move_piece<const UPDATE_KEY: bool, const UPDATE_NNUE: bool>(
        &mut self,
        piece: Piece,
        src: Square,
        dst: Square,
        updates: &mut NnueUpdates,
    ) -> Option<Piece> {
        debug_assert!(src != dst);

        let captured = self.curr_state().boards.piece_at(dst);

        if let Some(captured) = captured {
            debug_assert!(captured.kind != PieceKind::King);

            // the captured piece and the capturer both come off before
            // the sweep; the capturer may itself stand inside the blast
            // radius, and must not be removed twice
            let state = self.curr_state_mut();
            state.boards.remove_piece(dst, captured);
            state.boards.remove_piece(src, piece);
            if UPDATE_NNUE {
                updates.push_sub(captured, dst);
                updates.push_sub(piece, src);
            }
            if UPDATE_KEY {
                state.key ^= zobrist::piece_square(captured, dst);
                state.key ^= zobrist::piece_square(piece, src);
            }

            self.explode::<UPDATE_KEY, UPDATE_NNUE>(dst, updates);
        } else {
            let state = self.curr_state_mut();
            state.boards.move_piece(src, dst, piece);

            if piece.kind == PieceKind::King {
                if UPDATE_NNUE && nnue::refresh_required(piece.color, state.king(piece.color), dst)
                {
                    updates.set_refresh(piece.color);
                }

                *state.king_mut(piece.color) = dst;
            }

            if UPDATE_NNUE {
                updates.push_sub_add(piece, src, dst);
            }
            if UPDATE_KEY {
                state.key ^= zobrist::piece_square(piece, src) ^ zobrist::piece_square(piece, dst);
            }
        }

        captured
    }

    fn promote_pawn<const UPDATE_KEY: bool, const UPDATE_NNUE: bool>(
        &mut self,
        pawn: Piece,
        src: Square,
        dst: Square,
        promo: PieceKind,
        updates: &mut NnueUpdates,
    ) -> Option<Piece> {
        debug_assert!(pawn.kind == PieceKind::Pawn);
        debug_assert!(dst.rank() == relative_rank(pawn.color, Rank::Eight));
        debug_assert!(src.rank() == relative_rank(pawn.color, Rank::Seven));

        let captured = self.curr_state().boards.piece_at(dst);

        if let Some(captured) = captured {
            debug_assert!(captured.kind != PieceKind::King);

            // a capturing promotion explodes like any capture; the
            // promoted piece never materializes
            let state = self.curr_state_mut();
            state.boards.remove_piece(dst, captured);
            state.boards.remove_piece(src, pawn);
            if UPDATE_NNUE {
                updates.push_sub(captured, dst);
                updates.push_sub(pawn, src);
            }
            if UPDATE_KEY {
                state.key ^= zobrist::piece_square(captured, dst);
                state.key ^= zobrist::piece_square(pawn, src);
            }

            self.explode::<UPDATE_KEY, UPDATE_NNUE>(dst, updates);
        } else {
            let state = self.curr_state_mut();
            state.boards.move_and_change_piece(src, dst, pawn, promo);

            let promoted = Piece::new(promo, pawn.color);
            if UPDATE_NNUE {
                updates.push_sub(pawn, src);
                updates.push_add(promoted, dst);
            }
            if UPDATE_KEY {
                state.key ^=
                    zobrist::piece_square(pawn, src) ^ zobrist::piece_square(promoted, dst);
            }
        }

        captured
    }

    fn castle<const UPDATE_KEY: bool, const UPDATE_NNUE: bool>(
        &mut self,
        king: Piece,
        king_src: Square,
        rook_src: Square,
        updates: &mut NnueUpdates,
    ) {
        debug_assert!(king.kind == PieceKind::King);
        debug_assert!(king_src != rook_src);

        let rank = king_src.rank();
        let (king_dst, rook_dst) = if king_src.file() < rook_src.file() {
            // short
            (Square::of(rank, File::G), Square::of(rank, File::F))
        } else {
            // long
            (Square::of(rank, File::C), Square::of(rank, File::D))
        };

        let rook = Piece::new(PieceKind::Rook, king.color);

        // the rook may be standing where the king lands (or vice versa);
        // clear both before placing either
        let state = self.curr_state_mut();
        state.boards.remove_piece(king_src, king);
        state.boards.remove_piece(rook_src, rook);
        state.boards.set_piece(king_dst, king);
        state.boards.set_piece(rook_dst, rook);
        *state.king_mut(king.color) = king_dst;

        if UPDATE_KEY {
            state.key ^=
                zobrist::piece_square(king, king_src) ^ zobrist::piece_square(king, king_dst);
            state.key ^=
                zobrist::piece_square(rook, rook_src) ^ zobrist::piece_square(rook, rook_dst);
        }

        if UPDATE_NNUE {
            if nnue::refresh_required(king.color, king_src, king_dst) {
                updates.set_refresh(king.color);
            }

            updates.push_sub_add(king, king_src, king_dst);
            updates.push_sub_add(rook, rook_src, rook_dst);
        }
    }

    fn en_passant_capture<const UPDATE_KEY: bool, const UPDATE_NNUE: bool>(
        &mut self,
        pawn: Piece,
        src: Square,
        dst: Square,
        updates: &mut NnueUpdates,
    ) -> Piece {
        debug_assert!(pawn.kind == PieceKind::Pawn);

        // the captured pawn sits behind the en-passant target
        let capture_rank = if dst.rank() == Rank::Three {
            Rank::Four
        } else {
            Rank::Five
        };
        let capture_square = Square::of(capture_rank, dst.file());
        let enemy_pawn = Piece::new(PieceKind::Pawn, pawn.color.toggle());

        let state = self.curr_state_mut();
        state.boards.remove_piece(capture_square, enemy_pawn);
        state.boards.remove_piece(src, pawn);
        if UPDATE_NNUE {
            updates.push_sub(enemy_pawn, capture_square);
            updates.push_sub(pawn, src);
        }
        if UPDATE_KEY {
            state.key ^= zobrist::piece_square(enemy_pawn, capture_square);
            state.key ^= zobrist::piece_square(pawn, src);
        }

        self.explode::<UPDATE_KEY, UPDATE_NNUE>(dst, updates);

        enemy_pawn
    }
}

//
// Board analysis
//

impl Position {
    /// All pieces of `by` that attack `target`, with sliders evaluated
    /// against the supplied occupancy. Passing a doctored occupancy is
    /// how SEE looks through pieces that an exchange would remove.
    pub fn attackers_to(&self, target: Square, occupancy: Bitboard, by: Color) -> Bitboard {
        let bbs = self.bbs();
        let queens = bbs.queens(by);

        let mut attackers = attacks::knight_attacks(target) & bbs.knights(by);
        attackers |= attacks::pawn_attacks(target, by.toggle()) & bbs.pawns(by);
        attackers |= attacks::king_attacks(target) & bbs.kings(by);
        attackers |= attacks::bishop_attacks(target, occupancy) & (queens | bbs.bishops(by));
        attackers |= attacks::rook_attacks(target, occupancy) & (queens | bbs.rooks(by));
        attackers
    }

    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        !self
            .attackers_to(target, self.bbs().occupancy(), by)
            .empty()
    }

    fn any_attacked(&self, targets: Bitboard, by: Color) -> bool {
        targets.iter().any(|sq| self.is_attacked(sq, by))
    }

    /// True when the given move would leave the two kings on adjacent
    /// squares. Connected kings suspend check entirely: neither king
    /// attacks the other, and a ray blocked only by the enemy king gives
    /// no check.
    fn connected_kings(&self, mov: Move) -> bool {
        let us = self.to_move();
        let them = us.toggle();
        let their_king = self.bbs().kings(them);

        let from_square = match self.piece_at(mov.source()) {
            Some(piece) if piece.kind == PieceKind::King => match mov.move_type() {
                MoveType::Castling => {
                    let rank = mov.source().rank();
                    if mov.source().file() < mov.destination().file() {
                        Square::of(rank, File::G)
                    } else {
                        Square::of(rank, File::C)
                    }
                }
                _ => mov.destination(),
            },
            _ => self.curr_state().king(us),
        };

        !(attacks::king_attacks(from_square) & their_king).empty()
    }

    fn calc_checkers(&self) -> Bitboard {
        let us = self.to_move();
        let them = us.toggle();
        let bbs = self.bbs();

        let our_king = bbs.kings(us);
        let their_king = bbs.kings(them);
        if our_king.empty() || their_king.empty() {
            return Bitboard::none();
        }

        let king = our_king.first().unwrap();

        // adjacent kings paralyze each other; no checks exist
        if !(attacks::king_attacks(king) & their_king).empty() {
            return Bitboard::none();
        }

        self.attackers_to(king, bbs.occupancy(), them)
    }

    fn calc_pinned(&self) -> Bitboard {
        let us = self.to_move();
        let them = us.toggle();
        let bbs = self.bbs();

        let mut pinned = Bitboard::none();
        let king = match bbs.kings(us).first() {
            Some(king) => king,
            None => return pinned,
        };

        let ours = bbs.for_color(us);
        let theirs = bbs.for_color(them);
        let occupancy = bbs.occupancy();
        let queens = bbs.queens(them);

        // sliders that see the king through any number of our pieces
        let pinners = (attacks::bishop_attacks(king, theirs) & (queens | bbs.bishops(them)))
            | (attacks::rook_attacks(king, theirs) & (queens | bbs.rooks(them)));

        for pinner in pinners {
            let between = ray_between(king, pinner) & occupancy;
            if !between.multiple() && !(between & ours).empty() {
                pinned |= between;
            }
        }

        pinned
    }

    fn calc_threats(&self) -> Bitboard {
        let them = self.opponent();
        let bbs = self.bbs();
        let occupancy = bbs.occupancy();

        let mut threats = Bitboard::none();
        for queen in bbs.queens(them) {
            threats |= attacks::queen_attacks(queen, occupancy);
        }
        for rook in bbs.rooks(them) {
            threats |= attacks::rook_attacks(rook, occupancy);
        }
        for bishop in bbs.bishops(them) {
            threats |= attacks::bishop_attacks(bishop, occupancy);
        }
        for knight in bbs.knights(them) {
            threats |= attacks::knight_attacks(knight);
        }
        for pawn in bbs.pawns(them) {
            threats |= attacks::pawn_attacks(pawn, them);
        }
        for king in bbs.kings(them) {
            threats |= attacks::king_attacks(king);
        }

        threats
    }

    /// Unified castling path test covering orthodox and 960 setups: the
    /// squares between the king and its destination, and between the
    /// king and the rook, must hold nothing but the two movers, and no
    /// square the king crosses may be attacked.
    pub(crate) fn castling_clear(&self, us: Color, king_src: Square, rook_src: Square) -> bool {
        let them = us.toggle();
        let rank = king_src.rank();

        let (king_dst, rook_dst) = if king_src.file() < rook_src.file() {
            (Square::of(rank, File::G), Square::of(rank, File::F))
        } else {
            (Square::of(rank, File::C), Square::of(rank, File::D))
        };

        let to_king_dst = ray_between(king_src, king_dst);
        let to_rook = ray_between(king_src, rook_src);

        let occupancy = self.bbs().occupancy()
            ^ Bitboard::from_square(king_src)
            ^ Bitboard::from_square(rook_src);

        let must_be_clear = to_king_dst
            | to_rook
            | Bitboard::from_square(king_dst)
            | Bitboard::from_square(rook_dst);

        (occupancy & must_be_clear).empty()
            && !self.any_attacked(to_king_dst | Bitboard::from_square(king_dst), them)
    }
}

//
// Pseudo-legality and legality
//

impl Position {
    /// Fast structural test: does this move respect piece geometry and
    /// occupancy in the current position? When in check this falls back
    /// to membership in the generated legal move list.
    pub fn is_pseudolegal(&self, mov: Move) -> bool {
        debug_assert!(!mov.is_null());

        if self.is_variant_over() {
            return false;
        }

        let state = self.curr_state();
        let us = self.to_move();
        let them = us.toggle();
        let bbs = state.boards.bbs();

        let src = mov.source();
        let src_piece = match state.boards.piece_at(src) {
            Some(piece) if piece.color == us => piece,
            _ => return false,
        };

        let move_type = mov.move_type();
        let dst = mov.destination();
        let dst_piece = state.boards.piece_at(dst);

        if let Some(dst_piece) = dst_piece {
            // a capture whose blast reaches our own king can never be
            // played
            if !(attacks::blast_radius(dst) & bbs.kings(us)).empty() {
                return false;
            }

            let own_rook_castle = move_type == MoveType::Castling
                && dst_piece == Piece::new(PieceKind::Rook, us);
            if (dst_piece.color == us && !own_rook_castle) || dst_piece.kind == PieceKind::King {
                return false;
            }
        }

        // take advantage of full generation when evading check
        if self.is_check() {
            let mut moves = MoveVec::default();
            movegen::generate_moves(self, &mut moves);
            return moves.iter().any(|&m| m == mov && self.is_legal(m));
        }

        let occupancy = bbs.occupancy();

        if move_type == MoveType::Castling {
            if src_piece.kind != PieceKind::King {
                return false;
            }

            let home_rank = relative_rank(us, Rank::One);
            if src.rank() != home_rank || dst.rank() != home_rank {
                return false;
            }

            let rooks = state.castling_rooks.color(us);
            let expected = if src.file() < dst.file() {
                rooks.kingside
            } else {
                rooks.queenside
            };
            if expected != Some(dst) {
                return false;
            }

            return self.castling_clear(us, src, dst);
        }

        if src_piece.kind == PieceKind::Pawn {
            if move_type == MoveType::EnPassant {
                return Some(dst) == state.en_passant
                    && attacks::pawn_attacks(dst, them).test(src);
            }

            let src_rank = src.rank().as_index() as i32;
            let dst_rank = dst.rank().as_index() as i32;

            // backwards moves don't exist for pawns
            if (us == Color::Black && dst_rank >= src_rank)
                || (us == Color::White && dst_rank <= src_rank)
            {
                return false;
            }

            let promo_rank = relative_rank(us, Rank::Eight);
            if (move_type == MoveType::Promotion) != (dst.rank() == promo_rank) {
                return false;
            }

            if src.file() != dst.file() {
                // a sideways pawn move must be a real capture
                if !(attacks::pawn_attacks(src, us) & bbs.for_color(them)).test(dst) {
                    return false;
                }
            } else if dst_piece.is_some() {
                return false;
            }

            let delta = (dst_rank - src_rank).abs();
            let max_delta = if src.rank() == relative_rank(us, Rank::Two) {
                2
            } else {
                1
            };
            if delta > max_delta {
                return false;
            }

            if delta == 2 {
                let middle = if us == Color::White {
                    dst.plus(-8)
                } else {
                    dst.plus(8)
                };
                if occupancy.test(middle) {
                    return false;
                }
            }

            return true;
        }

        if move_type == MoveType::Promotion || move_type == MoveType::EnPassant {
            return false;
        }

        let attacks = match src_piece.kind {
            PieceKind::Knight => attacks::knight_attacks(src),
            PieceKind::Bishop => attacks::bishop_attacks(src, occupancy),
            PieceKind::Rook => attacks::rook_attacks(src, occupancy),
            PieceKind::Queen => attacks::queen_attacks(src, occupancy),
            PieceKind::King => attacks::king_attacks(src),
            PieceKind::Pawn => unreachable!(),
        };

        attacks.test(dst)
    }

    /// Full legality for a move that is already known to be
    /// pseudo-legal.
    pub fn is_legal(&self, mov: Move) -> bool {
        debug_assert!(!mov.is_null());

        if self.is_variant_over() {
            return false;
        }

        let us = self.to_move();
        let them = us.toggle();
        let state = self.curr_state();
        let bbs = state.boards.bbs();

        let src = mov.source();
        let dst = mov.destination();

        let king = state.king(us);
        let our_king = bbs.kings(us);
        let their_king = bbs.kings(them);
        let theirs = bbs.for_color(them);

        if state.boards.piece_at(dst).is_some() && mov.move_type() != MoveType::Castling {
            // the blast: every non-pawn in the king neighborhood of dst
            let boom = attacks::blast_radius(dst) & (bbs.occupancy() ^ bbs.all_pawns());

            // kings never capture, and are never captured directly
            if self.piece_at(src).map(|p| p.kind) == Some(PieceKind::King) {
                return false;
            }
            if self.piece_at(dst).map(|p| p.kind) == Some(PieceKind::King) {
                return false;
            }

            if !(boom & our_king).empty() {
                return false;
            }
            if !(boom & their_king).empty() {
                // exploding their king wins before any reply, check or no
                return true;
            }

            if self.is_check() {
                if self.connected_kings(mov) {
                    return true;
                }

                let checker = state
                    .checkers
                    .first()
                    .expect("in check without a checker recorded");
                let checker_blast = attacks::blast_radius(checker) & theirs;

                // exploding the checking piece answers the check, as
                // long as no slider sees the king on the cleared board;
                // a checking pawn only dies at the blast centre itself
                if self.piece_at(checker).map(|p| p.kind) != Some(PieceKind::Pawn)
                    && checker_blast.test(dst)
                {
                    let after_boom = bbs.occupancy()
                        ^ (boom | Bitboard::from_square(dst) | Bitboard::from_square(src));
                    return !self.slider_sees_king(king, after_boom, them);
                }
            }

            let after_boom =
                bbs.occupancy() ^ (boom | Bitboard::from_square(dst) | Bitboard::from_square(src));
            if (attacks::king_attacks(king) & their_king).empty()
                && self.slider_sees_king(king, after_boom, them)
            {
                return false;
            }
        }

        if mov.move_type() == MoveType::Castling {
            let rank = src.rank();
            let king_dst = if src.file() < dst.file() {
                Square::of(rank, File::G)
            } else {
                Square::of(rank, File::C)
            };

            // castling cannot answer check, and the king must land safe
            return !self.connected_kings(mov)
                && !self.is_check()
                && !state.threats.test(king_dst)
                && !(opts::opts().chess960 && state.pinned.test(dst));
        } else if mov.move_type() == MoveType::EnPassant {
            let capture_rank = if dst.rank() == Rank::Three {
                Rank::Four
            } else {
                Rank::Five
            };
            let capture_square = Square::of(capture_rank, dst.file());

            let boom = attacks::blast_radius(dst) & (bbs.occupancy() ^ bbs.all_pawns());
            let after_boom = bbs.occupancy()
                ^ (boom
                    | Bitboard::from_square(src)
                    | Bitboard::from_square(capture_square));

            if !(boom & our_king).empty() {
                return false;
            }
            if !(boom & their_king).empty() {
                return true;
            }
            if (attacks::king_attacks(king) & their_king).empty()
                && self.slider_sees_king(king, after_boom, them)
            {
                return false;
            }
        }

        let moving = state.boards.piece_at(src);

        if moving.map(|p| p.kind) == Some(PieceKind::King) {
            // a king may always step into contact with the enemy king
            if self.connected_kings(mov) {
                return true;
            }

            let kingless = bbs.occupancy() ^ our_king;
            return !state.threats.test(dst) && !self.slider_sees_king(dst, kingless, them);
        }

        // double check is only answered by a king move; the explosion
        // answers were all handled above
        if state.checkers.multiple()
            || (state.pinned.test(src) && !ray_through(src, dst).test(king))
        {
            return false;
        }

        if state.checkers.empty() {
            return true;
        }

        let checker = state.checkers.first().unwrap();
        (ray_between(king, checker) | Bitboard::from_square(checker)).test(dst)
    }

    /// Do any surviving enemy sliders attack `sq` on the given
    /// occupancy? Pieces not in the occupancy are treated as gone.
    fn slider_sees_king(&self, sq: Square, occupancy: Bitboard, them: Color) -> bool {
        let bbs = self.bbs();
        let queens = bbs.queens(them) & occupancy;
        let bishops = bbs.bishops(them) & occupancy;
        let rooks = bbs.rooks(them) & occupancy;

        !(attacks::bishop_attacks(sq, occupancy) & (queens | bishops)).empty()
            || !(attacks::rook_attacks(sq, occupancy) & (queens | rooks)).empty()
    }
}

//
// Cycle detection
//

impl Position {
    /// Detects an upcoming repetition using the cuckoo table of
    /// reversible move deltas: true if some prior position within the
    /// fifty-move window is exactly one reversible move away from the
    /// current one. `ply` is the distance from the search root;
    /// repetitions that straddle the root only count for the side to
    /// move.
    pub fn has_cycle(&self, ply: i32) -> bool {
        use crate::cuckoo::{self, CUCKOO};

        let state = self.curr_state();

        let end = std::cmp::min(state.halfmove as usize, self.keys.len());
        if end < 3 {
            return false;
        }

        let key_back = |d: usize| self.keys[self.keys.len() - d];

        let occupancy = state.boards.bbs().occupancy();
        let original = state.key;

        let mut other = !(original ^ key_back(1));

        let mut d = 3;
        while d <= end {
            other ^= !(key_back(d) ^ key_back(d - 1));
            if other == 0 {
                let diff = original ^ key_back(d);

                let mut slot = cuckoo::h1(diff);
                if diff != CUCKOO.keys[slot] {
                    slot = cuckoo::h2(diff);
                }

                if diff == CUCKOO.keys[slot] {
                    let mov = CUCKOO.moves[slot];

                    if (occupancy & ray_between(mov.source(), mov.destination())).empty() {
                        // repetition strictly after the root is always a draw
                        if ply > d as i32 {
                            return true;
                        }

                        let piece = state
                            .boards
                            .piece_at(mov.source())
                            .or_else(|| state.boards.piece_at(mov.destination()))
                            .expect("cuckoo move endpoints are both empty");

                        return piece.color == self.to_move();
                    }
                }
            }

            d += 2;
        }

        false
    }
}

//
// FEN and UCI
//

impl Position {
    pub fn to_fen(&self) -> String {
        let state = self.curr_state();
        let mut fen = String::new();

        for &rank in RANKS.iter().rev() {
            let mut empty_squares = 0;
            for &file in FILES.iter() {
                let square = Square::of(rank, file);
                if let Some(piece) = state.boards.piece_at(square) {
                    if empty_squares != 0 {
                        write!(&mut fen, "{}", empty_squares).unwrap();
                    }
                    write!(&mut fen, "{}", piece).unwrap();
                    empty_squares = 0;
                } else {
                    empty_squares += 1;
                }
            }

            if empty_squares != 0 {
                write!(&mut fen, "{}", empty_squares).unwrap();
            }

            if rank != Rank::One {
                fen.push('/');
            }
        }

        write!(&mut fen, " {} ", self.to_move()).unwrap();

        let rooks = state.castling_rooks;
        if rooks == CastlingRooks::default() {
            fen.push('-');
        } else if opts::opts().chess960 {
            if let Some(sq) = rooks.white().kingside {
                fen.push((b'A' + sq.file().as_index() as u8) as char);
            }
            if let Some(sq) = rooks.white().queenside {
                fen.push((b'A' + sq.file().as_index() as u8) as char);
            }
            if let Some(sq) = rooks.black().kingside {
                fen.push((b'a' + sq.file().as_index() as u8) as char);
            }
            if let Some(sq) = rooks.black().queenside {
                fen.push((b'a' + sq.file().as_index() as u8) as char);
            }
        } else {
            if rooks.white().kingside.is_some() {
                fen.push('K');
            }
            if rooks.white().queenside.is_some() {
                fen.push('Q');
            }
            if rooks.black().kingside.is_some() {
                fen.push('k');
            }
            if rooks.black().queenside.is_some() {
                fen.push('q');
            }
        }

        match state.en_passant {
            Some(ep) => write!(&mut fen, " {}", ep).unwrap(),
            None => fen.push_str(" -"),
        }

        write!(&mut fen, " {} {}", state.halfmove, self.fullmove).unwrap();

        fen
    }

    /// Parses a move in UCI notation against the current position. In
    /// orthodox mode a two-square king step is converted into the
    /// king-takes-rook castling encoding; in 960 mode the caller already
    /// speaks king-takes-rook.
    pub fn move_from_uci(&self, move_str: &str) -> Option<Move> {
        if move_str == "0000" {
            return Some(Move::null());
        }

        if !move_str.is_ascii() || move_str.len() < 4 || move_str.len() > 5 {
            return None;
        }

        let src = square_from_str(&move_str[0..2])?;
        let dst = square_from_str(&move_str[2..4])?;

        if move_str.len() == 5 {
            let kind = match move_str.as_bytes()[4] {
                b'n' => PieceKind::Knight,
                b'b' => PieceKind::Bishop,
                b'r' => PieceKind::Rook,
                b'q' => PieceKind::Queen,
                _ => return None,
            };
            return Some(Move::promotion(src, dst, kind));
        }

        let state = self.curr_state();
        let src_piece = state.boards.piece_at(src)?;

        if src_piece.kind == PieceKind::King {
            if opts::opts().chess960 {
                if state.boards.piece_at(dst) == Some(Piece::new(PieceKind::Rook, src_piece.color))
                {
                    return Some(Move::castling(src, dst));
                }
                return Some(Move::standard(src, dst));
            }

            let file_delta =
                (src.file().as_index() as i32 - dst.file().as_index() as i32).abs();
            if file_delta == 2 {
                let rook_file = if src.file() < dst.file() {
                    File::H
                } else {
                    File::A
                };
                return Some(Move::castling(src, Square::of(src.rank(), rook_file)));
            }
        }

        if src_piece.kind == PieceKind::Pawn && Some(dst) == state.en_passant {
            return Some(Move::en_passant(src, dst));
        }

        Some(Move::standard(src, dst))
    }

    /// Renders a move in the UCI notation expected by the current
    /// variant mode; the inverse of `move_from_uci`.
    pub fn move_to_uci(&self, mov: Move) -> String {
        if mov.move_type() == MoveType::Castling && !opts::opts().chess960 {
            let rank = mov.source().rank();
            let king_dst = if mov.source().file() < mov.destination().file() {
                Square::of(rank, File::G)
            } else {
                Square::of(rank, File::C)
            };
            return format!("{}{}", mov.source(), king_dst);
        }

        mov.as_uci()
    }
}

//
// Regeneration and verification
//

impl Position {
    /// Rebuilds all derived state - mailbox, king squares, Zobrist key,
    /// checkers, pins, threats - from the bitboards. With
    /// `EP_FROM_MOVES` the en-passant square is rederived from the
    /// previous state's last move instead of trusted.
    fn regen<const EP_FROM_MOVES: bool>(&mut self) {
        let ep_from_history = if EP_FROM_MOVES {
            let mut ep = None;
            if self.states.len() > 1 {
                let last_move = self.states[self.states.len() - 2].last_move;
                if !last_move.is_null() && last_move.move_type() == MoveType::Standard {
                    let piece = self.curr_state().boards.piece_at(last_move.destination());
                    if let Some(piece) = piece {
                        let src_rank = last_move.source().rank().as_index() as i32;
                        let dst_rank = last_move.destination().rank().as_index() as i32;
                        if piece.kind == PieceKind::Pawn && (src_rank - dst_rank).abs() == 2 {
                            let ep_rank = if piece.color == Color::Black {
                                Rank::Six
                            } else {
                                Rank::Three
                            };
                            ep = Some(Square::of(ep_rank, last_move.destination().file()));
                        }
                    }
                }
            }
            Some(ep)
        } else {
            None
        };

        let state = self.curr_state_mut();

        state.boards.regen_from_bbs();
        state.key = 0;

        for &square in crate::types::SQUARES.iter() {
            if let Some(piece) = state.boards.piece_at(square) {
                if piece.kind == PieceKind::King {
                    *state.king_mut(piece.color) = square;
                }

                state.key ^= zobrist::piece_square(piece, square);
            }
        }

        if let Some(ep) = ep_from_history {
            state.en_passant = ep;
        }

        if self.black_to_move {
            self.curr_state_mut().key ^= zobrist::black_to_move();
        }

        let rights_key = castling_key(&self.curr_state().castling_rooks);
        let ep_key = match self.curr_state().en_passant {
            Some(ep) => zobrist::en_passant(ep),
            None => 0,
        };
        self.curr_state_mut().key ^= rights_key ^ ep_key;

        let checkers = self.calc_checkers();
        let pinned = self.calc_pinned();
        let threats = self.calc_threats();
        let state = self.curr_state_mut();
        state.checkers = checkers;
        state.pinned = pinned;
        state.threats = threats;
    }

    #[cfg(debug_assertions)]
    fn debug_verify<const HAS_HISTORY: bool>(&self) {
        if !self.verify::<HAS_HISTORY>() {
            self.print_history();
            panic!("incremental position state diverged from regeneration");
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_verify<const HAS_HISTORY: bool>(&self) {}

    /// Debug self-check: regenerate from scratch and compare the
    /// incrementally maintained key and en-passant square.
    #[cfg(debug_assertions)]
    fn verify<const HAS_HISTORY: bool>(&self) -> bool {
        let mut regened = self.clone();
        regened.regen::<HAS_HISTORY>();

        let mut ok = true;

        if !self.curr_state().boards.is_coherent() {
            error!("mailbox and bitboards disagree");
            ok = false;
        }

        if self.curr_state().en_passant != regened.curr_state().en_passant {
            error!(
                "en passant squares do not match: current {:?}, regened {:?}",
                self.curr_state().en_passant,
                regened.curr_state().en_passant
            );
            ok = false;
        }

        if self.curr_state().key != regened.curr_state().key {
            error!(
                "keys do not match: current {:016X}, regened {:016X}",
                self.curr_state().key,
                regened.curr_state().key
            );
            ok = false;
        }

        ok
    }

    #[cfg(debug_assertions)]
    fn print_history(&self) {
        let mut history = String::new();
        for state in &self.states[..self.states.len() - 1] {
            if !history.is_empty() {
                history.push(' ');
            }
            history.push_str(&state.last_move.as_uci());
        }

        error!("move history: {}", history);
    }
}

//
// Helpers
//

fn castling_key(rooks: &CastlingRooks) -> u64 {
    let mut key = 0;
    for &color in COLORS.iter() {
        if rooks.color(color).kingside.is_some() {
            key ^= zobrist::castling_kingside(color);
        }
        if rooks.color(color).queenside.is_some() {
            key ^= zobrist::castling_queenside(color);
        }
    }

    key
}

fn square_from_str(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = File::try_from(chars.next()?).ok()?;
    let rank = Rank::try_from(chars.next()?).ok()?;
    if chars.next().is_some() {
        return None;
    }

    Some(Square::of(rank, file))
}

/// Derives the backrank piece order for a Scharnagl index in 0..960.
fn scharnagl_to_backrank(n: u32) -> [PieceKind; 8] {
    debug_assert!(n < 960);

    // knight pairs, with the second knight's file counted after the
    // first knight has been placed
    static N5N: [(u32, u32); 10] = [
        (0, 0),
        (0, 1),
        (0, 2),
        (0, 3),
        (1, 1),
        (1, 2),
        (1, 3),
        (2, 2),
        (2, 3),
        (3, 3),
    ];

    let mut backrank = [PieceKind::Pawn; 8];

    let place_in_nth_free = |backrank: &mut [PieceKind; 8], n: u32, piece: PieceKind| {
        let mut free = 0;
        for slot in backrank.iter_mut() {
            if *slot == PieceKind::Pawn {
                if free == n {
                    *slot = piece;
                    return;
                }
                free += 1;
            }
        }
    };

    let n2 = n / 4;
    let b1 = n % 4;

    let n3 = n2 / 4;
    let b2 = n2 % 4;

    let n4 = n3 / 6;
    let q = n3 % 6;

    backrank[(b1 * 2 + 1) as usize] = PieceKind::Bishop;
    backrank[(b2 * 2) as usize] = PieceKind::Bishop;

    place_in_nth_free(&mut backrank, q, PieceKind::Queen);

    let (knight1, knight2) = N5N[n4 as usize];
    place_in_nth_free(&mut backrank, knight1, PieceKind::Knight);
    place_in_nth_free(&mut backrank, knight2, PieceKind::Knight);

    place_in_nth_free(&mut backrank, 0, PieceKind::Rook);
    place_in_nth_free(&mut backrank, 0, PieceKind::King);
    place_in_nth_free(&mut backrank, 0, PieceKind::Rook);

    backrank
}

fn parse_castling(field: &str, state: &mut BoardState) -> Result<(), FenParseError> {
    if field == "-" {
        return Ok(());
    }

    if field.len() > 4 {
        return Err(FenParseError::InvalidCastle);
    }

    // king squares are needed to resolve 960 flags relative to the king
    for &square in crate::types::SQUARES.iter() {
        if let Some(piece) = state.boards.piece_at(square) {
            if piece.kind == PieceKind::King {
                *state.king_mut(piece.color) = square;
            }
        }
    }

    if opts::opts().chess960 {
        for flag in field.chars() {
            match flag {
                'a'..='h' => {
                    let file = File::from_index(flag as usize - 'a' as usize);
                    let king_file = state.king(Color::Black).file();
                    if file == king_file {
                        return Err(FenParseError::InvalidCastle);
                    }

                    let square = Square::of(Rank::Eight, file);
                    if file < king_file {
                        state.castling_rooks.color_mut(Color::Black).queenside = Some(square);
                    } else {
                        state.castling_rooks.color_mut(Color::Black).kingside = Some(square);
                    }
                }
                'A'..='H' => {
                    let file = File::from_index(flag as usize - 'A' as usize);
                    let king_file = state.king(Color::White).file();
                    if file == king_file {
                        return Err(FenParseError::InvalidCastle);
                    }

                    let square = Square::of(Rank::One, file);
                    if file < king_file {
                        state.castling_rooks.color_mut(Color::White).queenside = Some(square);
                    } else {
                        state.castling_rooks.color_mut(Color::White).kingside = Some(square);
                    }
                }
                'k' => {
                    // shorthand: the outermost rook kingside of the king
                    find_shorthand_rook(state, Color::Black, true);
                }
                'K' => {
                    find_shorthand_rook(state, Color::White, true);
                }
                'q' => {
                    find_shorthand_rook(state, Color::Black, false);
                }
                'Q' => {
                    find_shorthand_rook(state, Color::White, false);
                }
                _ => return Err(FenParseError::InvalidCastle),
            }
        }
    } else {
        for flag in field.chars() {
            match flag {
                'k' => state.castling_rooks.color_mut(Color::Black).kingside = Some(Square::H8),
                'q' => state.castling_rooks.color_mut(Color::Black).queenside = Some(Square::A8),
                'K' => state.castling_rooks.color_mut(Color::White).kingside = Some(Square::H1),
                'Q' => state.castling_rooks.color_mut(Color::White).queenside = Some(Square::A1),
                _ => return Err(FenParseError::InvalidCastle),
            }
        }
    }

    Ok(())
}

fn find_shorthand_rook(state: &mut BoardState, color: Color, kingside: bool) {
    let rank = relative_rank(color, Rank::One);
    let king_file = state.king(color).file().as_index() as i32;
    let rook = Piece::new(PieceKind::Rook, color);

    let files: Vec<i32> = if kingside {
        ((king_file + 1)..8).collect()
    } else {
        (0..king_file).rev().collect()
    };

    for file in files {
        let square = Square::of(rank, File::from_index(file as usize));
        if state.boards.piece_at(square) == Some(rook) {
            let pair = state.castling_rooks.color_mut(color);
            if kingside {
                pair.kingside = Some(square);
            } else {
                pair.queenside = Some(square);
            }
            break;
        }
    }
}

//
// Trait implementations
//

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &rank in RANKS.iter().rev() {
            for &file in FILES.iter() {
                let sq = Square::of(rank, file);
                if let Some(piece) = self.piece_at(sq) {
                    write!(f, " {} ", piece)?;
                } else {
                    write!(f, " . ")?;
                }
            }

            writeln!(f, "| {}", rank)?;
        }

        for _ in FILES.iter() {
            write!(f, "---")?;
        }

        writeln!(f)?;
        for &file in FILES.iter() {
            write!(f, " {} ", file)?;
        }

        writeln!(f)?;
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}
