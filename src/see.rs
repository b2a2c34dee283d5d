// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Static exchange evaluation, Atomic style. There is no capture
//! sequence to unwind here: one capture removes the victim, the
//! capturer, and every adjacent non-pawn in a single blast, so the
//! evaluator sums the blast directly. Two absolutes override the
//! arithmetic - a blast containing the enemy king wins outright and one
//! containing our own king loses outright - and a quiet move is scored
//! by the cheapest enemy recapture that the post-move board allows.
use std::cmp;

use crate::attacks;
use crate::bitboard::Bitboard;
use crate::boards::PositionBoards;
use crate::moves::{Move, MoveType};
use crate::position::Position;
use crate::types::{Piece, PieceKind, Score};

pub const PAWN_VALUE: Score = 100;
pub const KNIGHT_VALUE: Score = 450;
pub const BISHOP_VALUE: Score = 450;
pub const ROOK_VALUE: Score = 650;
pub const QUEEN_VALUE: Score = 1250;
pub const KING_VALUE: Score = 0;

/// Winning (or losing) a king in the blast dominates any material
/// arithmetic.
pub const MATE: Score = 32_000;

// sentinel for "no recapture found yet"; above any real piece value but
// below an outright mate
const MAX_MATE: Score = MATE - 256;

pub fn kind_value(kind: PieceKind) -> Score {
    match kind {
        PieceKind::Pawn => PAWN_VALUE,
        PieceKind::Knight => KNIGHT_VALUE,
        PieceKind::Bishop => BISHOP_VALUE,
        PieceKind::Rook => ROOK_VALUE,
        PieceKind::Queen => QUEEN_VALUE,
        PieceKind::King => KING_VALUE,
    }
}

pub fn value(piece: Piece) -> Score {
    kind_value(piece.kind)
}

/// The immediate material swing of a capture: captured piece plus every
/// enemy piece in the blast, minus our own pieces in the blast
/// (including the capturer, which never survives). Short-circuits to
/// `±MATE` when a king stands in the blast.
pub fn gain(boards: &PositionBoards, mov: Move) -> Score {
    let bbs = boards.bbs();

    let us = boards
        .piece_at(mov.source())
        .expect("gain of a move with an empty source")
        .color;
    let them = us.toggle();

    let mut score = 0;
    let mut from_to =
        Bitboard::from_square(mov.destination()) | Bitboard::from_square(mov.source());

    if mov.move_type() == MoveType::EnPassant {
        from_to = Bitboard::from_square(mov.source());
        score += kind_value(PieceKind::Pawn);
    }

    let boom = (attacks::blast_radius(mov.destination()) & !bbs.all_pawns()) | from_to;

    if !(boom & bbs.kings(us)).empty() {
        return -MATE;
    }
    if !(boom & bbs.kings(them)).empty() {
        return MATE;
    }

    for square in boom & bbs.for_color(us) {
        score -= value(boards.piece_at(square).expect("occupied blast square"));
    }
    for square in boom & bbs.for_color(them) {
        score += value(boards.piece_at(square).expect("occupied blast square"));
    }

    score
}

/// The full Atomic exchange score of a move.
///
/// Captures score as `gain` minus one, the tie-break that makes an even
/// trade marginally losing. Quiet moves (castling included) score the
/// opponent's best answer on the destination square: the cheapest
/// attacker over the post-move occupancy recaptures, at zero cost if the
/// counter-blast would consume it anyway, and the blast arithmetic
/// around the destination is added on top. A quiet move never scores
/// above zero.
pub fn gain_atomic(pos: &Position, mov: Move) -> Score {
    let boards = pos.boards();
    let bbs = boards.bbs();

    let mover = boards
        .piece_at(mov.source())
        .expect("exchange evaluation of a move with an empty source");
    let us = mover.color;
    let them = us.toggle();

    let mut from_to =
        Bitboard::from_square(mov.destination()) | Bitboard::from_square(mov.source());
    let mut captured = boards.piece_at(mov.destination());

    if mov.move_type() == MoveType::EnPassant {
        from_to = Bitboard::from_square(mov.source());
        captured = Some(Piece::new(PieceKind::Pawn, them));
    }

    let castle = mov.move_type() == MoveType::Castling;

    if captured.is_some() && !castle {
        return gain(boards, mov) - 1;
    }

    let dst = mov.destination();
    let ours = bbs.for_color(us);
    let theirs = bbs.for_color(them);

    let boom =
        (attacks::blast_radius(dst) & !bbs.all_pawns()) | (from_to & bbs.occupancy());

    // what would the opponent's cheapest recapture on dst cost them? a
    // recapturer standing inside the blast is spent for free
    let occupied = bbs.occupancy() ^ from_to;
    let mut min_attacker = MAX_MATE;
    for attacker in pos.attackers_to(dst, occupied, them) {
        let piece = boards.piece_at(attacker).expect("attacker square is occupied");
        if piece.kind == PieceKind::King {
            continue;
        }

        let cost = if boom.test(attacker) { 0 } else { value(piece) };
        min_attacker = cmp::min(min_attacker, cost);
    }

    if min_attacker == MAX_MATE {
        // nothing can come back to the square
        return 0;
    }

    let mut result = min_attacker;

    if !(boom & bbs.kings(us)).empty() {
        result -= MATE;
    } else if !(boom & bbs.kings(them)).empty() {
        result += MATE;
    } else {
        for square in boom & ours {
            result -= value(boards.piece_at(square).expect("occupied blast square"));
        }
        for square in boom & theirs {
            result += value(boards.piece_at(square).expect("occupied blast square"));
        }
    }

    cmp::min(result, 0)
}

/// Threshold test used to prune captures in search: true when the
/// exchange score meets or exceeds `threshold`. Monotone in the
/// threshold by construction.
pub fn see(pos: &Position, mov: Move, threshold: Score) -> bool {
    gain_atomic(pos, mov) >= threshold
}
