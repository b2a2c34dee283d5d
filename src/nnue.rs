// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The incremental-evaluation bridge. Move application describes what it
//! did to the board as a batch of feature subtractions and additions -
//! an Atomic capture can subtract up to ten pieces and add none - and
//! the evaluator consumes the batch without caring about order, provided
//! all subtractions from one explosion arrive before any addition.
//!
//! The accumulator here is a per-color feature sum over (piece, square)
//! pairs with single-bucket king handling, so `refresh_required` is
//! constant false and the refresh plumbing only fires when a caller
//! forces it. The stack mirrors the position's state stack: `update`
//! with history pushes, `pop` pops.
use crate::bitboard::BitboardSet;
use crate::see;
use crate::types::{Color, Piece, PieceKind, Score, Square, TableIndex, COLORS, PIECE_KINDS};

// captured piece + eight blast squares + the capturer
const MAX_SUBS: usize = 10;
const MAX_ADDS: usize = 2;

/// The feature diff produced by applying one move.
#[derive(Copy, Clone, Debug)]
pub struct NnueUpdates {
    subs: [(Piece, Square); MAX_SUBS],
    adds: [(Piece, Square); MAX_ADDS],
    num_subs: usize,
    num_adds: usize,
    refresh: [bool; 2],
}

impl Default for NnueUpdates {
    fn default() -> NnueUpdates {
        let filler = (Piece::new(PieceKind::Pawn, Color::White), Square::A1);
        NnueUpdates {
            subs: [filler; MAX_SUBS],
            adds: [filler; MAX_ADDS],
            num_subs: 0,
            num_adds: 0,
            refresh: [false; 2],
        }
    }
}

impl NnueUpdates {
    pub fn push_sub(&mut self, piece: Piece, square: Square) {
        self.subs[self.num_subs] = (piece, square);
        self.num_subs += 1;
    }

    pub fn push_add(&mut self, piece: Piece, square: Square) {
        self.adds[self.num_adds] = (piece, square);
        self.num_adds += 1;
    }

    pub fn push_sub_add(&mut self, piece: Piece, from: Square, to: Square) {
        self.push_sub(piece, from);
        self.push_add(piece, to);
    }

    /// Requests a full accumulator rebuild for one color instead of
    /// applying this batch incrementally.
    pub fn set_refresh(&mut self, color: Color) {
        self.refresh[color.as_index()] = true;
    }

    pub fn requires_refresh(&self, color: Color) -> bool {
        self.refresh[color.as_index()]
    }

    pub fn subs(&self) -> &[(Piece, Square)] {
        &self.subs[..self.num_subs]
    }

    pub fn adds(&self) -> &[(Piece, Square)] {
        &self.adds[..self.num_adds]
    }
}

/// Whether moving a king between the two given squares forces an
/// accumulator rebuild for that color. The single-bucket feature set
/// never does.
pub fn refresh_required(_color: Color, _old_king: Square, _new_king: Square) -> bool {
    false
}

fn feature(piece: Piece, _square: Square) -> Score {
    see::kind_value(piece.kind)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Accumulator {
    totals: [Score; 2],
}

impl Accumulator {
    fn from_bbs(bbs: &BitboardSet) -> Accumulator {
        let mut acc = Accumulator::default();
        for &color in COLORS.iter() {
            acc.rebuild_color(bbs, color);
        }

        acc
    }

    fn rebuild_color(&mut self, bbs: &BitboardSet, color: Color) {
        let mut total = 0;
        for &kind in PIECE_KINDS.iter() {
            for square in bbs.pieces(kind, color) {
                total += feature(Piece::new(kind, color), square);
            }
        }

        self.totals[color.as_index()] = total;
    }
}

/// The evaluator-side accumulator stack. One per search worker, sharing
/// no state with any other.
#[derive(Clone, Debug)]
pub struct NnueState {
    stack: Vec<Accumulator>,
}

impl Default for NnueState {
    fn default() -> Self {
        NnueState::new()
    }
}

impl NnueState {
    pub fn new() -> NnueState {
        let mut stack = Vec::with_capacity(256);
        stack.push(Accumulator::default());

        NnueState { stack }
    }

    /// Seeds the accumulator from a freshly set-up board, dropping any
    /// stacked history.
    pub fn reset(&mut self, bbs: &BitboardSet) {
        self.stack.truncate(1);
        *self.top_mut() = Accumulator::from_bbs(bbs);
    }

    /// Applies one move's worth of feature updates. With `STATE_HISTORY`
    /// the previous accumulator is kept for `pop`; otherwise the update
    /// happens in place.
    pub fn update<const STATE_HISTORY: bool>(
        &mut self,
        updates: &NnueUpdates,
        bbs: &BitboardSet,
        _white_king: Square,
        _black_king: Square,
    ) {
        if STATE_HISTORY {
            let top = *self.top();
            self.stack.push(top);
        }

        for &color in COLORS.iter() {
            if updates.requires_refresh(color) {
                let rebuilt = {
                    let mut acc = *self.top();
                    acc.rebuild_color(bbs, color);
                    acc
                };
                *self.top_mut() = rebuilt;
            }
        }

        for &(piece, square) in updates.subs() {
            if !updates.requires_refresh(piece.color) {
                self.top_mut().totals[piece.color.as_index()] -= feature(piece, square);
            }
        }

        for &(piece, square) in updates.adds() {
            if !updates.requires_refresh(piece.color) {
                self.top_mut().totals[piece.color.as_index()] += feature(piece, square);
            }
        }
    }

    pub fn pop(&mut self) {
        debug_assert!(self.stack.len() > 1, "pop with no pushed accumulator");
        self.stack.pop();
    }

    /// The accumulated evaluation from the perspective of the side to
    /// move.
    pub fn evaluate(&self, to_move: Color) -> Score {
        let top = self.top();
        top.totals[to_move.as_index()] - top.totals[to_move.toggle().as_index()]
    }

    /// One-shot evaluation built from scratch; the reference the
    /// incremental path must agree with.
    pub fn evaluate_once(bbs: &BitboardSet, to_move: Color) -> Score {
        let acc = Accumulator::from_bbs(bbs);
        acc.totals[to_move.as_index()] - acc.totals[to_move.toggle().as_index()]
    }

    fn top(&self) -> &Accumulator {
        self.stack.last().expect("accumulator stack is never empty")
    }

    fn top_mut(&mut self) -> &mut Accumulator {
        self.stack
            .last_mut()
            .expect("accumulator stack is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_piece(bbs: &mut BitboardSet, kind: PieceKind, color: Color, square: Square) {
        bbs.for_kind_mut(kind).set(square);
        bbs.for_color_mut(color).set(square);
    }

    #[test]
    fn evaluate_once_counts_material() {
        let mut bbs = BitboardSet::new();
        set_piece(&mut bbs, PieceKind::Queen, Color::White, Square::D1);
        set_piece(&mut bbs, PieceKind::Pawn, Color::Black, Square::D7);

        assert_eq!(
            see::kind_value(PieceKind::Queen) - see::kind_value(PieceKind::Pawn),
            NnueState::evaluate_once(&bbs, Color::White)
        );
        assert_eq!(
            see::kind_value(PieceKind::Pawn) - see::kind_value(PieceKind::Queen),
            NnueState::evaluate_once(&bbs, Color::Black)
        );
    }

    #[test]
    fn incremental_update_matches_reset() {
        let mut bbs = BitboardSet::new();
        set_piece(&mut bbs, PieceKind::Rook, Color::White, Square::A1);
        set_piece(&mut bbs, PieceKind::Knight, Color::Black, Square::B8);

        let mut state = NnueState::new();
        state.reset(&bbs);

        // simulate an explosion removing the knight and the rook
        let mut updates = NnueUpdates::default();
        updates.push_sub(Piece::new(PieceKind::Knight, Color::Black), Square::B8);
        updates.push_sub(Piece::new(PieceKind::Rook, Color::White), Square::A1);

        let after = BitboardSet::new();
        state.update::<true>(&updates, &after, Square::E1, Square::E8);

        assert_eq!(0, state.evaluate(Color::White));
        assert_eq!(
            NnueState::evaluate_once(&after, Color::White),
            state.evaluate(Color::White)
        );

        state.pop();
        assert_eq!(
            NnueState::evaluate_once(&bbs, Color::White),
            state.evaluate(Color::White)
        );
    }

    #[test]
    fn forced_refresh_rebuilds_from_the_board() {
        let mut bbs = BitboardSet::new();
        set_piece(&mut bbs, PieceKind::Queen, Color::White, Square::D1);

        let mut state = NnueState::new();
        state.reset(&BitboardSet::new());

        let mut updates = NnueUpdates::default();
        updates.set_refresh(Color::White);
        state.update::<false>(&updates, &bbs, Square::E1, Square::E8);

        assert_eq!(
            see::kind_value(PieceKind::Queen),
            state.evaluate(Color::White)
        );
    }
}
