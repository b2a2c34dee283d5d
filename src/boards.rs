// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `PositionBoards` pairs the square-indexed piece array (the mailbox)
//! with the bitboard set and keeps the two representations coherent.
//! All board mutation in the engine funnels through the handful of
//! primitives here; nothing else may touch either representation. This
//! matters more in Atomic than in orthodox chess because a single capture
//! can remove up to ten pieces, and a desync between the mailbox and the
//! bitboards is the classic source of explosion bugs.
use crate::bitboard::BitboardSet;
use crate::types::{Piece, PieceKind, Square, TableIndex, SQUARES};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PositionBoards {
    mailbox: [Option<Piece>; 64],
    bbs: BitboardSet,
}

impl Default for PositionBoards {
    fn default() -> PositionBoards {
        PositionBoards {
            mailbox: [None; 64],
            bbs: BitboardSet::new(),
        }
    }
}

impl PositionBoards {
    pub fn bbs(&self) -> &BitboardSet {
        &self.bbs
    }

    pub fn bbs_mut(&mut self) -> &mut BitboardSet {
        &mut self.bbs
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.mailbox[square.as_index()]
    }

    /// Places a piece on an empty square.
    pub fn set_piece(&mut self, square: Square, piece: Piece) {
        debug_assert!(self.mailbox[square.as_index()].is_none());

        self.mailbox[square.as_index()] = Some(piece);
        self.bbs.for_kind_mut(piece.kind).set(square);
        self.bbs.for_color_mut(piece.color).set(square);
    }

    /// Removes the given piece from the square it occupies.
    pub fn remove_piece(&mut self, square: Square, piece: Piece) {
        debug_assert_eq!(Some(piece), self.mailbox[square.as_index()]);

        self.mailbox[square.as_index()] = None;
        self.bbs.for_kind_mut(piece.kind).unset(square);
        self.bbs.for_color_mut(piece.color).unset(square);
    }

    /// Moves a piece from `src` to an empty `dst`.
    pub fn move_piece(&mut self, src: Square, dst: Square, piece: Piece) {
        debug_assert_eq!(Some(piece), self.mailbox[src.as_index()]);
        debug_assert!(self.mailbox[dst.as_index()].is_none());

        self.mailbox[src.as_index()] = None;
        self.mailbox[dst.as_index()] = Some(piece);

        let kind_board = self.bbs.for_kind_mut(piece.kind);
        kind_board.unset(src);
        kind_board.set(dst);

        let color_board = self.bbs.for_color_mut(piece.color);
        color_board.unset(src);
        color_board.set(dst);
    }

    /// Moves a piece from `src` to an empty `dst`, changing its kind on
    /// arrival. This is the promotion primitive.
    pub fn move_and_change_piece(
        &mut self,
        src: Square,
        dst: Square,
        piece: Piece,
        new_kind: PieceKind,
    ) {
        debug_assert_eq!(Some(piece), self.mailbox[src.as_index()]);
        debug_assert!(self.mailbox[dst.as_index()].is_none());

        let promoted = Piece::new(new_kind, piece.color);

        self.mailbox[src.as_index()] = None;
        self.mailbox[dst.as_index()] = Some(promoted);

        self.bbs.for_kind_mut(piece.kind).unset(src);
        self.bbs.for_kind_mut(new_kind).set(dst);

        let color_board = self.bbs.for_color_mut(piece.color);
        color_board.unset(src);
        color_board.set(dst);
    }

    /// Rebuilds the mailbox from the bitboards. Used after the bitboards
    /// have been populated wholesale, e.g. when setting up a start
    /// position from occupancy constants.
    pub fn regen_from_bbs(&mut self) {
        use crate::types::{COLORS, PIECE_KINDS};

        self.mailbox = [None; 64];
        for &square in SQUARES.iter() {
            for &color in COLORS.iter() {
                if !self.bbs.for_color(color).test(square) {
                    continue;
                }

                for &kind in PIECE_KINDS.iter() {
                    if self.bbs.for_kind(kind).test(square) {
                        self.mailbox[square.as_index()] = Some(Piece::new(kind, color));
                        break;
                    }
                }
            }
        }
    }

    /// Debug check that the mailbox and the bitboards agree square by
    /// square.
    #[cfg(debug_assertions)]
    pub fn is_coherent(&self) -> bool {
        for &square in SQUARES.iter() {
            let from_mailbox = self.mailbox[square.as_index()];
            let mut from_bbs = None;
            for &color in crate::types::COLORS.iter() {
                if self.bbs.for_color(color).test(square) {
                    for &kind in crate::types::PIECE_KINDS.iter() {
                        if self.bbs.for_kind(kind).test(square) {
                            from_bbs = Some(Piece::new(kind, color));
                        }
                    }
                }
            }

            if from_mailbox != from_bbs {
                return false;
            }
        }

        true
    }
}
