// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The cuckoo table for upcoming-repetition detection, after Marcel van
//! Kervinck's scheme as popularized by Stockfish. Every reversible move
//! (a non-capturing move by a non-pawn) has a Zobrist delta: the XOR of
//! its two piece-square keys and the side-to-move key. If the XOR of the
//! current position key with a key from the history matches one of these
//! deltas, the two positions are one reversible move apart and a
//! repetition is available. The deltas are stored in an 8192-slot
//! two-hash cuckoo table so a lookup costs at most two probes.
use crate::attacks;
use crate::bitboard::Bitboard;
use crate::moves::Move;
use crate::types::{Piece, PieceKind, Square, TableIndex, COLORS, PIECE_KINDS};
use crate::zobrist;

pub const TABLE_SIZE: usize = 8192;

pub fn h1(key: u64) -> usize {
    ((key >> 32) & 0x1FFF) as usize
}

pub fn h2(key: u64) -> usize {
    ((key >> 48) & 0x1FFF) as usize
}

pub struct CuckooTable {
    pub keys: [u64; TABLE_SIZE],
    pub moves: [Move; TABLE_SIZE],
}

impl CuckooTable {
    fn new() -> CuckooTable {
        let mut table = CuckooTable {
            keys: [0; TABLE_SIZE],
            moves: [Move::null(); TABLE_SIZE],
        };

        let mut count = 0u32;
        for &color in COLORS.iter() {
            // pawn moves are never reversible
            for &kind in PIECE_KINDS.iter().skip(1) {
                for i in 0..64 {
                    for j in (i + 1)..64 {
                        let src = Square::from_index(i);
                        let dst = Square::from_index(j);
                        if !empty_board_attacks(kind, src).test(dst) {
                            continue;
                        }

                        let piece = Piece::new(kind, color);
                        let mut key = zobrist::piece_square(piece, src)
                            ^ zobrist::piece_square(piece, dst)
                            ^ zobrist::black_to_move();
                        let mut mov = Move::standard(src, dst);

                        // cuckoo insertion: evict until a slot comes up empty
                        let mut slot = h1(key);
                        loop {
                            std::mem::swap(&mut table.keys[slot], &mut key);
                            std::mem::swap(&mut table.moves[slot], &mut mov);

                            if key == 0 {
                                break;
                            }

                            slot = if slot == h1(key) { h2(key) } else { h1(key) };
                        }

                        count += 1;
                    }
                }
            }
        }

        // every reversible move on an otherwise empty board, both colors
        debug_assert_eq!(3668, count);
        let _ = count;

        table
    }
}

fn empty_board_attacks(kind: PieceKind, sq: Square) -> Bitboard {
    match kind {
        PieceKind::Knight => attacks::knight_attacks(sq),
        PieceKind::Bishop => attacks::bishop_attacks(sq, Bitboard::none()),
        PieceKind::Rook => attacks::rook_attacks(sq, Bitboard::none()),
        PieceKind::Queen => attacks::queen_attacks(sq, Bitboard::none()),
        PieceKind::King => attacks::king_attacks(sq),
        PieceKind::Pawn => unreachable!("pawn moves are not reversible"),
    }
}

lazy_static! {
    pub static ref CUCKOO: CuckooTable = CuckooTable::new();
}
