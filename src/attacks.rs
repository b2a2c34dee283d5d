// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Attack lookups for every piece kind: precomputed leaper tables for
//! kings, knights, and pawns, and classic ray-scan slider attacks for
//! bishops, rooks, and queens. The king table does double duty in Atomic
//! chess: `blast_radius` is the set of squares cleared by an explosion
//! centred on a capture square.
use crate::bitboard::Bitboard;
use crate::bitboard::{
    BB_FILE_A, BB_FILE_AB, BB_FILE_GH, BB_FILE_H, BB_RANK_1, BB_RANK_12, BB_RANK_78, BB_RANK_8,
};
use crate::types::{Color, Direction, Square, TableIndex, COLORS, SQUARES};

struct LeaperTables {
    kings: [Bitboard; 64],
    knights: [Bitboard; 64],
    pawns: [[Bitboard; 2]; 64],
}

impl LeaperTables {
    pub fn new() -> LeaperTables {
        let mut tables = LeaperTables {
            kings: [Bitboard::none(); 64],
            knights: [Bitboard::none(); 64],
            pawns: [[Bitboard::none(); 2]; 64],
        };

        for &sq in SQUARES.iter() {
            tables.kings[sq.as_index()] = king_board(sq);
            tables.knights[sq.as_index()] = knight_board(sq);
            for &color in COLORS.iter() {
                tables.pawns[sq.as_index()][color.as_index()] = pawn_board(sq, color);
            }
        }

        tables
    }
}

fn king_board(sq: Square) -> Bitboard {
    let mut board = Bitboard::none();
    if !BB_RANK_8.test(sq) {
        board.set(sq.plus(8));
        if !BB_FILE_A.test(sq) {
            board.set(sq.plus(7));
        }
        if !BB_FILE_H.test(sq) {
            board.set(sq.plus(9));
        }
    }

    if !BB_RANK_1.test(sq) {
        board.set(sq.plus(-8));
        if !BB_FILE_A.test(sq) {
            board.set(sq.plus(-9));
        }
        if !BB_FILE_H.test(sq) {
            board.set(sq.plus(-7));
        }
    }

    if !BB_FILE_A.test(sq) {
        board.set(sq.plus(-1));
    }
    if !BB_FILE_H.test(sq) {
        board.set(sq.plus(1));
    }

    board
}

fn knight_board(sq: Square) -> Bitboard {
    let mut board = Bitboard::none();
    if !BB_FILE_A.test(sq) && !BB_RANK_78.test(sq) {
        board.set(sq.plus(15));
    }
    if !BB_FILE_H.test(sq) && !BB_RANK_78.test(sq) {
        board.set(sq.plus(17));
    }
    if !BB_FILE_GH.test(sq) && !BB_RANK_8.test(sq) {
        board.set(sq.plus(10));
    }
    if !BB_FILE_GH.test(sq) && !BB_RANK_1.test(sq) {
        board.set(sq.plus(-6));
    }
    if !BB_FILE_H.test(sq) && !BB_RANK_12.test(sq) {
        board.set(sq.plus(-15));
    }
    if !BB_FILE_A.test(sq) && !BB_RANK_12.test(sq) {
        board.set(sq.plus(-17));
    }
    if !BB_FILE_AB.test(sq) && !BB_RANK_1.test(sq) {
        board.set(sq.plus(-10));
    }
    if !BB_FILE_AB.test(sq) && !BB_RANK_8.test(sq) {
        board.set(sq.plus(6));
    }
    board
}

fn pawn_board(sq: Square, color: Color) -> Bitboard {
    let mut board = Bitboard::none();
    let (promo_rank, up_left, up_right) = match color {
        Color::White => (BB_RANK_8, 7, 9),
        Color::Black => (BB_RANK_1, -9, -7),
    };

    if promo_rank.test(sq) {
        // No attacks out of the promotion rank; a pawn can never sit there.
        return board;
    }

    if !BB_FILE_A.test(sq) {
        board.set(sq.plus(up_left));
    }
    if !BB_FILE_H.test(sq) {
        board.set(sq.plus(up_right));
    }

    board
}

struct RayTable {
    table: [[Bitboard; 8]; 65],
}

impl RayTable {
    pub fn new() -> RayTable {
        let mut rt = RayTable {
            table: [[Bitboard::none(); 8]; 65],
        };

        for &sq in SQUARES.iter() {
            let mut populate_dir = |dir: Direction, edge: Bitboard| {
                let mut entry = Bitboard::none();
                if edge.test(sq) {
                    // Nothing to do here, there are no legal moves on this ray from this square.
                    rt.table[sq.as_index()][dir.as_index()] = entry;
                    return;
                }

                // Starting at the given square, cast a ray in the given direction and add all bits to the ray mask.
                let mut cursor = sq;
                loop {
                    cursor = cursor.towards(dir);
                    entry.set(cursor);

                    // Did we reach the end of the board? If so, stop.
                    if edge.test(cursor) {
                        break;
                    }
                }
                rt.table[sq.as_index()][dir.as_index()] = entry;
            };

            populate_dir(Direction::North, BB_RANK_8);
            populate_dir(Direction::NorthEast, BB_RANK_8.or(BB_FILE_H));
            populate_dir(Direction::East, BB_FILE_H);
            populate_dir(Direction::SouthEast, BB_RANK_1.or(BB_FILE_H));
            populate_dir(Direction::South, BB_RANK_1);
            populate_dir(Direction::SouthWest, BB_RANK_1.or(BB_FILE_A));
            populate_dir(Direction::West, BB_FILE_A);
            populate_dir(Direction::NorthWest, BB_RANK_8.or(BB_FILE_A));
        }
        rt
    }

    pub fn attacks(&self, sq: usize, dir: Direction) -> Bitboard {
        self.table[sq][dir.as_index()]
    }
}

lazy_static! {
    static ref LEAPER_TABLES: LeaperTables = LeaperTables::new();
    static ref RAY_TABLE: RayTable = RayTable::new();
}

fn positive_ray_attacks(sq: Square, occupancy: Bitboard, dir: Direction) -> Bitboard {
    debug_assert!(dir.as_vector() > 0);
    let attacks = RAY_TABLE.attacks(sq.as_index(), dir);
    let blocker = attacks.and(occupancy).bits();
    let blocking_square = blocker.trailing_zeros() as usize;
    let blocking_ray = RAY_TABLE.attacks(blocking_square, dir);
    attacks.xor(blocking_ray)
}

fn negative_ray_attacks(sq: Square, occupancy: Bitboard, dir: Direction) -> Bitboard {
    debug_assert!(dir.as_vector() < 0);
    let attacks = RAY_TABLE.attacks(sq.as_index(), dir);
    let blocker = attacks.and(occupancy).bits();
    let blocking_square = (64 - blocker.leading_zeros()).checked_sub(1).unwrap_or(64) as usize;
    let blocking_ray = RAY_TABLE.attacks(blocking_square, dir);
    attacks.xor(blocking_ray)
}

fn diagonal_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    positive_ray_attacks(sq, occupancy, Direction::NorthWest)
        | negative_ray_attacks(sq, occupancy, Direction::SouthEast)
}

fn antidiagonal_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    positive_ray_attacks(sq, occupancy, Direction::NorthEast)
        | negative_ray_attacks(sq, occupancy, Direction::SouthWest)
}

fn file_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    positive_ray_attacks(sq, occupancy, Direction::North)
        | negative_ray_attacks(sq, occupancy, Direction::South)
}

fn rank_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    positive_ray_attacks(sq, occupancy, Direction::East)
        | negative_ray_attacks(sq, occupancy, Direction::West)
}

pub fn pawn_attacks(sq: Square, color: Color) -> Bitboard {
    LEAPER_TABLES.pawns[sq.as_index()][color.as_index()]
}

pub fn knight_attacks(sq: Square) -> Bitboard {
    LEAPER_TABLES.knights[sq.as_index()]
}

pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    diagonal_attacks(sq, occupancy) | antidiagonal_attacks(sq, occupancy)
}

pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    file_attacks(sq, occupancy) | rank_attacks(sq, occupancy)
}

pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupancy) | rook_attacks(sq, occupancy)
}

pub fn king_attacks(sq: Square) -> Bitboard {
    LEAPER_TABLES.kings[sq.as_index()]
}

/// The squares swept by an explosion centred on the given square. The
/// centre square itself is not part of the radius; callers handle the
/// captured piece separately.
pub fn blast_radius(sq: Square) -> Bitboard {
    king_attacks(sq)
}
