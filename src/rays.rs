// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Square-pair ray tables. `ray_between` yields the squares strictly
//! between two aligned squares (empty when they do not share a rank,
//! file, or diagonal); `ray_through` yields the complete line running
//! through both. Legality testing leans on these for pins, castling
//! paths, and slider re-attack checks after an explosion, and the cycle
//! detector uses `ray_between` to validate a cuckoo table hit.
use crate::bitboard::Bitboard;
use crate::types::{Direction, Square, TableIndex, SQUARES};

static DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::NorthEast,
    Direction::East,
    Direction::SouthEast,
    Direction::South,
    Direction::SouthWest,
    Direction::West,
    Direction::NorthWest,
];

struct RayPairTables {
    between: [[Bitboard; 64]; 64],
    through: [[Bitboard; 64]; 64],
}

impl RayPairTables {
    pub fn new() -> RayPairTables {
        let mut tables = RayPairTables {
            between: [[Bitboard::none(); 64]; 64],
            through: [[Bitboard::none(); 64]; 64],
        };

        for &src in SQUARES.iter() {
            for &dir in DIRECTIONS.iter() {
                let mut walked = Bitboard::none();
                let mut cursor = src;
                while let Some(next) = step(cursor, dir) {
                    // everything walked so far sits strictly between src and next
                    tables.between[src.as_index()][next.as_index()] = walked;
                    walked.set(next);
                    cursor = next;
                }

                // the full line through src in this direction, including both
                // endpoints, is shared by every square on it
                if !walked.empty() {
                    let mut line = walked;
                    line.set(src);
                    let mut backwards = src;
                    while let Some(prev) = step(backwards, opposite(dir)) {
                        line.set(prev);
                        backwards = prev;
                    }

                    for dst in walked {
                        tables.through[src.as_index()][dst.as_index()] = line;
                    }
                }
            }
        }

        tables
    }
}

fn opposite(dir: Direction) -> Direction {
    match dir {
        Direction::North => Direction::South,
        Direction::NorthEast => Direction::SouthWest,
        Direction::East => Direction::West,
        Direction::SouthEast => Direction::NorthWest,
        Direction::South => Direction::North,
        Direction::SouthWest => Direction::NorthEast,
        Direction::West => Direction::East,
        Direction::NorthWest => Direction::SouthEast,
    }
}

// One step in the given direction, or None if it would leave the board.
fn step(sq: Square, dir: Direction) -> Option<Square> {
    let file = sq.file().as_index() as i32;
    let rank = sq.rank().as_index() as i32;
    let (df, dr) = match dir {
        Direction::North => (0, 1),
        Direction::NorthEast => (1, 1),
        Direction::East => (1, 0),
        Direction::SouthEast => (1, -1),
        Direction::South => (0, -1),
        Direction::SouthWest => (-1, -1),
        Direction::West => (-1, 0),
        Direction::NorthWest => (-1, 1),
    };

    let file = file + df;
    let rank = rank + dr;
    if !(0..8).contains(&file) || !(0..8).contains(&rank) {
        return None;
    }

    Some(Square::from_index((rank * 8 + file) as usize))
}

lazy_static! {
    static ref RAY_PAIRS: RayPairTables = RayPairTables::new();
}

/// The squares strictly between the two given squares, or the empty set
/// if they are not aligned along a rank, file, or diagonal.
pub fn ray_between(a: Square, b: Square) -> Bitboard {
    RAY_PAIRS.between[a.as_index()][b.as_index()]
}

/// The complete line through the two given squares (both included), or
/// the empty set if they are not aligned.
pub fn ray_through(a: Square, b: Square) -> Bitboard {
    RAY_PAIRS.through[a.as_index()][b.as_index()]
}
