// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#![allow(dead_code)]

#[macro_use]
extern crate num_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod attacks;
mod bitboard;
mod boards;
mod cuckoo;
mod movegen;
mod moves;
pub mod nnue;
pub mod opts;
mod perft;
mod position;
mod rays;
pub mod see;
mod types;
mod zobrist;

pub use bitboard::{Bitboard, BitboardIterator, BitboardSet};
pub use boards::PositionBoards;
pub use movegen::{generate_captures, generate_moves, MoveVec};
pub use moves::{Move, MoveType};
pub use nnue::{NnueState, NnueUpdates};
pub use perft::{perft, perft_divide};
pub use position::{BoardState, CastlingRooks, FenParseError, Position, RookPair};
pub use rays::{ray_between, ray_through};
pub use types::{Color, Direction, File, Piece, PieceKind, Rank, Score, Square};
