// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Chess960 coverage: Scharnagl setup, the 960 FEN castling notations,
//! and king-takes-rook UCI handling. These tests live in their own
//! binary because they flip the process-wide `chess960` flag; every test
//! here switches it on, and no orthodox-mode test shares the process.
use fulminate::{opts, Move, Position, Square};

#[test]
fn index_518_is_the_orthodox_array() {
    opts::set_chess960(true);

    let pos = Position::from_frc_index(518).unwrap();
    assert_eq!(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w HAha - 0 1",
        pos.to_fen()
    );
}

#[test]
fn index_0_is_bbqnnrkr() {
    opts::set_chess960(true);

    let pos = Position::from_frc_index(0).unwrap();
    assert_eq!(
        "bbqnnrkr/pppppppp/8/8/8/8/PPPPPPPP/BBQNNRKR w HFhf - 0 1",
        pos.to_fen()
    );
}

#[test]
fn frc_setup_is_deterministic() {
    opts::set_chess960(true);

    for &n in [0u32, 1, 17, 356, 518, 959].iter() {
        let one = Position::from_frc_index(n).unwrap();
        let two = Position::from_frc_index(n).unwrap();
        assert_eq!(one.to_fen(), two.to_fen());
        assert_eq!(one.key(), two.key());
    }
}

#[test]
fn dfrc_splits_the_index() {
    opts::set_chess960(true);

    // black takes the high digits, white the low ones
    let pos = Position::from_dfrc_index(518 * 960).unwrap();
    assert_eq!(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/BBQNNRKR w HFha - 0 1",
        pos.to_fen()
    );

    let same_both = Position::from_dfrc_index(518 * 960 + 518).unwrap();
    assert_eq!(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w HAha - 0 1",
        same_both.to_fen()
    );
}

#[test]
fn out_of_range_indices_are_rejected() {
    opts::set_chess960(true);

    assert!(Position::from_frc_index(960).is_none());
    assert!(Position::from_dfrc_index(960 * 960).is_none());
    assert!(Position::from_frc_index(959).is_some());
}

#[test]
fn shorthand_castling_flags_find_the_outermost_rooks() {
    opts::set_chess960(true);

    // KQkq in 960 mode means "the outermost rook on that side"
    let pos =
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
    assert_eq!(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w HAha - 0 1",
        pos.to_fen()
    );
}

#[test]
fn file_letter_castling_flags_round_trip() {
    opts::set_chess960(true);

    let fen = "bbqnnrkr/pppppppp/8/8/8/8/PPPPPPPP/BBQNNRKR w HFhf - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    assert_eq!(fen, pos.to_fen());

    let rooks = pos.castling_rooks();
    assert_eq!(Some(Square::H1), rooks.white().kingside);
    assert_eq!(Some(Square::F1), rooks.white().queenside);
    assert_eq!(Some(Square::H8), rooks.black().kingside);
    assert_eq!(Some(Square::F8), rooks.black().queenside);
}

#[test]
fn castling_flag_on_the_king_file_is_rejected() {
    opts::set_chess960(true);

    // the white king sits on e1; E cannot name a castling rook
    assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Ea - 0 1").is_err());
}

#[test]
fn uci_castling_is_king_takes_rook() {
    opts::set_chess960(true);

    let pos = Position::from_fen("bbqnnrkr/pppppppp/8/8/8/8/PPPPPPPP/BBQNNRKR w HFhf - 0 1")
        .unwrap();

    assert_eq!(
        Some(Move::castling(Square::G1, Square::H1)),
        pos.move_from_uci("g1h1")
    );
    assert_eq!(
        "g1h1",
        pos.move_to_uci(Move::castling(Square::G1, Square::H1))
    );

    // a king step that does not land on one of its own rooks stays a
    // normal move
    assert_eq!(
        Some(Move::standard(Square::G1, Square::F1)),
        Position::from_fen("bbqnn1kr/pppppppp/8/8/8/8/PPPPPPPP/BBQNN1KR w Hh - 0 1")
            .unwrap()
            .move_from_uci("g1f1")
    );
}

#[test]
fn scharnagl_bishops_land_on_opposite_colors() {
    opts::set_chess960(true);

    let shade = |sq: Square| (sq as usize >> 3) + (sq as usize & 7);

    for &n in [0u32, 95, 222, 477, 518, 700, 959].iter() {
        let pos = Position::from_frc_index(n).unwrap();
        let bishops = pos.bbs().bishops(fulminate::Color::White);
        assert_eq!(2, bishops.count());

        let squares: Vec<Square> = bishops.iter().collect();
        assert_ne!(shade(squares[0]) % 2, shade(squares[1]) % 2, "index {}", n);
    }
}
