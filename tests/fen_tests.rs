// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tests of FEN parsing and generation in orthodox mode. Chess960
//! castling notation is covered by `frc_tests`, which runs in its own
//! process because it flips the global variant flag.
use fulminate::{Color, FenParseError, Piece, PieceKind, Position, Square};

#[test]
fn starting_position_round_trip() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    assert_eq!(fen, pos.to_fen());
}

#[test]
fn round_trips_are_exact() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 4 10",
        "4k3/8/8/pP6/8/8/8/4K3 w - a6 0 1",
        "8/2k5/8/8/8/8/5K2/8 w - - 99 50",
        "rnbq1bnr/ppppkppp/8/4p3/8/5N2/PPPPPPPP/RNBQKB1R w - - 2 3",
    ];

    for fen in fens.iter() {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(*fen, pos.to_fen(), "round trip failed for {}", fen);
    }
}

#[test]
fn piece_placement() {
    let pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .unwrap();

    assert_eq!(
        Some(Piece::new(PieceKind::Rook, Color::White)),
        pos.piece_at(Square::A1)
    );
    assert_eq!(
        Some(Piece::new(PieceKind::King, Color::White)),
        pos.piece_at(Square::E1)
    );
    assert_eq!(
        Some(Piece::new(PieceKind::Queen, Color::Black)),
        pos.piece_at(Square::D8)
    );
    assert_eq!(
        Some(Piece::new(PieceKind::Pawn, Color::Black)),
        pos.piece_at(Square::F7)
    );
    assert_eq!(None, pos.piece_at(Square::E4));
}

#[test]
fn parsed_state_fields() {
    let pos =
        Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 7 21")
            .unwrap();

    assert_eq!(Color::Black, pos.to_move());
    assert_eq!(Some(Square::E3), pos.en_passant_square());
    assert_eq!(7, pos.halfmove_clock());
    assert_eq!(21, pos.fullmove_number());
}

#[test]
fn missing_fields() {
    assert_eq!(
        FenParseError::MissingRanks,
        Position::from_fen("").unwrap_err()
    );
    assert_eq!(
        FenParseError::MissingSideToMove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3").unwrap_err()
    );
    assert_eq!(
        FenParseError::MissingCastling,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w").unwrap_err()
    );
    assert_eq!(
        FenParseError::MissingEnPassant,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w -").unwrap_err()
    );
    assert_eq!(
        FenParseError::MissingHalfmove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - -").unwrap_err()
    );
    assert_eq!(
        FenParseError::MissingFullmove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0").unwrap_err()
    );
    assert_eq!(
        FenParseError::ExcessFields,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1 junk").unwrap_err()
    );
}

#[test]
fn unknown_piece() {
    assert_eq!(
        FenParseError::UnknownPiece('z'),
        Position::from_fen("z3k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err()
    );
}

#[test]
fn bad_rank_widths() {
    assert_eq!(
        FenParseError::TooManyFiles(0),
        Position::from_fen("ppppppppp/8/8/8/4k3/8/8/4K3 w - - 0 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::NotEnoughFiles(1),
        Position::from_fen("4k3/ppp/8/8/8/8/8/4K3 w - - 0 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::TooManyRanks,
        Position::from_fen("4k3/8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err()
    );
}

#[test]
fn king_count_is_validated() {
    // no kings at all
    assert_eq!(
        FenParseError::WrongKingCount(Color::White),
        Position::from_fen("4k3/8/8/8/8/8/8/8 w - - 0 1").unwrap_err()
    );
    // two black kings
    assert_eq!(
        FenParseError::WrongKingCount(Color::Black),
        Position::from_fen("3kk3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err()
    );
}

#[test]
fn invalid_scalar_fields() {
    assert_eq!(
        FenParseError::InvalidSideToMove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 x - - 0 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::InvalidCastle,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w x - 0 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::InvalidEnPassant,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - e9 0 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::InvalidHalfmove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - q 1").unwrap_err()
    );
    assert_eq!(
        FenParseError::InvalidFullmove,
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 q").unwrap_err()
    );
}

#[test]
fn failed_parse_leaves_position_unchanged() {
    let mut pos = Position::starting();
    let before = pos.to_fen();

    assert!(pos.reset_from_fen("4k3/8/8/8/8/8/8/8 w - - 0 1").is_err());
    assert_eq!(before, pos.to_fen());
}

#[test]
fn castling_rights_subset() {
    let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
    let rooks = pos.castling_rooks();

    assert_eq!(Some(Square::H1), rooks.white().kingside);
    assert_eq!(None, rooks.white().queenside);
    assert_eq!(None, rooks.black().kingside);
    assert_eq!(Some(Square::A8), rooks.black().queenside);
    assert_eq!("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1", pos.to_fen());
}

#[test]
fn reparse_preserves_key() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 4 10",
        "4k3/8/8/pP6/8/8/8/4K3 w - a6 0 1",
    ];

    for fen in fens.iter() {
        let pos = Position::from_fen(fen).unwrap();
        let reparsed = Position::from_fen(pos.to_fen()).unwrap();
        assert_eq!(pos.key(), reparsed.key(), "key drift for {}", fen);
    }
}
