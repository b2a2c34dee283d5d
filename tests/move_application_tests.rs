// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tests of move application: the explosion cascade, en passant,
//! castling, promotion, clock and castling-rights maintenance, and
//! apply/undo symmetry.
use fulminate::{Color, Move, NnueState, PieceKind, Position, Square};

#[test]
fn opening_pawn_push() {
    let mut pos = Position::starting();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::E2, Square::E3), None);

    assert_eq!(Color::Black, pos.to_move());
    assert_eq!(1, pos.fullmove_number());
    assert_eq!(0, pos.halfmove_clock());
    assert_eq!(
        Some(fulminate::Piece::new(PieceKind::Pawn, Color::White)),
        pos.piece_at(Square::E3)
    );
    assert_eq!(None, pos.piece_at(Square::E2));
}

#[test]
fn capture_removes_both_pawns() {
    // pawn takes pawn with nothing else in the blast: both disappear and
    // nothing lands on the destination square
    let mut pos =
        Position::from_fen("rnbqkbnr/pppppppp/8/8/4p3/5P2/PPPP1PPP/RNBQKBNR w - - 0 1")
            .unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::F3, Square::E4), None);

    assert_eq!(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPP1PPP/RNBQKBNR b - - 0 1",
        pos.to_fen()
    );
}

#[test]
fn blast_spares_pawns_and_takes_pieces() {
    // exd5 removes the captured knight, the adjacent knight on e5, and
    // the capturing pawn; the black pawn on d4 survives the blast
    let mut pos = Position::from_fen("4k3/8/8/3nn3/3pP3/8/8/4K3 w - - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::E4, Square::D5), None);

    assert_eq!("4k3/8/8/8/3p4/8/8/4K3 b - - 0 1", pos.to_fen());
}

#[test]
fn en_passant_explosion() {
    // the captured pawn sits behind the target square; both pawns vanish
    let mut pos = Position::from_fen("4k3/8/8/pP6/8/8/8/4K3 w - a6 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::en_passant(Square::B5, Square::A6), None);

    assert_eq!("4k3/8/8/8/8/8/8/4K3 b - - 0 1", pos.to_fen());
}

#[test]
fn quiet_promotion() {
    let mut pos = Position::from_fen("k7/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(
        Move::promotion(Square::E7, Square::E8, PieceKind::Queen),
        None,
    );

    assert_eq!("k3Q3/8/8/8/8/8/8/K7 b - - 0 1", pos.to_fen());
}

#[test]
fn capturing_promotion_never_materializes() {
    // the promoted piece is consumed by its own explosion
    let mut pos = Position::from_fen("k3r3/3P4/8/8/8/8/8/K7 w - - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(
        Move::promotion(Square::D7, Square::E8, PieceKind::Queen),
        None,
    );

    assert_eq!("k7/8/8/8/8/8/8/K7 b - - 0 1", pos.to_fen());
}

#[test]
fn kingside_castle() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::castling(Square::E1, Square::H1), None);

    assert_eq!("4k3/8/8/8/8/8/8/R4RK1 b - - 1 1", pos.to_fen());
    assert_eq!(Square::G1, pos.king(Color::White));
}

#[test]
fn queenside_castle() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::castling(Square::E1, Square::A1), None);

    assert_eq!("4k3/8/8/8/8/8/8/2KR3R b - - 1 1", pos.to_fen());
    assert_eq!(Square::C1, pos.king(Color::White));
}

#[test]
fn double_push_sets_en_passant() {
    let mut pos = Position::starting();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::E2, Square::E4), None);

    assert_eq!(Some(Square::E3), pos.en_passant_square());

    // any reply clears it
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::G8, Square::F6), None);
    assert_eq!(None, pos.en_passant_square());
}

#[test]
fn halfmove_clock_bookkeeping() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/4B3/4K3 w - - 5 2").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::E2, Square::G4), None);
    assert_eq!(6, pos.halfmove_clock());

    // a capture resets it
    let mut pos = Position::from_fen("4k3/8/8/8/6n1/8/8/3BK3 w - - 5 2").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::D1, Square::G4), None);
    assert_eq!(0, pos.halfmove_clock());
}

#[test]
fn blast_sweeps_rook_off_home_square() {
    // the knight detonates the g1 pawn; the blast takes the h1 rook and
    // with it the kingside castling right
    let mut pos = Position::from_fen("4k3/8/8/8/8/5n2/8/4K1PR b K - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::F3, Square::G1), None);

    assert_eq!("4k3/8/8/8/8/8/8/4K3 w - - 0 2", pos.to_fen());
}

#[test]
fn rook_trade_clears_rights_on_both_sides() {
    // h8 rook takes h1 rook: the blast consumes both, and both kingside
    // rights with them
    let mut pos = Position::from_fen("4k2r/8/8/8/8/8/8/4K2R b Kk - 0 1").unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::H8, Square::H1), None);

    assert_eq!("4k3/8/8/8/8/8/8/4K3 w - - 0 2", pos.to_fen());
}

#[test]
fn exploding_the_king_ends_the_game() {
    let mut pos = Position::from_fen("rk6/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
    assert!(!pos.is_variant_over());

    pos.apply_move_unchecked::<false, true>(Move::standard(Square::A1, Square::A8), None);
    assert!(pos.is_variant_over());
}

#[test]
fn apply_and_pop_restore_everything() {
    let cases = [
        (
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Move::standard(Square::E2, Square::E4),
        ),
        (
            "rnbqkbnr/pppppppp/8/8/4p3/5P2/PPPP1PPP/RNBQKBNR w - - 0 1",
            Move::standard(Square::F3, Square::E4),
        ),
        (
            "4k3/8/8/pP6/8/8/8/4K3 w - a6 0 1",
            Move::en_passant(Square::B5, Square::A6),
        ),
        (
            "4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1",
            Move::castling(Square::E1, Square::H1),
        ),
        (
            "k3r3/3P4/8/8/8/8/8/K7 w - - 0 1",
            Move::promotion(Square::D7, Square::E8, PieceKind::Queen),
        ),
    ];

    for (fen, mov) in cases.iter() {
        let mut pos = Position::from_fen(fen).unwrap();
        let fen_before = pos.to_fen();
        let key_before = pos.key();

        pos.apply_move_unchecked::<false, true>(*mov, None);
        pos.pop_move::<false>(None);

        assert_eq!(fen_before, pos.to_fen(), "undo failed for {}", fen);
        assert_eq!(key_before, pos.key(), "key not restored for {}", fen);
    }
}

#[test]
fn several_plies_of_apply_and_pop() {
    let mut pos = Position::starting();
    let initial_fen = pos.to_fen();
    let initial_key = pos.key();

    let line = [
        Move::standard(Square::E2, Square::E4),
        Move::standard(Square::D7, Square::D5),
        Move::standard(Square::E4, Square::D5),
        Move::standard(Square::B8, Square::C6),
    ];

    for mov in line.iter() {
        pos.apply_move_unchecked::<false, true>(*mov, None);
    }
    for _ in line.iter() {
        pos.pop_move::<false>(None);
    }

    assert_eq!(initial_fen, pos.to_fen());
    assert_eq!(initial_key, pos.key());
    assert_eq!(1, pos.fullmove_number());
}

#[test]
fn in_place_application_skips_history() {
    let mut pos = Position::starting();
    pos.apply_move_unchecked::<false, false>(Move::standard(Square::G1, Square::F3), None);

    assert_eq!(Color::Black, pos.to_move());
    assert_eq!(
        Some(fulminate::Piece::new(PieceKind::Knight, Color::White)),
        pos.piece_at(Square::F3)
    );
}

#[test]
fn key_matches_fresh_parse_after_explosions() {
    let mut pos =
        Position::from_fen("rnbqkbnr/pppppppp/8/8/4p3/5P2/PPPP1PPP/RNBQKBNR w - - 0 1")
            .unwrap();
    pos.apply_move_unchecked::<false, true>(Move::standard(Square::F3, Square::E4), None);

    let reparsed = Position::from_fen(pos.to_fen()).unwrap();
    assert_eq!(reparsed.key(), pos.key());
}

#[test]
fn nnue_updates_track_the_board() {
    let mut pos = Position::from_fen("4k3/8/8/3nn3/3pP3/8/8/4K3 w - - 0 1").unwrap();
    let mut nnue = NnueState::new();
    nnue.reset(pos.bbs());

    assert_eq!(
        NnueState::evaluate_once(pos.bbs(), pos.to_move()),
        nnue.evaluate(pos.to_move())
    );

    // an explosion emits a batch of subtractions and no additions
    pos.apply_move_unchecked::<true, true>(
        Move::standard(Square::E4, Square::D5),
        Some(&mut nnue),
    );
    assert_eq!(
        NnueState::evaluate_once(pos.bbs(), pos.to_move()),
        nnue.evaluate(pos.to_move())
    );

    pos.pop_move::<true>(Some(&mut nnue));
    assert_eq!(
        NnueState::evaluate_once(pos.bbs(), pos.to_move()),
        nnue.evaluate(pos.to_move())
    );
}

#[test]
fn nnue_follows_a_full_line() {
    let mut pos = Position::starting();
    let mut nnue = NnueState::new();
    nnue.reset(pos.bbs());

    let line = [
        Move::standard(Square::E2, Square::E4),
        Move::standard(Square::D7, Square::D5),
        Move::standard(Square::E4, Square::D5),
        Move::standard(Square::D8, Square::D5),
    ];

    for mov in line.iter() {
        pos.apply_move_unchecked::<true, true>(*mov, Some(&mut nnue));
        assert_eq!(
            NnueState::evaluate_once(pos.bbs(), pos.to_move()),
            nnue.evaluate(pos.to_move())
        );
    }
}
