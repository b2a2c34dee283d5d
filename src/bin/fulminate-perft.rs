// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#[macro_use]
extern crate clap;
#[macro_use]
extern crate serde_derive;
extern crate fulminate;
extern crate serde;
extern crate serde_json;

use std::fs::File;
use std::process;
use std::time::Instant;

use clap::{App, Arg};
use fulminate::{perft, Position};

#[derive(Serialize)]
struct DivideEntry {
    mov: String,
    nodes: u64,
}

#[derive(Serialize)]
struct DivideReport {
    fen: String,
    depth: u32,
    total: u64,
    moves: Vec<DivideEntry>,
}

fn main() {
    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(crate_version!())
        .author(crate_authors!())
        .about("PERFT calculator for Atomic chess positions")
        .arg(
            Arg::with_name("FEN")
                .help("FEN representation of the position to calculate")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("depth")
                .help("Depth of move tree to search")
                .value_name("DEPTH")
                .short("-d")
                .long("--depth")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("chess960")
                .help("Interpret castling in Chess960 terms")
                .long("--chess960"),
        )
        .arg(
            Arg::with_name("divide")
                .help("Saves the per-root-move node breakdown as JSON (for move generator debugging)")
                .short("-s")
                .value_name("FILE")
                .long("--save-divide")
                .takes_value(true),
        )
        .get_matches();

    if matches.is_present("chess960") {
        fulminate::opts::set_chess960(true);
    }

    let fen = matches.value_of("FEN").unwrap();
    let depth = value_t_or_exit!(matches, "depth", u32);
    println!("fen:   {}", fen);
    println!("depth: {}", depth);
    if depth > 6 {
        println!("warning, this is probably going to take a while...");
    }

    let pos = match Position::from_fen(fen) {
        Ok(pos) => pos,
        Err(err) => {
            println!("invalid FEN: {}", err);
            process::exit(1);
        }
    };

    if let Some(divide_file) = matches.value_of("divide") {
        let moves = fulminate::perft_divide(&pos, depth);
        let total: u64 = moves.iter().map(|(_, nodes)| *nodes).sum();
        for (mov, nodes) in &moves {
            println!("{}: {}", mov, nodes);
        }
        println!("perft({}) = {}", depth, total);

        let report = DivideReport {
            fen: fen.to_string(),
            depth,
            total,
            moves: moves
                .into_iter()
                .map(|(mov, nodes)| DivideEntry { mov, nodes })
                .collect(),
        };
        let mut file = File::create(divide_file).unwrap();
        serde_json::to_writer_pretty(&mut file, &report).unwrap();
        process::exit(0);
    }

    for i in 1..depth + 1 {
        let start = Instant::now();
        let results = perft(&pos, i);
        let duration = start.elapsed();
        println!("perft({}) = {} ({} ms)", i, results, duration.as_millis());
    }
}
