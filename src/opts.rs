// Copyright 2017-2019 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Process-wide engine options. The options container is read-mostly:
//! option handling mutates it before or between searches, never while a
//! search worker is running, so readers take a snapshot copy and pay a
//! single lock acquisition.
use parking_lot::RwLock;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalOpts {
    /// When set, FEN castling fields use A-H file letters, and UCI
    /// castling moves are expected in king-takes-rook form.
    pub chess960: bool,
}

lazy_static! {
    static ref OPTS: RwLock<GlobalOpts> = RwLock::new(GlobalOpts::default());
}

/// Snapshot of the current global options.
pub fn opts() -> GlobalOpts {
    *OPTS.read()
}

/// Enables or disables Chess960 handling. Must not race with a running
/// search; callers sequence this through their option handling.
pub fn set_chess960(enabled: bool) {
    OPTS.write().chess960 = enabled;
}
