// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Hands out table aliases for one statement: `a`, `b`, ..., `z`, `aa`, `ab`, ...
///
/// A prefixer is created per statement and threaded through the recursive flattening of joins, so
/// the aliases depend only on the shape of the descriptor graph.
#[derive(Debug, Default)]
pub struct Prefixer {
    next: usize,
}

impl Prefixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_alias(&mut self) -> String {
        let alias = Self::alias(self.next);
        self.next += 1;
        alias
    }

    fn alias(index: usize) -> String {
        // Bijective base-26, so that `z` is followed by `aa` rather than `ba`
        let mut remaining = index + 1;
        let mut letters = Vec::new();
        while remaining > 0 {
            remaining -= 1;
            letters.push((b'a' + (remaining % 26) as u8) as char);
            remaining /= 26;
        }
        letters.iter().rev().collect()
    }
}
