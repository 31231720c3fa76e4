// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable byte counts for transfer progress.

const SUFFIXES: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with base-1024 scaling and two decimals.
///
/// The unit is picked from the binary exponent of the magnitude, so
/// `1024` is `1.00KB` and `1023` stays `1023.00B`. Zero is `0B`.
pub fn human_bytes(bytes: i64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let place = (bytes.unsigned_abs().ilog2() / 10) as usize;
    let place = place.min(SUFFIXES.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(place as i32);
    format!("{:.2}{}", scaled, SUFFIXES[place])
}

#[cfg(test)]
#[path = "bytes_tests.rs"]
mod tests;
