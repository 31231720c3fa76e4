// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_both_clocks() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let w1 = clock.wall();
    clock.advance(Duration::from_millis(1500));
    assert_eq!(clock.now().duration_since(t1), Duration::from_millis(1500));
    assert_eq!((clock.wall() - w1).num_milliseconds(), 1500);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::from_secs(30));
    assert!(clock1.now().duration_since(t1) >= Duration::from_secs(30));
}

#[test]
fn fake_clock_wall_time_is_fixed_until_advanced() {
    let clock = FakeClock::default();
    assert_eq!(clock.wall(), clock.wall());
}
