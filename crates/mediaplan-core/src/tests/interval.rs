use std::collections::BTreeSet;

use crate::interval::{FileRange, IntervalSet};

fn ranges(set: &IntervalSet) -> Vec<(i32, i32)> {
    set.iter().map(|r| (r.first, r.last)).collect()
}

fn assert_canonical(set: &IntervalSet) {
    let all: Vec<FileRange> = set.iter().collect();
    for pair in all.windows(2) {
        assert!(
            i64::from(pair[1].first) > i64::from(pair[0].last) + 1,
            "ranges {} and {} touch",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn ascending_inserts_collapse_into_one_range() {
    let set: IntervalSet = (1..=50).collect();
    assert_eq!(ranges(&set), vec![(1, 50)]);
    assert_eq!(set.file_count(), 50);
}

#[test]
fn descending_inserts_extend_lower_bound() {
    let set: IntervalSet = (10..=20).rev().collect();
    assert_eq!(ranges(&set), vec![(10, 20)]);
}

#[test]
fn gap_filler_joins_both_neighbours() {
    let mut set = IntervalSet::new();
    set.insert_range(1, 4);
    set.insert_range(6, 9);
    assert_eq!(ranges(&set), vec![(1, 4), (6, 9)]);
    set.insert(5);
    assert_eq!(ranges(&set), vec![(1, 9)]);
}

#[test]
fn overlapping_range_swallows_existing_ranges() {
    let mut set = IntervalSet::new();
    set.insert(3);
    set.insert(7);
    set.insert(12);
    set.insert_range(2, 10);
    assert_eq!(ranges(&set), vec![(2, 10), (12, 12)]);
}

#[test]
fn zero_index_is_ignored() {
    let mut set = IntervalSet::new();
    set.insert(0);
    assert!(set.is_empty());
}

#[test]
fn scrambled_inserts_flatten_to_inserted_values() {
    // Deterministic scramble of 1..=400 with a few holes.
    let mut inserted = BTreeSet::new();
    let mut set = IntervalSet::new();
    let mut x: u32 = 7;
    for _ in 0..600 {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let findex = (x >> 16) as i32 % 400 + 1;
        if findex % 37 == 0 {
            continue;
        }
        set.insert(findex);
        inserted.insert(findex);
    }

    assert_canonical(&set);
    let flattened: BTreeSet<i32> = set.iter().flat_map(|r| r.first..=r.last).collect();
    assert_eq!(flattened, inserted);
    assert!(!set.contains(37));
}

#[test]
fn insert_all_covers_every_index() {
    let mut set = IntervalSet::new();
    set.insert(5);
    set.insert_all();
    assert_eq!(ranges(&set), vec![(1, i32::MAX)]);
    assert_eq!(set.intersect(90, 120), vec![FileRange::new(90, 120)]);
}

#[test]
fn contiguous_blocks_intersect_as_one() {
    let mut set = IntervalSet::new();
    set.insert_range(1, 10);
    set.insert(11);
    set.insert_range(12, 20);
    assert_eq!(set.intersect(1, 20), vec![FileRange::new(1, 20)]);
}

#[test]
fn intersect_clips_to_window() {
    let mut set = IntervalSet::new();
    set.insert_range(5, 30);
    set.insert_range(40, 60);
    let hits = set.intersect(20, 45);
    assert_eq!(hits, vec![FileRange::new(20, 30), FileRange::new(40, 45)]);
    for hit in hits {
        assert!(hit.first >= 20 && hit.last <= 45);
    }
}

#[test]
fn intersect_outside_is_empty() {
    let set: IntervalSet = (100..=150).collect();
    assert!(set.intersect(1, 99).is_empty());
    assert!(set.intersect(151, 200).is_empty());
    assert!(!set.any_overlap(151, 200));
    assert!(set.any_overlap(150, 200));
}

#[test]
fn file_range_display() {
    assert_eq!(FileRange::new(7, 7).to_string(), "7");
    assert_eq!(FileRange::new(9, 3).to_string(), "3-9");
}

#[test]
fn inverted_window_overlaps_nothing() {
    let mut set = IntervalSet::new();
    set.insert_all();
    assert!(set.intersect(10, 1).is_empty());
    assert!(!set.any_overlap(10, 1));
    assert_eq!(FileRange { first: 10, last: 1 }.len(), 0);
}
