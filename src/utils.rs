//! Some utility functions

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::attendance::{format_duration, AttendanceRecord};
use crate::cache::ReservationCache;
use crate::task::Task;

/// Compare keys of two hashmaps for equality
pub fn keys_are_the_same<T, U, V>(left: &HashMap<T, U>, right: &HashMap<T, V>) -> bool
where
    T: Hash + Eq + Clone + std::fmt::Display,
{
    if left.len() != right.len() {
        log::debug!("Count of keys mismatch: {} and {}", left.len(), right.len());
        return false;
    }

    let keys_l: HashSet<T> = left.keys().cloned().collect();
    let keys_r: HashSet<T> = right.keys().cloned().collect();
    let result = keys_l == keys_r;
    if result == false {
        log::debug!("Keys of a map mismatch");
        for key in keys_l.difference(&keys_r) {
            log::debug!("   only left: {}", key);
        }
        for key in keys_r.difference(&keys_l) {
            log::debug!("  only right: {}", key);
        }
    }
    result
}


/// A debug utility that pretty-prints the content of a cache
pub fn print_cache(cache: &ReservationCache) {
    for entry in cache.entries() {
        let reservation = entry.reservation();
        let id = entry.id().map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!("    {} {} → {}  {}\t{}",
            entry.status(),
            reservation.start.format("%Y-%m-%d %H:%M"),
            reservation.end.format("%H:%M"),
            reservation.display_title(),
            id,
        );
    }
}

pub fn print_task(task: &Task) {
    let completion = if task.completed() { "✓" } else { " " };
    println!("    {} {}\t{}", completion, task.title(), task.id());
}

pub fn print_attendance(record: &AttendanceRecord) {
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| t.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "--:--".to_string());
    let worked = record.duration().map(format_duration).unwrap_or_default();
    println!("    {}  {} → {}  {}\t{}", record.date, time(record.start_time), time(record.end_time), worked, record.comment);
}
