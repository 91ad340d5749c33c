#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use batchseal_engine::ProgressFn;

pub const MIB: usize = 1024 * 1024;

pub fn init_tracing() {
    batchseal_core::logging::init_for_tests();
}

/// Deterministic, non-repeating-per-chunk test content.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i.wrapping_mul(31) ^ (i >> 7)) as u8 ^ seed)
        .collect()
}

/// Progress callback that records every reported value.
pub fn progress_recorder() -> (ProgressFn, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
    (callback, seen)
}

/// Create a sparse file of `len` bytes without writing its content.
pub fn sparse_file(dir: &Path, name: &str, len: u64) -> PathBuf {
    let path = dir.join(name);
    let f = std::fs::File::create(&path).expect("create sparse file");
    f.set_len(len).expect("set sparse length");
    path
}
