//! Progress counter for scanned graphs

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex, PoisonError};

use crate::pipeline::ProgressFn;

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " graphs"
    )))
}

/// Add `n` to the counter. Waits for the lock so no update is lost.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    let mut pb = pb.lock().unwrap_or_else(PoisonError::into_inner);
    let _ = pb.update(n);
}

/// Force a final refresh so the counter shows the end count.
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
    }
    eprintln!();
}

/// Pipeline callback that feeds `bar`.
pub fn progress_callback(bar: &ProgressBar) -> ProgressFn {
    let bar = Arc::clone(bar);
    Arc::new(move |n: usize| update_progress_bar(&bar, n))
}
