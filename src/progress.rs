//! Process-wide progress reporting, gated by a single global flag exposed
//! through an explicit getter/setter instead of baking the check into every
//! call site.

use std::sync::atomic::{AtomicBool, Ordering};

static PROGRESS: AtomicBool = AtomicBool::new(true);

/// Enable or disable progress bars process-wide. Read lock-free by every
/// driver; individual calls may still override via the `progress` option.
pub fn set_progress(enabled: bool) {
    PROGRESS.store(enabled, Ordering::Relaxed);
}

pub fn progress_enabled() -> bool {
    PROGRESS.load(Ordering::Relaxed)
}

pub fn progress_bar(n: u64, name: &str) -> Option<indicatif::ProgressBar> {
    if !progress_enabled() {
        return None;
    }
    let style = "{spinner:.cyan} {elapsed} ~ {percent:>3}% {wide_bar:.cyan} {msg}";
    let style = indicatif::ProgressStyle::with_template(style).unwrap();
    let bar = indicatif::ProgressBar::new(n);
    bar.set_style(style);
    bar.set_message(name.to_string());
    Some(bar)
}
