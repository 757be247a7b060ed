//! Browser slow path: shared Chromium, bounded page concurrency, rendered
//! search and detail phases.

pub mod browser;
pub mod executor;
pub mod page;

pub use browser::SharedBrowser;
pub use executor::{ChromiumSlowPath, DisabledSlowPath, SlowPath, choose_best_link};
