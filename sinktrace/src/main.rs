//! Main binary entry point for the `sinktrace` taint-analysis engine.
//!
//! This binary simply delegates to the shared `entry_point::run_with_args()`
//! function to ensure consistent behavior across all entry points.

use anyhow::Result;

fn main() -> Result<()> {
    sinktrace::entry_point::run_with_args()
}
