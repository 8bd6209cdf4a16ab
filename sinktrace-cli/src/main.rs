//! Thin CLI wrapper around the `sinktrace` library crate.

use anyhow::Result;

fn main() -> Result<()> {
    sinktrace::entry_point::run_with_args()
}
