//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `fitlab_core` linkage and
//!   that an in-memory cache opens and migrates cleanly.

use fitlab_core::CacheDb;

fn main() {
    println!("fitlab_core version={}", fitlab_core::core_version());
    match CacheDb::open_in_memory() {
        Ok(db) => println!("cache=ok live_queries={}", db.live_query_count()),
        Err(err) => {
            eprintln!("cache=error {err}");
            std::process::exit(1);
        }
    }
}
