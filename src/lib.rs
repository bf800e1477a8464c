#![forbid(unsafe_code)]

//! `dupe_quarantine` (`dqm`) — finds files in a scan directory that
//! duplicate files in a reference directory and quarantines the scan-side
//! copies, leaving the reference tree untouched.
//!
//! Three tightly coupled subsystems do the work:
//! 1. **Duplicate resolution pipeline** — Bloom prefilter + deterministic
//!    keying, reducing an O(\|scan\|·\|reference\|) comparison to near-linear.
//! 2. **Content-hash cache** — a two-tier (persistent + ephemeral) digest
//!    store, partitioned by reference root, with TTL expiry and auto-flush.
//! 3. **Safety-constrained file mover** — a protected/allowed path gate on
//!    every mutating filesystem call, with an identical dry-run decision path.

pub mod core;
pub mod scanner;

pub mod prelude;
