// ── Gyan Atoms Layer ───────────────────────────────────────────────────────
// Pure constants, data types, error types and seam traits. No I/O.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/ or lib.rs.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
