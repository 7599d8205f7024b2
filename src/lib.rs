//! Compound interest projections backed by a live rate feed from the
//! Banco Central do Brasil SGS data service.

pub mod api;
pub mod core;
pub mod rate;
