// ============================================================
// Layer 1 — CLI
// ============================================================
// Thin argument-parsing shell over the application layer. Every
// subcommand maps 1:1 onto one use case; no pipeline logic lives
// here.

mod commands;

pub use commands::Cli;
