pub mod repl;
pub mod report;
