pub mod commands;
pub mod page_watcher;
pub mod repl;
