mod cli;
mod runner;

pub use runner::run;
