pub mod checker;
pub mod runner;

pub use checker::check_result;
pub use runner::HarnessRunner;
