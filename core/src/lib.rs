pub mod report;
pub mod scanner;
