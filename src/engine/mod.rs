pub mod assignment;
pub mod matching;
pub mod reports;
