pub mod matching;
pub mod pricing;
