pub mod explanation;
pub mod function;
pub mod match_query;
pub mod query;
pub mod similarity;
pub mod spans;
