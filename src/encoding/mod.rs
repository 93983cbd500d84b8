pub mod buckets;
pub mod filter;
pub mod payload;
pub mod token_record;
pub mod whitespace;
