pub mod block_identifier;
pub mod trace;
