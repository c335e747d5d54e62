pub mod stats;
pub mod ticket;
