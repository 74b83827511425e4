pub mod node;
pub mod reducer;
pub mod ring;
pub mod transport;
pub mod worker;
