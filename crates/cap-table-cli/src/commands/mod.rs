pub mod analysis;
pub mod liquidation;
