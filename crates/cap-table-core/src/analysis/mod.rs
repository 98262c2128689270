pub mod breakeven;
pub mod coverage;
pub mod structures;
