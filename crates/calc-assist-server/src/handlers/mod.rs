pub mod ask;
pub mod firmware;
pub mod health;
pub mod math;
pub mod solve;
