pub mod money;
pub mod period;
