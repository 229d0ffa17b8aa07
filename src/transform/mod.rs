pub mod cost;
pub mod normalize;
pub mod rolling;

pub use cost::apply_costs;
pub use normalize::normalize;
pub use rolling::rolling_annual;
