mod checker;
mod condition;
mod engine;
mod handlers;
mod interpolate;
mod loader;
mod validate;

pub use checker::check_plan;
pub use engine::{Engine, Flow};
pub use interpolate::interpolate;
pub use loader::PlanLoader;
pub use validate::validate_parameters;
