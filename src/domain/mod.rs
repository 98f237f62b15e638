// Domain layer: roster/tenure models and ports (interfaces).

pub mod model;
pub mod ports;
