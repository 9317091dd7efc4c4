// Domain layer: upstream records, generated scenario and ports (interfaces).

pub mod model;
pub mod ports;
pub mod scenario;
