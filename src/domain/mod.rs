// Domain layer: descriptor model and the provider port. No resolution logic lives here.

pub mod model;
pub mod ports;
