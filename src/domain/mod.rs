// Domain layer: request/result models, prompt templates and ports (interfaces).

pub mod model;
pub mod ports;
pub mod templates;
