// Domain layer: models and ports. No knowledge of axum, reqwest or the supervisor.

pub mod model;
pub mod ports;
