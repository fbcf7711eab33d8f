// Domain layer: core models and ports (interfaces). No locking or IO here.

pub mod model;
pub mod ports;
