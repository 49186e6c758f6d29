// Domain layer: request/response models and the ports (transport, authentication)
// the client is written against.

pub mod model;
pub mod ports;
