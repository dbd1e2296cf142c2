pub mod block;
pub mod cascade;
pub mod encoder;
pub mod params;
pub mod residual;

pub use cascade::{estimate_flow, FlowEstimate};
pub use params::ModelWeights;
