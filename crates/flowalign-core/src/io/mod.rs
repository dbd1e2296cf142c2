pub mod image_io;
pub mod weights;

pub use weights::WeightsStore;
