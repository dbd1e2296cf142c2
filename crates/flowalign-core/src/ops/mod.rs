pub mod blur;
pub mod conv;
pub mod resize;
pub mod warp;

pub use blur::gaussian_blur;
pub use conv::{conv2d, conv_transpose2d, leaky_relu, pixel_shuffle};
pub use resize::{resize_bilinear, scaled_size};
pub use warp::warp;
