pub mod error;
pub mod consts;
pub mod tensor;
pub mod ops;
pub mod io;
pub mod flow;
pub mod align;
