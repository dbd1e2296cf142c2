pub mod compensate;
pub mod config;

pub use compensate::{
    align_pair, align_pair_with_progress, compensate_once, AlignmentOutput, AlignmentPass,
};
pub use config::AlignmentConfig;
