pub mod cache;
pub mod coefficient;
pub mod config;
pub mod error;
pub mod filter;
pub mod geodesic;
pub mod harmonic;
pub mod measurement;
pub mod operator;
pub mod packing;
pub mod prior;
pub mod routing;
pub mod sampling;
pub mod stream;
pub mod tiling;
pub mod transform;

pub use error::Error;
