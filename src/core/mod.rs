pub mod traits;
pub use traits::MatVec;
