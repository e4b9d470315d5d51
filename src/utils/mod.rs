pub mod grouping;
pub use grouping::{group_count, group_members};
