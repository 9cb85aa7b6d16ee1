pub mod post;
pub mod target;

pub use post::Post;
pub use target::{AccessContext, FormatFlags, OutputType, Sorting, Target};
