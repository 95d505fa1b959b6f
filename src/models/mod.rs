pub mod category;

pub use category::{CategoryPolicy, UpdateCategory};
