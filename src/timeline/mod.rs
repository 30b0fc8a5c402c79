pub mod description;
pub mod space;

pub use description::{extended_in_order, load_descriptions, regular_in_order, Description};
pub use space::Space;
