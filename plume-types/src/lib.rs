pub mod enums;
pub mod models;
pub mod viewer;

pub use enums::*;
pub use models::*;
pub use viewer::*;
