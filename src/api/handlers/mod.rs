pub mod features;
pub mod model;
pub mod system;

pub use features::*;
pub use model::*;
pub use system::*;
