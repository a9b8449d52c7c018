pub mod batch;
pub mod canonical;
pub mod period;

pub use batch::*;
pub use canonical::*;
pub use period::*;
