pub mod variable;
pub mod trial_point;
pub mod objective;
pub mod trial;
pub mod ranking;
pub mod problem;
pub mod errors;

pub use variable::*;
pub use trial_point::*;
pub use objective::*;
pub use trial::*;
pub use problem::*;
pub use errors::*;
