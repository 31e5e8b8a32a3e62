pub mod error;
pub mod logging;

pub use error::{PlanError, PlanErrorResponse, PlanResult};
pub use logging::init_logging;
