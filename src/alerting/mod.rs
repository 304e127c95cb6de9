pub mod coordinator;

pub use coordinator::{AlertCoordinator, EvaluationError};
