//! # Application Layer

pub mod reconciler;
pub mod scheduler;

pub use reconciler::ReconciliationRoutine;
pub use scheduler::AutomationScheduler;
