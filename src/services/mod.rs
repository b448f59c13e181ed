pub mod artifacts;
pub mod interaction;
pub mod pacing;
pub mod readiness_guard;
pub mod run_ledger;
pub mod session;
pub mod work_queue;

pub use artifacts::DebugArtifacts;
pub use pacing::{Pacer, PacingState};
pub use readiness_guard::{ChallengeOutcome, IdleOutcome, ReadinessGuard};
pub use run_ledger::RunLedger;
pub use session::{SessionBootstrapper, SessionHandle};
pub use work_queue::WorkQueue;
