//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load application → Bind → Accepting → "ready"
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ordered event channel
//!
//! Supervision (supervisor.rs):
//!     First signal → shutdown(); later signals ignored → exit status
//!
//! Shutdown (shutdown.rs):
//!     Draining (stop accept) → close listener → drain connections → Stopped
//! ```
//!
//! # Design Decisions
//! - One coordinator owns one listener, passed explicitly
//! - Shutdown has a timeout: remaining connections are dropped at the deadline
//! - Signal handlers are registered only after startup succeeded

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;
pub mod supervisor;

pub use shutdown::{DrainReport, ShutdownCoordinator, ShutdownError};
pub use signals::TerminationSignal;
pub use startup::{boot, start, Bootstrapper, StartupError};
pub use state::LifecycleState;
pub use supervisor::{supervise, ProcessExit};
