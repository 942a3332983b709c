//! Reset and flash session.
//!
//! **Example** - Running a session against the real system:
//! ```no_run
//! use uf2reset::{self as ur, CancelToken, Reporter, Status};
//!
//! struct Quiet;
//! impl Reporter for Quiet {
//!     fn report(&self, _status: Status<'_>) {}
//! }
//!
//! let settings = ur::SettingsBuilder::default().firmware("app.uf2").finalize();
//! let system = ur::System::new(&settings);
//! let session = ur::factory(settings, system.environment(&Quiet, CancelToken::new()));
//! let outcome = session.run();
//! std::process::exit(outcome.exit_code());
//! ```

mod environment;
mod events;
mod state_machine;
mod states;

pub use environment::{Environment, System};
pub use state_machine::{factory, Outcome, Session};
