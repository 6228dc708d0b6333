//! roster-engine — Enrollment and check-in services.
//!
//! Each call is one synchronous attempt: capture a frame, extract the first
//! face, then store it (enroll), verify it and append to the ledger
//! (check-in), or search the registry for it (identify). No state is
//! carried between attempts.

mod attempt;
pub mod checkin;
pub mod enroll;
pub mod error;
pub mod external;
pub mod identify;
pub mod prefill;

#[cfg(test)]
mod testing;

pub use checkin::{CheckInService, DEFAULT_LOCATION};
pub use enroll::EnrollmentService;
pub use error::AttendanceError;
pub use external::{CommandExtractor, CommandLine, CommandRecognizer};
pub use identify::IdentifyService;
pub use prefill::prefill_name;
