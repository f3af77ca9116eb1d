//! Render scheduling primitives for the annotator.
//!
//! Rendering follows a single-flight-with-supersede policy: at most one page
//! render is in flight, and issuing a new request cancels the previous one.
//! Workers poll a [`CancellationToken`] and the owner applies a result only if
//! its [`FlightTicket`] is still current.
//!
//! # Example
//!
//! ```
//! use annotator_scheduler::SingleFlight;
//!
//! let mut flight = SingleFlight::new();
//!
//! let first = flight.begin();
//! let second = flight.begin();
//!
//! // The first request was superseded and its token cancelled.
//! assert!(first.token().is_cancelled());
//! assert!(!flight.finish(&first));
//! assert!(flight.finish(&second));
//! ```

mod cancel;
mod flight;

pub use cancel::CancellationToken;
pub use flight::{FlightTicket, SingleFlight};
