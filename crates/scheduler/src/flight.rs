//! Single-flight tracking with supersede
//!
//! Requests are causally ordered by issue time. Beginning a new flight
//! cancels the one in progress, and only the most recent ticket may be
//! finished successfully. This is not a queue: concurrent requests collapse
//! to the latest.

use crate::cancel::CancellationToken;
use tracing::debug;

/// Ticket for one issued request
///
/// Travels with the job to the worker and back to the owner.
#[derive(Debug, Clone)]
pub struct FlightTicket {
    generation: u64,
    token: CancellationToken,
}

impl FlightTicket {
    /// Generation number, increasing with every issued request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token the worker polls to detect supersede
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Owner-side state for single-flight-with-supersede
#[derive(Debug, Default)]
pub struct SingleFlight {
    generation: u64,
    in_flight: Option<FlightTicket>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request, cancelling the one in flight (if any)
    pub fn begin(&mut self) -> FlightTicket {
        if let Some(previous) = self.in_flight.take() {
            debug!(generation = previous.generation, "superseding in-flight request");
            previous.token.cancel();
        }

        self.generation += 1;
        let ticket = FlightTicket {
            generation: self.generation,
            token: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Returns `true` if `ticket` belongs to the request currently in flight
    pub fn is_current(&self, ticket: &FlightTicket) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|current| current.generation == ticket.generation)
    }

    /// Mark `ticket` as completed
    ///
    /// Returns `true` only for the current, non-cancelled ticket; its result
    /// may then be applied. Stale tickets leave the in-flight slot untouched.
    pub fn finish(&mut self, ticket: &FlightTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        self.in_flight = None;
        !ticket.token.is_cancelled()
    }

    /// Cancel the request in flight without issuing a new one
    ///
    /// Returns `true` if a request was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(ticket) => {
                ticket.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Generation of the request in flight
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight.as_ref().map(FlightTicket::generation)
    }

    /// Generation of the most recently issued request
    pub fn latest_generation(&self) -> u64 {
        self.generation
    }
}
