pub mod ledger;
pub mod state;
pub mod audit;
pub mod service;

pub use ledger::{BookingError, BookingLedger, PassengerBookingIndex};
pub use state::LedgerState;
pub use audit::audit_records;
pub use service::ReservationService;
