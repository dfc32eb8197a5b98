pub mod fair;
pub mod stall;
pub mod reservation;

pub use fair::{BookFair, FairStatus, FairTransitionError};
pub use stall::{Stall, StallSize, StallStatus};
pub use reservation::{Reservation, ReservationStatus, ReservationSummary};
