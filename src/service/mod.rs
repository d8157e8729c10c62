//! Entity services and the payload rules they enforce.

mod crud;
pub mod validation;
pub use crud::{EmployeeService, ReservationService, RoomService};
pub use validation::RequestValidator;
