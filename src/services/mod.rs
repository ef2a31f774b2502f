pub mod admission;
pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod reconcile;
pub mod registry;

pub use admission::AdmissionService;
pub use catalog::{Movie, MovieCatalog};
pub use inventory::{Availability, SeatInventory};
pub use ledger::BookingLedger;
pub use reconcile::{ReconcileReport, Reconciler};
pub use registry::{BatchSchedule, NewShow, ScheduleEntry, ShowRegistry};
