pub mod booking;
pub mod money;
pub mod show;

pub use booking::{Booking, PaymentStatus};
pub use money::Money;
pub use show::{CategoryPrices, Occupancy, Occupant, Presentation, Show};
