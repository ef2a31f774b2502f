use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::BookingError;
use crate::layout::{SeatCategory, SeatId};
use crate::models::{Booking, PaymentStatus, Show};
use crate::services::ledger::BookingLedger;
use crate::store::ShowStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub shows_scanned: usize,
    pub bookings_repaired: usize,
}

/// Rebuilds bookings whose seats were reserved but whose ledger write never
/// landed. Every occupant carries its booking id, so the seats of a lost
/// booking are exactly the occupancy entries with that id.
///
/// Only shows starting within `lookback` of now or later are scanned.
#[derive(Clone)]
pub struct Reconciler {
    shows: Arc<dyn ShowStore>,
    ledger: BookingLedger,
    lookback: Duration,
}

struct Orphan {
    user_id: String,
    category: SeatCategory,
    seats: Vec<SeatId>,
}

fn group_by_booking(show: &Show) -> BTreeMap<Uuid, Orphan> {
    let mut groups: BTreeMap<Uuid, Orphan> = BTreeMap::new();
    for (category, seat, occupant) in show.occupancy.entries() {
        groups
            .entry(occupant.booking_id)
            .or_insert_with(|| Orphan {
                user_id: occupant.user_id.clone(),
                category,
                seats: Vec::new(),
            })
            .seats
            .push(seat.clone());
    }
    groups
}

impl Reconciler {
    pub fn new(shows: Arc<dyn ShowStore>, ledger: BookingLedger, lookback: Duration) -> Self {
        Self {
            shows,
            ledger,
            lookback,
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport, BookingError> {
        let shows = self
            .shows
            .list_with_occupancy(Utc::now() - self.lookback)
            .await?;
        let mut report = ReconcileReport {
            shows_scanned: shows.len(),
            ..Default::default()
        };

        for show in &shows {
            let mut groups = group_by_booking(show);
            let ids: Vec<Uuid> = groups.keys().copied().collect();
            for booking_id in self.ledger.missing(&ids).await? {
                let Some(orphan) = groups.remove(&booking_id) else {
                    continue;
                };

                let Some(amount) = show
                    .prices
                    .price_for(orphan.category)
                    .checked_times(orphan.seats.len())
                else {
                    error!(booking_id = %booking_id, "cannot price orphaned booking, skipping");
                    continue;
                };

                let booking = Booking {
                    id: booking_id,
                    user_id: orphan.user_id,
                    show_id: show.id,
                    category: orphan.category,
                    seats: orphan.seats,
                    amount,
                    payment_status: PaymentStatus::Unpaid,
                    created_at: Utc::now(),
                };
                if self.ledger.record(&booking).await? {
                    warn!(
                        booking_id = %booking_id,
                        show_id = %show.id,
                        "recreated missing booking for {} seats",
                        booking.seats.len()
                    );
                    report.bookings_repaired += 1;
                }
            }
        }

        info!(
            "Reconciliation done: {} shows scanned, {} bookings repaired",
            report.shows_scanned, report.bookings_repaired
        );
        Ok(report)
    }
}
