//! Booking admission: the one place seats turn into a booking.

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::error::BookingError;
use crate::layout::{SeatCategory, SeatId};
use crate::models::{Booking, Occupant, PaymentStatus};
use crate::services::inventory::SeatInventory;
use crate::services::ledger::BookingLedger;
use crate::services::registry::ShowRegistry;

#[derive(Clone)]
pub struct AdmissionService {
    registry: ShowRegistry,
    inventory: SeatInventory,
    ledger: BookingLedger,
    cache: Option<CacheService>,
}

impl AdmissionService {
    pub fn new(
        registry: ShowRegistry,
        inventory: SeatInventory,
        ledger: BookingLedger,
        cache: Option<CacheService>,
    ) -> Self {
        Self {
            registry,
            inventory,
            ledger,
            cache,
        }
    }

    /// Reserves the seats and records an unpaid booking for them.
    ///
    /// Rejections from the inventory come back unchanged and leave the show
    /// untouched. The booking id is fixed before reserving and stored with
    /// every seat, so a booking lost after the reservation can be rebuilt
    /// from the occupancy.
    pub async fn admit_booking(
        &self,
        user_id: &str,
        show_id: Uuid,
        category: SeatCategory,
        seat_ids: &[SeatId],
    ) -> Result<Booking, BookingError> {
        let show = self.registry.get_show(show_id).await?;

        // Prices never change after scheduling, so the amount is known up front.
        let amount = show
            .prices
            .price_for(category)
            .checked_times(seat_ids.len())
            .ok_or_else(|| BookingError::Validation("booking amount overflows".into()))?;

        let booking_id = Uuid::new_v4();
        let occupant = Occupant {
            user_id: user_id.to_string(),
            booking_id,
        };
        let reserved = self
            .inventory
            .reserve_seats(show_id, category, seat_ids, occupant)
            .await?;

        let booking = Booking {
            id: booking_id,
            user_id: user_id.to_string(),
            show_id,
            category,
            seats: seat_ids.to_vec(),
            amount,
            payment_status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        };

        if let Some(cache) = &self.cache {
            cache.invalidate_availability(show_id, reserved.version).await;
        }

        let created = match self.ledger.record(&booking).await {
            Ok(created) => created,
            Err(e) => {
                error!(
                    booking_id = %booking_id,
                    show_id = %show_id,
                    "seats reserved but booking not recorded, left for reconciliation: {}",
                    e
                );
                return Err(e);
            }
        };

        info!(booking_id = %booking_id, user_id, "booking admitted");
        if created {
            Ok(booking)
        } else {
            // The reconciler got there first; answer with the stored row.
            self.ledger.get(booking_id).await
        }
    }
}
