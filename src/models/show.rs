use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Money;
use crate::layout::{HallCode, SeatCategory, SeatId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presentation {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
}

impl Presentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presentation::TwoD => "2D",
            Presentation::ThreeD => "3D",
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Presentation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "2D" => Ok(Presentation::TwoD),
            "3D" => Ok(Presentation::ThreeD),
            other => Err(format!("unknown presentation type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPrices {
    pub regular: Money,
    pub vip: Money,
}

impl CategoryPrices {
    pub fn price_for(&self, category: SeatCategory) -> Money {
        match category {
            SeatCategory::Regular => self.regular,
            SeatCategory::Vip => self.vip,
        }
    }
}

/// Who holds a seat: the buyer and the booking the seat was reserved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub user_id: String,
    pub booking_id: Uuid,
}

/// Taken seats of a show, keyed per category since seat ids repeat
/// between the regular and VIP geometry of the same hall.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regular: BTreeMap<SeatId, Occupant>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vip: BTreeMap<SeatId, Occupant>,
}

impl Occupancy {
    pub fn seats(&self, category: SeatCategory) -> &BTreeMap<SeatId, Occupant> {
        match category {
            SeatCategory::Regular => &self.regular,
            SeatCategory::Vip => &self.vip,
        }
    }

    pub fn seats_mut(&mut self, category: SeatCategory) -> &mut BTreeMap<SeatId, Occupant> {
        match category {
            SeatCategory::Regular => &mut self.regular,
            SeatCategory::Vip => &mut self.vip,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.vip.is_empty()
    }

    pub fn is_taken(&self, category: SeatCategory, seat: &SeatId) -> bool {
        self.seats(category).contains_key(seat)
    }

    /// All (category, seat, occupant) entries.
    pub fn entries(&self) -> impl Iterator<Item = (SeatCategory, &SeatId, &Occupant)> {
        self.regular
            .iter()
            .map(|(seat, occ)| (SeatCategory::Regular, seat, occ))
            .chain(self.vip.iter().map(|(seat, occ)| (SeatCategory::Vip, seat, occ)))
    }
}

/// One scheduled screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub movie_id: String,
    pub hall: HallCode,
    pub starts_at: DateTime<Utc>,
    pub presentation: Presentation,
    pub prices: CategoryPrices,
    pub occupancy: Occupancy,
    /// Bumped on every occupancy write; writers must present the value they read.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Show {
    pub fn new(
        movie_id: String,
        hall: HallCode,
        starts_at: DateTime<Utc>,
        presentation: Presentation,
        prices: CategoryPrices,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            movie_id,
            hall,
            starts_at,
            presentation,
            prices,
            occupancy: Occupancy::default(),
            version: 0,
            created_at: Utc::now(),
        }
    }
}
