use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::BookingError;
use crate::layout::{HallCode, HallLayouts};
use crate::models::{CategoryPrices, Presentation, Show};
use crate::store::ShowStore;

/// Input for a single screening.
#[derive(Debug, Clone)]
pub struct NewShow {
    pub movie_id: String,
    pub hall: HallCode,
    pub starts_at: DateTime<Utc>,
    pub presentation: Presentation,
    pub prices: CategoryPrices,
}

/// One hall and day with its start times.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub hall: HallCode,
    pub date: NaiveDate,
    pub times: Vec<NaiveTime>,
}

/// Several screenings of one movie sharing type and prices.
#[derive(Debug, Clone)]
pub struct BatchSchedule {
    pub movie_id: String,
    pub presentation: Presentation,
    pub prices: CategoryPrices,
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Clone)]
pub struct ShowRegistry {
    shows: Arc<dyn ShowStore>,
    layouts: Arc<HallLayouts>,
}

impl ShowRegistry {
    pub fn new(shows: Arc<dyn ShowStore>, layouts: Arc<HallLayouts>) -> Self {
        Self { shows, layouts }
    }

    fn validate(&self, new: &NewShow, now: DateTime<Utc>) -> Result<(), BookingError> {
        if new.movie_id.trim().is_empty() {
            return Err(BookingError::Validation("movie id must not be empty".into()));
        }
        if !self.layouts.contains(&new.hall) {
            return Err(BookingError::Validation(format!("unknown hall {}", new.hall)));
        }
        if new.starts_at <= now {
            return Err(BookingError::Validation(format!(
                "show time {} is not in the future",
                new.starts_at.to_rfc3339()
            )));
        }
        if !new.prices.regular.is_positive() || !new.prices.vip.is_positive() {
            return Err(BookingError::Validation("prices must be positive".into()));
        }
        Ok(())
    }

    pub async fn create_show(&self, new: NewShow) -> Result<Show, BookingError> {
        self.validate(&new, Utc::now())?;

        let show = Show::new(
            new.movie_id.trim().to_string(),
            new.hall,
            new.starts_at,
            new.presentation,
            new.prices,
        );
        self.shows.insert(&show).await?;

        info!(
            show_id = %show.id,
            movie_id = %show.movie_id,
            hall = %show.hall,
            "show scheduled for {}",
            show.starts_at.to_rfc3339()
        );
        Ok(show)
    }

    /// Expands the schedule and persists it only if every entry is valid.
    pub async fn create_batch(&self, batch: BatchSchedule) -> Result<Vec<Show>, BookingError> {
        let now = Utc::now();
        let mut pending = Vec::new();

        for entry in &batch.entries {
            if entry.times.is_empty() {
                return Err(BookingError::Validation(format!(
                    "no times given for hall {} on {}",
                    entry.hall, entry.date
                )));
            }
            for time in &entry.times {
                let new = NewShow {
                    movie_id: batch.movie_id.trim().to_string(),
                    hall: entry.hall.clone(),
                    starts_at: entry.date.and_time(*time).and_utc(),
                    presentation: batch.presentation,
                    prices: batch.prices,
                };
                self.validate(&new, now)?;
                pending.push(Show::new(
                    new.movie_id,
                    new.hall,
                    new.starts_at,
                    new.presentation,
                    new.prices,
                ));
            }
        }
        if pending.is_empty() {
            return Err(BookingError::Validation("schedule has no entries".into()));
        }

        self.shows.insert_many(&pending).await?;
        info!(movie_id = %batch.movie_id, "scheduled {} shows", pending.len());
        Ok(pending)
    }

    pub async fn get_show(&self, show_id: Uuid) -> Result<Show, BookingError> {
        self.shows
            .get(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(show_id))
    }

    /// Shows of the movie starting on `date` (UTC), earliest first.
    pub async fn list_shows_for_movie_and_date(
        &self,
        movie_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Show>, BookingError> {
        let from = date.and_time(NaiveTime::MIN).and_utc();
        let to = date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(self.shows.list_for_movie_between(movie_id, from, to).await?)
    }

    pub async fn list_upcoming(&self) -> Result<Vec<Show>, BookingError> {
        Ok(self.shows.list_upcoming(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use crate::store::MemoryShowStore;
    use chrono::{Duration, Timelike};

    fn registry() -> ShowRegistry {
        ShowRegistry::new(
            Arc::new(MemoryShowStore::new()),
            Arc::new(HallLayouts::builtin().unwrap()),
        )
    }

    fn prices(regular: i64, vip: i64) -> CategoryPrices {
        CategoryPrices {
            regular: Money::from_minor(regular),
            vip: Money::from_minor(vip),
        }
    }

    fn new_show(hall: &str, starts_at: DateTime<Utc>) -> NewShow {
        NewShow {
            movie_id: "550".into(),
            hall: HallCode::new(hall),
            starts_at,
            presentation: Presentation::ThreeD,
            prices: prices(1_200, 3_000),
        }
    }

    fn tomorrow() -> NaiveDate {
        (Utc::now() + Duration::days(1)).date_naive()
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn created_show_is_empty_and_readable() {
        let registry = registry();
        let show = registry
            .create_show(new_show("c2", Utc::now() + Duration::hours(3)))
            .await
            .unwrap();

        assert_eq!(show.hall.as_str(), "C2");
        assert!(show.occupancy.is_empty());
        assert_eq!(registry.get_show(show.id).await.unwrap(), show);
    }

    #[tokio::test]
    async fn rejects_unknown_hall_past_time_and_free_tickets() {
        let registry = registry();
        let future = Utc::now() + Duration::hours(3);

        let unknown = registry.create_show(new_show("C9", future)).await.unwrap_err();
        let past = registry
            .create_show(new_show("C1", Utc::now() - Duration::minutes(1)))
            .await
            .unwrap_err();
        let mut free = new_show("C1", future);
        free.prices = prices(0, 3_000);
        let free = registry.create_show(free).await.unwrap_err();

        for err in [unknown, past, free] {
            assert_eq!(err.reason(), "ValidationError");
        }
    }

    #[tokio::test]
    async fn missing_show_is_not_found() {
        let err = registry().get_show(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.reason(), "ShowNotFound");
    }

    #[tokio::test]
    async fn listing_by_date_is_ordered_and_allows_duplicates() {
        let registry = registry();
        let day = tomorrow();
        for hour in [21, 10, 10] {
            registry
                .create_show(new_show("C1", day.and_time(at(hour)).and_utc()))
                .await
                .unwrap();
        }
        registry
            .create_show(new_show("C1", (day + Days::new(1)).and_time(at(10)).and_utc()))
            .await
            .unwrap();

        let shows = registry.list_shows_for_movie_and_date("550", day).await.unwrap();
        let hours: Vec<u32> = shows.iter().map(|s| s.starts_at.hour()).collect();
        assert_eq!(hours, vec![10, 10, 21]);

        let other = registry.list_shows_for_movie_and_date("551", day).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let registry = registry();
        let day = tomorrow();
        let batch = BatchSchedule {
            movie_id: "550".into(),
            presentation: Presentation::TwoD,
            prices: prices(1_000, 2_000),
            entries: vec![
                ScheduleEntry {
                    hall: HallCode::new("C1"),
                    date: day,
                    times: vec![at(12), at(18)],
                },
                ScheduleEntry {
                    hall: HallCode::new("C7"),
                    date: day,
                    times: vec![at(20)],
                },
            ],
        };

        let err = registry.create_batch(batch.clone()).await.unwrap_err();
        assert_eq!(err.reason(), "ValidationError");
        assert!(registry.list_upcoming().await.unwrap().is_empty());

        let mut valid = batch;
        valid.entries[1].hall = HallCode::new("C3");
        let shows = registry.create_batch(valid).await.unwrap();
        assert_eq!(shows.len(), 3);
        assert_eq!(registry.list_upcoming().await.unwrap().len(), 3);
    }
}
