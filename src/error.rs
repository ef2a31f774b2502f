use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::layout::{HallCode, SeatCategory, SeatId};
use crate::store::StoreError;

/// Seat ids carried by a rejection, printed comma separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeatList(pub Vec<SeatId>);

impl fmt::Display for SeatList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seat) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{seat}")?;
        }
        Ok(())
    }
}

impl From<Vec<SeatId>> for SeatList {
    fn from(seats: Vec<SeatId>) -> Self {
        Self(seats)
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("show {0} not found")]
    ShowNotFound(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("unknown seat category '{0}'")]
    UnknownCategory(String),

    #[error("hall {hall} has no {category} seating")]
    CategoryNotFound { hall: HallCode, category: SeatCategory },

    #[error("seats do not exist in this hall: {seats}")]
    SeatNotFound { seats: SeatList },

    #[error("seats are permanently unavailable: {seats}")]
    SeatDisabled { seats: SeatList },

    #[error("{requested} seats requested, at most {max} allowed per booking")]
    TooManySeats { requested: usize, max: usize },

    #[error("seats already taken: {seats}")]
    SeatConflict { seats: SeatList },

    #[error("show {show_id} kept changing during {attempts} reservation attempts, please retry")]
    ConcurrentUpdate { show_id: Uuid, attempts: u32 },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{service} unavailable: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BookingError {
    /// Stable code exposed to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::ShowNotFound(_) => "ShowNotFound",
            BookingError::BookingNotFound(_)
            | BookingError::UnknownCategory(_)
            | BookingError::CategoryNotFound { .. } => "NotFound",
            BookingError::SeatNotFound { .. } => "SeatNotFound",
            BookingError::SeatDisabled { .. } => "SeatDisabled",
            BookingError::TooManySeats { .. } => "TooManySeats",
            BookingError::SeatConflict { .. } | BookingError::ConcurrentUpdate { .. } => {
                "SeatConflict"
            }
            BookingError::Validation(_) => "ValidationError",
            BookingError::Upstream { .. } => "UpstreamError",
            BookingError::Storage(_) => "StorageError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BookingError::ShowNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::UnknownCategory(_)
            | BookingError::CategoryNotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::SeatNotFound { .. }
            | BookingError::SeatDisabled { .. }
            | BookingError::TooManySeats { .. }
            | BookingError::SeatConflict { .. }
            | BookingError::ConcurrentUpdate { .. } => StatusCode::CONFLICT,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Seats the client should re-render, if the rejection is about seats.
    pub fn seats(&self) -> &[SeatId] {
        match self {
            BookingError::SeatNotFound { seats }
            | BookingError::SeatDisabled { seats }
            | BookingError::SeatConflict { seats } => &seats.0,
            _ => &[],
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    reason: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seats: Vec<SeatId>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            BookingError::Storage(e) => {
                tracing::error!("storage failure: {e}");
                "internal storage error".to_string()
            }
            BookingError::Upstream { .. } => {
                tracing::warn!("{self}");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            reason: self.reason(),
            message,
            seats: self.seats().to_vec(),
        };
        (status, Json(body)).into_response()
    }
}
