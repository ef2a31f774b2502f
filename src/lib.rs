pub mod cache;
pub mod config;
pub mod controllers;
pub mod error;
pub mod layout;
pub mod middleware;
pub mod models;
pub mod retry;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheService;
use crate::config::Config;
use crate::layout::{HallLayouts, LayoutError};
use crate::retry::RetryConfig;
use crate::services::{
    AdmissionService, BookingLedger, MovieCatalog, Reconciler, SeatInventory, ShowRegistry,
};
use crate::store::{BookingStore, MemoryBookingStore, MemoryShowStore, ShowStore};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub layouts: Arc<HallLayouts>,
    pub registry: ShowRegistry,
    pub inventory: SeatInventory,
    pub ledger: BookingLedger,
    pub admission: AdmissionService,
    pub reconciler: Reconciler,
    pub catalog: MovieCatalog,
    pub cache: Option<CacheService>,
}

/// Built-in halls unless a layout file is configured.
pub fn load_layouts(config: &Config) -> Result<HallLayouts, LayoutError> {
    match &config.hall_layouts_path {
        Some(path) => HallLayouts::load(path),
        None => HallLayouts::builtin(),
    }
}

impl AppState {
    pub fn new(
        config: Config,
        layouts: HallLayouts,
        shows: Arc<dyn ShowStore>,
        bookings: Arc<dyn BookingStore>,
        cache: Option<CacheService>,
    ) -> Arc<Self> {
        let layouts = Arc::new(layouts);
        let booking = &config.booking;

        let registry = ShowRegistry::new(shows.clone(), layouts.clone());
        let inventory = SeatInventory::new(
            shows.clone(),
            layouts.clone(),
            booking.max_seats_per_booking,
            booking.reserve_max_attempts,
        );
        let ledger = BookingLedger::new(
            bookings,
            RetryConfig::with_delays(
                booking.ledger_max_attempts,
                Duration::from_millis(50),
                Duration::from_secs(2),
            ),
        );
        let admission = AdmissionService::new(
            registry.clone(),
            inventory.clone(),
            ledger.clone(),
            cache.clone(),
        );
        let reconciler = Reconciler::new(
            shows,
            ledger.clone(),
            chrono::Duration::hours(booking.reconcile_lookback_hours),
        );
        let catalog = MovieCatalog::new(&config.catalog, &config.circuit_breaker);

        Arc::new(Self {
            config,
            layouts,
            registry,
            inventory,
            ledger,
            admission,
            reconciler,
            catalog,
            cache,
        })
    }

    /// State backed by in-process stores; nothing survives a restart.
    pub fn in_memory(config: Config, layouts: HallLayouts) -> Arc<Self> {
        Self::new(
            config,
            layouts,
            Arc::new(MemoryShowStore::new()),
            Arc::new(MemoryBookingStore::new()),
            None,
        )
    }
}
