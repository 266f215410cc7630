//! Cache-backed place search.
//!
//! [`PlaceSearchService`] is what screens call to load businesses. It checks
//! connectivity through a silent [`ConnectivityGate`], reads through the
//! [`GeoResultCache`] when online, and falls back to whatever the cache holds
//! (labelled stale) when offline.

use std::sync::Arc;

use nearby_core::{
    Business, ConnectivityError, LocationError, NearbyError, NearbyQuery, NearbyResult, Page,
};
use nearby_storage::{CacheRead, DurableStore, FetchMode, GeoResultCache, PlaceSearchOrigin};

use crate::gate::{ConnectivityGate, Protected, ProtectedOptions};
use crate::location::LocationCoordinator;

const NEARBY_ACTION: &str = "Nearby search";
const NAME_ACTION: &str = "Name search";

/// Place search with caching and offline fallback.
pub struct PlaceSearchService<S: DurableStore> {
    cache: Arc<GeoResultCache<S>>,
    origin: Arc<dyn PlaceSearchOrigin>,
    gate: ConnectivityGate,
    location: Option<LocationCoordinator>,
}

impl<S: DurableStore> PlaceSearchService<S> {
    pub fn new(
        cache: Arc<GeoResultCache<S>>,
        origin: Arc<dyn PlaceSearchOrigin>,
        gate: ConnectivityGate,
    ) -> Self {
        Self {
            cache,
            origin,
            gate,
            location: None,
        }
    }

    /// Use `location` for "near me" searches instead of the global coordinator.
    pub fn with_location(mut self, location: LocationCoordinator) -> Self {
        self.location = Some(location);
        self
    }

    pub fn cache(&self) -> &GeoResultCache<S> {
        &self.cache
    }

    /// Businesses inside the query circle.
    ///
    /// Offline, a cached result for the same query is returned as stale; with
    /// nothing cached the call fails with `ConnectivityError::Offline`.
    pub async fn nearby(
        &self,
        query: &NearbyQuery,
        mode: FetchMode,
    ) -> NearbyResult<CacheRead<Vec<Business>>> {
        let cache: &GeoResultCache<S> = &self.cache;
        let origin = self.origin.as_ref();

        let outcome = self
            .gate
            .protected_action(
                move || cache.fetch_nearby(query, mode, origin),
                &ProtectedOptions::silent(NEARBY_ACTION),
            )
            .await?;

        match outcome {
            Protected::Completed(read) => Ok(read),
            Protected::Offline => match self.cache.peek_nearby(query).await {
                Some(read) => {
                    tracing::debug!(
                        radius_m = query.radius_m,
                        "Offline, serving cached nearby results"
                    );
                    Ok(read.into_stale())
                }
                None => Err(offline(NEARBY_ACTION)),
            },
        }
    }

    /// Businesses matching `name`, biased towards the last known location.
    pub async fn search_by_name(
        &self,
        name: &str,
        page: Page,
        mode: FetchMode,
    ) -> NearbyResult<CacheRead<Vec<Business>>> {
        let cache: &GeoResultCache<S> = &self.cache;
        let origin = self.origin.as_ref();
        let near = self.coordinator().and_then(|c| c.current());

        let outcome = self
            .gate
            .protected_action(
                move || cache.search_by_name(name, near, page, mode, origin),
                &ProtectedOptions::silent(NAME_ACTION),
            )
            .await?;

        match outcome {
            Protected::Completed(read) => Ok(read),
            Protected::Offline => self
                .cache
                .peek_name(name, page)
                .map(CacheRead::into_stale)
                .ok_or_else(|| offline(NAME_ACTION)),
        }
    }

    /// Nearby search around the device's current location.
    pub async fn nearby_me(
        &self,
        radius_m: u32,
        categories: &[String],
        page: Page,
        mode: FetchMode,
    ) -> NearbyResult<CacheRead<Vec<Business>>> {
        let coordinator = self.coordinator().ok_or_else(|| LocationError::Unavailable {
            reason: "no location coordinator installed".to_string(),
        })?;

        let center = coordinator.refresh_location(false).await;
        let query = NearbyQuery::new(center, radius_m)
            .with_categories(categories.iter().cloned())
            .with_page(page);

        self.nearby(&query, mode).await
    }

    fn coordinator(&self) -> Option<&LocationCoordinator> {
        self.location.as_ref().or_else(|| LocationCoordinator::global())
    }
}

fn offline(action: &str) -> NearbyError {
    ConnectivityError::Offline {
        action: action.to_string(),
    }
    .into()
}
