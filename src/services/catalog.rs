use std::time::Duration;

use failsafe::backoff::{self, Constant};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::futures::CircuitBreaker;
use failsafe::{Config as BreakerConfig, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CatalogConfig, CircuitBreakerConfig};
use crate::error::BookingError;

const SERVICE: &str = "movie catalog";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoviePage {
    results: Vec<Movie>,
}

/// Read-only client for a TMDB-compatible catalog, behind a circuit breaker.
#[derive(Clone)]
pub struct MovieCatalog {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    breaker: StateMachine<ConsecutiveFailures<Constant>, ()>,
}

impl MovieCatalog {
    pub fn new(catalog: &CatalogConfig, breaker: &CircuitBreakerConfig) -> Self {
        let policy = failure_policy::consecutive_failures(
            breaker.failure_threshold.max(1),
            backoff::constant(Duration::from_secs(breaker.timeout_seconds)),
        );

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: catalog.base_url.trim_end_matches('/').to_string(),
            api_key: catalog.api_key.clone(),
            breaker: BreakerConfig::new().failure_policy(policy).build(),
        }
    }

    pub async fn fetch_now_playing(&self) -> Result<Vec<Movie>, BookingError> {
        let mut request = self
            .client
            .get(format!("{}/movie/now_playing", self.base_url))
            .query(&[("language", "en-US"), ("page", "1")]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let call = async move {
            request
                .send()
                .await?
                .error_for_status()?
                .json::<MoviePage>()
                .await
        };

        match self.breaker.call(call).await {
            Ok(page) => {
                info!("Fetched {} now-playing movies", page.results.len());
                Ok(page.results)
            }
            Err(failsafe::Error::Rejected) => {
                warn!("Movie catalog circuit open, request rejected");
                Err(BookingError::Upstream {
                    service: SERVICE,
                    message: "circuit breaker open".into(),
                })
            }
            Err(failsafe::Error::Inner(e)) => Err(BookingError::Upstream {
                service: SERVICE,
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(base_url: &str, failure_threshold: u32) -> MovieCatalog {
        MovieCatalog::new(
            &CatalogConfig {
                base_url: base_url.to_string(),
                api_key: Some("token".into()),
            },
            &CircuitBreakerConfig {
                failure_threshold,
                timeout_seconds: 60,
            },
        )
    }

    #[tokio::test]
    async fn parses_now_playing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/now_playing"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [{
                    "id": 550,
                    "title": "Fight Club",
                    "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
                    "vote_average": 8.4,
                    "vote_count": 27000,
                    "release_date": "1999-10-15"
                }]
            })))
            .mount(&server)
            .await;

        let movies = catalog(&server.uri(), 5).fetch_now_playing().await.unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 550);
        assert_eq!(movies[0].title, "Fight Club");
    }

    #[tokio::test]
    async fn upstream_errors_map_to_upstream_and_open_the_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/now_playing"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let catalog = catalog(&server.uri(), 2);
        for _ in 0..2 {
            let err = catalog.fetch_now_playing().await.unwrap_err();
            assert_eq!(err.reason(), "UpstreamError");
        }

        let rejected = catalog.fetch_now_playing().await.unwrap_err();
        assert!(rejected.to_string().contains("circuit breaker open"));
    }
}
