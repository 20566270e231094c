/// TMDB metadata provider
///
/// Endpoints used:
/// 1. Search: /search/movie → paged result list
/// 2. Details: /movie/{id}?append_to_response=credits,videos
///
/// Responses are passed through untouched and cached in Redis.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    services::providers::{MetadataProvider, SearchParams},
};
use reqwest::Client as HttpClient;
use serde_json::Value;

const SEARCH_ERROR: &str = "TMDB search error";
const DETAILS_ERROR: &str = "TMDB details error";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
    cache_ttl: u64,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, cache_ttl: u64) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    /// Movie ids are interpolated into the URL path, so only plain tokens pass
    fn validate_movie_id(movie_id: &str) -> AppResult<()> {
        if movie_id.is_empty() || !movie_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidInput(format!(
                "Invalid movie id: {}",
                movie_id
            )));
        }
        Ok(())
    }

    /// GETs a TMDB path, mapping every failure to `failure`
    async fn get_json(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        failure: &str,
    ) -> AppResult<Value> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(path = %path, error = %e, "TMDB request failed");
                AppError::ExternalApi(failure.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB returned an error status"
            );
            return Err(AppError::ExternalApi(failure.to_string()));
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Invalid TMDB response body");
            AppError::ExternalApi(failure.to_string())
        })
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_movies(&self, params: &SearchParams) -> AppResult<Value> {
        params.validate()?;

        cached!(
            self.cache,
            CacheKey::TmdbSearch(params.cache_fragment()),
            self.cache_ttl,
            async move {
                let results = self
                    .get_json("/search/movie", &params.query_pairs(), SEARCH_ERROR)
                    .await?;

                tracing::info!(
                    query = ?params.query,
                    total_results = results["total_results"].as_u64().unwrap_or(0),
                    "TMDB search completed"
                );

                Ok::<_, AppError>(results)
            }
        )
    }

    async fn movie_details(&self, movie_id: &str) -> AppResult<Value> {
        Self::validate_movie_id(movie_id)?;

        cached!(
            self.cache,
            CacheKey::TmdbDetails(movie_id.to_string()),
            self.cache_ttl,
            self.get_json(
                &format!("/movie/{}", movie_id),
                &[("append_to_response", "credits,videos".to_string())],
                DETAILS_ERROR,
            )
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
