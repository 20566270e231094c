use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CandidateQuery, Movie, MovieKey},
    services::random::RandomSource,
    store::{CatalogStore, FavoriteStore, ReviewStore, Stores, WatchlistStore},
};

/// Most genre-matched candidates fetched per request
pub const CANDIDATE_LIMIT: usize = 10;
/// Below this many genre matches the list is topped up from the catalog
pub const MIN_CANDIDATES: usize = 5;
/// Size of the random catalog window used for top-up
pub const BACKFILL_SIZE: u64 = 5;
/// Length cap of the returned list
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Generates personalized movie recommendations
///
/// Pipeline, run once per request:
/// 1. Collect every movie the user favorited, put on a watchlist or reviewed
/// 2. Look those movies up in the catalog and collect their genres
/// 3. Fetch unseen catalog movies in those genres, topping the list up with a
///    random catalog window when too few match
/// 4. Drop duplicate ids and cut the list to [`MAX_RECOMMENDATIONS`]
///
/// Any store failure aborts the whole pipeline.
#[derive(Clone)]
pub struct Recommender {
    favorites: Arc<dyn FavoriteStore>,
    watchlists: Arc<dyn WatchlistStore>,
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
    random: Arc<dyn RandomSource>,
}

impl Recommender {
    pub fn new(stores: &Stores, random: Arc<dyn RandomSource>) -> Self {
        Self {
            favorites: stores.favorites.clone(),
            watchlists: stores.watchlists.clone(),
            reviews: stores.reviews.clone(),
            catalog: stores.catalog.clone(),
            random,
        }
    }

    /// Recommendations for a user, at most [`MAX_RECOMMENDATIONS`] long
    #[tracing::instrument(skip(self))]
    pub async fn recommend(&self, user_id: Uuid) -> AppResult<Vec<Movie>> {
        let seen = self.seen_movies(user_id).await?;
        let genres = self.preferred_genres(&seen).await?;
        let candidates = self.select_candidates(&genres, &seen).await?;
        let candidate_count = candidates.len();
        let recommendations = finalize(candidates);

        tracing::info!(
            seen_count = seen.len(),
            genre_count = genres.len(),
            candidate_count,
            returned = recommendations.len(),
            "Generated recommendations"
        );

        Ok(recommendations)
    }

    /// Every movie id the user has interacted with
    ///
    /// The three history reads run concurrently and all must succeed.
    pub async fn seen_movies(&self, user_id: Uuid) -> AppResult<HashSet<MovieKey>> {
        let (favorites, watchlists, reviews) = tokio::try_join!(
            self.favorites.favorites_for(user_id),
            self.watchlists.watchlists_for(user_id),
            self.reviews.reviews_for(user_id),
        )?;

        let seen = favorites
            .into_iter()
            .map(|favorite| favorite.movie_id)
            .chain(
                watchlists
                    .into_iter()
                    .flat_map(|watchlist| watchlist.movies)
                    .map(|movie| movie.movie_id),
            )
            .chain(reviews.into_iter().map(|review| review.movie_id))
            .collect();

        Ok(seen)
    }

    /// Distinct genres of the seen movies found in the catalog, first-seen order
    pub async fn preferred_genres(&self, seen: &HashSet<MovieKey>) -> AppResult<Vec<String>> {
        if seen.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<MovieKey> = seen.iter().cloned().collect();
        let matched = self.catalog.find_by_ids(&ids).await?;

        let mut genres: Vec<String> = Vec::new();
        for genre in matched.into_iter().filter_map(|movie| movie.genre) {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }

        Ok(genres)
    }

    /// Genre matches first, then the filtered random top-up if needed
    ///
    /// With no preferred genres the query is unrestricted by genre, so the
    /// first unseen catalog entries lead the list.
    pub async fn select_candidates(
        &self,
        genres: &[String],
        seen: &HashSet<MovieKey>,
    ) -> AppResult<Vec<Movie>> {
        let query = CandidateQuery {
            genres: genres.to_vec(),
            exclude: seen.iter().cloned().collect(),
            limit: CANDIDATE_LIMIT,
        };
        let mut candidates = self.catalog.find_candidates(&query).await?;

        if candidates.len() < MIN_CANDIDATES {
            let total = self.catalog.count().await?;
            let offset = backfill_offset(total, self.random.as_ref());
            let window = self.catalog.window(offset, BACKFILL_SIZE).await?;

            tracing::debug!(
                genre_matches = candidates.len(),
                catalog_size = total,
                offset,
                window_len = window.len(),
                "Backfilling recommendations"
            );

            candidates.extend(window.into_iter().filter(|movie| !seen.contains(&movie.id)));
        }

        Ok(candidates)
    }
}

/// Random start of the top-up window, in `[0, max(0, total - BACKFILL_SIZE)]`
pub fn backfill_offset(total: u64, random: &dyn RandomSource) -> u64 {
    random.offset_up_to(total.saturating_sub(BACKFILL_SIZE))
}

/// Keeps the first occurrence of each id and truncates
pub fn finalize(candidates: Vec<Movie>) -> Vec<Movie> {
    let mut ids = HashSet::new();
    candidates
        .into_iter()
        .filter(|movie| ids.insert(movie.id.clone()))
        .take(MAX_RECOMMENDATIONS)
        .collect()
}
