mod interaction;
mod movie;
mod movie_key;
mod user;

pub use interaction::{
    Favorite, NewReview, Review, ReviewUpdate, Watchlist, WatchlistMovie, MAX_COMMENT_LEN,
    MAX_RATING,
};
pub use movie::{CandidateQuery, Movie, MovieFilter, NewMovie};
pub use movie_key::MovieKey;
pub use user::{
    is_valid_email, LoginRequest, NewUser, ProfileUpdate, RegisterRequest, User, UserAccount,
};
