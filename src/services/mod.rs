pub mod auth;
pub mod providers;
pub mod random;
pub mod recommendations;

pub use auth::{hash_password, verify_password, Claims, JwtManager, RefreshPolicy, REFRESH_COOKIE};
pub use providers::{MetadataProvider, SearchParams, TmdbProvider};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use recommendations::Recommender;
