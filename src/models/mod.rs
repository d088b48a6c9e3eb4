pub mod anime;
pub mod user;

pub use anime::{Anime, AnimeImages, AnnotatedAnime, ImageSet};
pub use user::{AuthProvider, User};
