pub mod genre;
pub mod like_review;
pub mod movie;
pub mod movie_cast;
pub mod movie_genre;
pub mod person;
pub mod rating;
pub mod review;
pub mod user;
pub mod watch_list;
