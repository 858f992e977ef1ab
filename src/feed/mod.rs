//! Feed content and the players that back it

pub mod catalog;
mod models;
mod players;

pub use models::{AudioComment, AudioPost, Profile, User};
pub use players::FeedPlayers;
