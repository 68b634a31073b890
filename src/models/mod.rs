pub mod chat;
pub mod profile;
pub mod user;

pub use chat::{Chat, ChatInterest, ChatUser, LastMessage};
pub use profile::{InterestItem, Profile, ProfileInput, ProfileView};
pub use user::User;
