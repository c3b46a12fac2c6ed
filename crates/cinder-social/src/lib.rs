//! Social graph for Cinder.
//!
//! [`Social`] keeps a local copy of the friends list, the groups (clans)
//! the account belongs to, and the members of every joined group chat, and
//! offers the outbound social API (messages, friend requests, chat
//! moderation).
//!
//! The cache is three kinds of [`Store`]: friends, groups, and one
//! [`ChatMemberStore`] owned by each [`Group`].

mod cache;
mod error;
mod model;
mod social;

pub use cache::{Keyed, Store};
pub use error::SocialError;
pub use model::{ChatMember, ChatMemberStore, Friend, Group};
pub use social::Social;
