//! WaniKani review notifications over Facebook Messenger.
//!
//! Users talk to the bot with short text commands (`query`, `subscribe`,
//! `cancel`); subscribed users also get an automatic message once per clock
//! hour with the number of reviews that became available.

pub mod config;
pub mod dialogue;
pub mod messenger;
pub mod registry;
pub mod scheduler;
pub mod wanikani;
pub mod webhook;
