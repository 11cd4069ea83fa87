pub mod auth;
pub mod health;
pub mod matches;
pub mod players;
pub mod signups;
pub mod stats;
