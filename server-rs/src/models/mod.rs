pub mod matches;
pub mod player;
pub mod signup;

pub use matches::*;
pub use player::*;
pub use signup::*;
