pub mod confirm;
pub mod envelope;
pub mod id;
pub mod identity;
pub mod outcome;
pub mod prelude;
pub mod time;
