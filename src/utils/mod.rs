pub mod logging;
pub mod poll;

pub use poll::{pause_between, poll_until, PollOutcome, PollSpec};
