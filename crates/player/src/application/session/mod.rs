//! Game session: state, pure reducer, and the task that drives both.

pub mod reducer;
pub mod service;
pub mod state;

pub use reducer::{ReducerEffect, Submission, Transition};
pub use service::{ActiveGame, SessionHandle, SessionService};
pub use state::{GameSession, SessionView, ViewState};
