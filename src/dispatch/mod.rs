//! Function-call detection and the per-turn dispatch loop.

mod call;
mod config;
mod detect;
mod dispatcher;
pub mod prompts;
mod review;
mod sink;

pub use call::{movie_tools, MovieCall, TicketRequest, FUNCTION_NAMES};
pub use config::{DispatchConfig, Strategy};
pub use detect::{CallDetector, Detection, ModelReply};
pub use dispatcher::Dispatcher;
pub use review::ReviewDecision;
pub use sink::{BufferSink, NullSink, ReplySink};

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;
