//! Handler invocation: positional arguments, the response slot and the
//! `next` signal.

mod endpoint;
mod params;
mod writer;

pub use endpoint::{ActionEndpoint, DEFAULT_BODY_LIMIT};
pub use params::{HandlerArgs, Param, RequestContext};
pub use writer::{NextSignal, NextState, ResponseWriter};
