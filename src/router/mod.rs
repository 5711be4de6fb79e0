mod dispatch;
mod envelope;
mod invoke;
mod poll;
mod results;

pub use dispatch::RequestRouter;
pub use envelope::{CallEnvelope, PollResponse, ResponseEnvelope};
pub use poll::PollDispatcher;
pub use results::{FormLoadResult, FormPostResult, StoreResult};

pub(crate) use invoke::Invoker;
