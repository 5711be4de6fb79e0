pub mod api;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod context;
mod error;
pub mod lock;
pub mod method;
mod remoting;
pub mod resolver;
pub mod router;
pub mod session;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use api::{ApiDescriptorBuilder, ApiFormat, ApiRequest, RemotingApi};
pub use catalog::{HandlerCatalog, HandlerDefinition, InMemoryCatalog, MethodDefinition, ReturnShape};
pub use codec::{Codec, JsonCodec};
pub use config::{EnableBuffer, ExecutionPolicy, RouterConfig};
pub use context::{Argument, Arguments, CallContext, Injected, ResponseHandle};
pub use error::{
    CatalogError, CodecError, ConfigError, HandlerError, ResolutionError, RouterError,
};
pub use method::{CallKind, MethodDescriptor, MethodRegistry, ParamType, ParameterDescriptor, RecordSchema};
pub use remoting::Remoting;
pub use resolver::{BindingErrors, ParameterResolver, StoreReadRequest};
pub use router::{
    CallEnvelope, FormLoadResult, FormPostResult, PollDispatcher, PollResponse, RequestRouter,
    ResponseEnvelope, StoreResult,
};
pub use session::{Session, SessionStore};
pub use transport::{IncomingCall, OutgoingResponse, RequestInfo, UploadedFile};
