//! Method classification: call kinds, parameter descriptors and the
//! lazily built registry of method descriptors.

mod descriptor;
mod kind;
mod parameter;
mod registry;
mod types;

pub use descriptor::MethodDescriptor;
pub use kind::CallKind;
pub use parameter::{Binding, InjectedKind, ParameterDescriptor};
pub use registry::MethodRegistry;
pub use types::{FieldSpec, ParamType, RecordSchema};
