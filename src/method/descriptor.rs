use tracing::{error, warn};

use crate::catalog::{MethodDefinition, ReturnShape};
use crate::error::RouterError;

use super::kind::CallKind;
use super::parameter::{Binding, ParameterDescriptor};
use super::types::ParamType;

/// Classified view of a registered method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    action: String,
    method: String,
    kind: CallKind,
    parameters: Vec<ParameterDescriptor>,
    collection_element_type: Option<ParamType>,
    synchronize_on_session: bool,
    stream_response: bool,
    batchable: bool,
    event_name: Option<String>,
    group: Option<String>,
    returns: ReturnShape,
}

impl MethodDescriptor {
    /// Classify a method definition.
    ///
    /// Fails with `MethodNotExposed` when the method carries no marker or
    /// breaks its kind's validity rule.
    pub fn classify(action: &str, def: &MethodDefinition) -> Result<Self, RouterError> {
        let not_exposed = || RouterError::MethodNotExposed {
            action: action.to_string(),
            method: def.name().to_string(),
        };
        let kind = CallKind::from_markers(def.markers()).ok_or_else(not_exposed)?;
        let qualified = format!("{}.{}", action, def.name());
        let ignored: Vec<String> = def
            .markers()
            .iter()
            .filter(|marker| **marker != kind)
            .map(ToString::to_string)
            .collect();
        if !ignored.is_empty() {
            warn!(method = %qualified, kind = %kind, ignored = ?ignored, "extra call-kind markers are ignored");
        }
        if let Err(reason) = validate(&qualified, kind, def) {
            error!(method = %qualified, kind = %kind, "invalid method: {}", reason);
            return Err(not_exposed());
        }

        let collection_element_type = if kind == CallKind::StoreModify {
            def.entry().cloned().or_else(|| {
                def.parameters()
                    .iter()
                    .find(|p| *p.binding() == Binding::Records)
                    .and_then(|p| p.ty().element().cloned())
            })
        } else {
            None
        };

        let event_name = if kind == CallKind::Poll {
            Some(
                def.event_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| def.name().to_string()),
            )
        } else {
            None
        };

        let group = def
            .group_name()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        Ok(Self {
            action: action.to_string(),
            method: def.name().to_string(),
            kind,
            parameters: def.parameters().to_vec(),
            collection_element_type,
            synchronize_on_session: def.is_synchronized(),
            stream_response: def.is_streamed(),
            batchable: def.is_batched(),
            event_name,
            group,
            returns: def.return_shape(),
        })
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// `action.method`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.action, self.method)
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn collection_element_type(&self) -> Option<&ParamType> {
        self.collection_element_type.as_ref()
    }

    pub fn synchronize_on_session(&self) -> bool {
        self.synchronize_on_session
    }

    pub fn stream_response(&self) -> bool {
        self.stream_response
    }

    pub fn batchable(&self) -> bool {
        self.batchable
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    /// Number of parameters the client supplies through the payload.
    pub fn payload_arity(&self) -> usize {
        self.parameters.iter().filter(|p| p.is_payload()).count()
    }

    /// Names of payload parameters, in declaration order.
    pub fn payload_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.is_payload())
            .map(|p| p.name())
            .collect()
    }
}

/// Kind-specific validity rule. Ignored attributes only warn.
fn validate(qualified: &str, kind: CallKind, def: &MethodDefinition) -> Result<(), String> {
    if def.event_name().is_some() && kind != CallKind::Poll {
        warn!(method = %qualified, kind = %kind, "event name is ignored for this kind");
    }
    if def.entry().is_some() && kind != CallKind::StoreModify {
        warn!(method = %qualified, kind = %kind, "entry type is ignored for this kind");
    }
    if !def.is_batched() && !kind.is_batchable() {
        warn!(method = %qualified, kind = %kind, "batched flag is ignored for this kind");
    }
    if kind == CallKind::FormPost && (def.is_synchronized() || def.is_streamed()) {
        warn!(method = %qualified, "session synchronization and streaming are ignored for FORM_POST");
    }

    for param in def.parameters() {
        let allowed = match param.binding() {
            Binding::RequestParam => kind != CallKind::Simple,
            Binding::StoreRead => kind == CallKind::StoreRead,
            Binding::Records => kind == CallKind::StoreModify,
            Binding::Form | Binding::BindingErrors => kind.is_form_handler(),
            Binding::Upload => kind == CallKind::FormPost,
            Binding::Payload | Binding::Header | Binding::Injected(_) => true,
        };
        if !allowed {
            return Err(format!(
                "parameter '{}' uses a binding not supported by {}",
                param.name(),
                kind
            ));
        }
    }

    if kind == CallKind::FormPost
        && !matches!(
            def.return_shape(),
            ReturnShape::Unit | ReturnShape::FormPostResult
        )
    {
        return Err("FORM_POST methods must return nothing or a FormPostResult".to_string());
    }

    Ok(())
}
