use std::fmt;

use serde::{Deserialize, Serialize};

/// How a method is reached and how its payload and result are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallKind {
    Simple,
    SimpleNamed,
    FormLoad,
    StoreRead,
    StoreModify,
    FormPost,
    FormPostJson,
    TreeLoad,
    Poll,
}

impl CallKind {
    /// Resolution order when a method carries more than one marker.
    pub const PRECEDENCE: [CallKind; 9] = [
        CallKind::Poll,
        CallKind::StoreModify,
        CallKind::StoreRead,
        CallKind::FormPost,
        CallKind::FormPostJson,
        CallKind::FormLoad,
        CallKind::TreeLoad,
        CallKind::SimpleNamed,
        CallKind::Simple,
    ];

    /// Pick the effective kind from a method's markers.
    ///
    /// Returns `None` for an unmarked method.
    pub fn from_markers(markers: &[CallKind]) -> Option<CallKind> {
        Self::PRECEDENCE
            .iter()
            .find(|kind| markers.contains(kind))
            .copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Simple => "SIMPLE",
            CallKind::SimpleNamed => "SIMPLE_NAMED",
            CallKind::FormLoad => "FORM_LOAD",
            CallKind::StoreRead => "STORE_READ",
            CallKind::StoreModify => "STORE_MODIFY",
            CallKind::FormPost => "FORM_POST",
            CallKind::FormPostJson => "FORM_POST_JSON",
            CallKind::TreeLoad => "TREE_LOAD",
            CallKind::Poll => "POLL",
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, CallKind::StoreRead | CallKind::StoreModify)
    }

    pub fn is_form_handler(&self) -> bool {
        matches!(self, CallKind::FormPost | CallKind::FormPostJson)
    }

    /// Kinds that may appear inside a JSON batch and honor the `batched` flag.
    pub fn is_batchable(&self) -> bool {
        !matches!(
            self,
            CallKind::FormPost | CallKind::FormPostJson | CallKind::Poll
        )
    }

    /// Kinds reachable through the JSON router entry point.
    pub fn is_routable(&self) -> bool {
        !matches!(self, CallKind::FormPost | CallKind::Poll)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
