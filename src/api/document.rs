use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EnableBuffer;

/// One method entry of an action in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_handler: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batched: Option<bool>,
}

impl ActionSummary {
    pub fn positional(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len: Some(len),
            params: None,
            form_handler: None,
            batched: None,
        }
    }

    pub fn named(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            len: None,
            params: Some(params),
            form_handler: None,
            batched: None,
        }
    }

    pub fn form_handler(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            len: Some(0),
            params: None,
            form_handler: Some(true),
            batched: None,
        }
    }

    pub fn unbatched(mut self) -> Self {
        self.batched = Some(false);
        self
    }
}

/// A method the client calls on a timer, announced through the polling
/// URL map rather than the remoting document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingProvider {
    pub action: String,
    pub method: String,
    pub event: String,
}

impl PollingProvider {
    pub fn url(&self, base: &str) -> String {
        format!("{}/{}/{}/{}", base, self.action, self.method, self.event)
    }
}

/// The remoting API document handed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotingApi {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub actions: BTreeMap<String, Vec<ActionSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_buffer: Option<EnableBuffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(skip)]
    pub polling_providers: Vec<PollingProvider>,
}

impl RemotingApi {
    pub fn new(provider_type: impl Into<String>, url: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            provider_type: provider_type.into(),
            url: url.into(),
            namespace: namespace
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            actions: BTreeMap::new(),
            timeout: None,
            max_retries: None,
            enable_buffer: None,
            buffer_limit: None,
            descriptor: None,
            polling_providers: Vec::new(),
        }
    }

    pub fn add_action(&mut self, action: &str, summary: ActionSummary) {
        self.actions.entry(action.to_string()).or_default().push(summary);
    }

    pub fn add_polling_provider(&mut self, provider: PollingProvider) {
        self.polling_providers.push(provider);
    }
}
