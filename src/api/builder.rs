use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::Codec;
use crate::config::RouterConfig;
use crate::error::{CodecError, RouterError};
use crate::method::{CallKind, MethodDescriptor, MethodRegistry};
use crate::transport::{OutgoingResponse, JSON_CONTENT_TYPE};

use super::cache::{ApiCache, ApiCacheKey};
use super::document::{ActionSummary, PollingProvider, RemotingApi};

/// Output flavour of a descriptor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFormat {
    /// JavaScript assigning the document to a namespaced variable.
    #[default]
    Script,
    /// The bare document, with a `descriptor` property naming the variable.
    Json,
}

/// Parameters of one descriptor request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub api_ns: Option<String>,
    pub action_ns: Option<String>,
    pub remoting_api_var: String,
    pub polling_urls_var: String,
    pub group: Option<String>,
    pub debug: bool,
    pub format: ApiFormat,
    pub router_url: String,
    pub poll_url: String,
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self {
            api_ns: Some("Ext.app".to_string()),
            action_ns: None,
            remoting_api_var: "REMOTING_API".to_string(),
            polling_urls_var: "POLLING_URLS".to_string(),
            group: None,
            debug: false,
            format: ApiFormat::Script,
            router_url: "/router".to_string(),
            poll_url: "/poll".to_string(),
        }
    }
}

impl ApiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request for the descriptor served at `path`. The router and poll
    /// URLs are its siblings: `/app/api-debug.js` gives `/app/router` and
    /// `/app/poll`, in debug mode.
    pub fn for_path(path: &str) -> Self {
        let (dir, file) = match path.rfind('/') {
            Some(i) => (&path[..i], &path[i + 1..]),
            None => ("", path),
        };
        Self {
            debug: file.contains("api-debug"),
            router_url: format!("{}/router", dir),
            poll_url: format!("{}/poll", dir),
            ..Self::default()
        }
    }

    /// `None` or a blank value leaves the API variable un-namespaced.
    pub fn with_api_ns(mut self, ns: Option<&str>) -> Self {
        self.api_ns = non_blank(ns);
        self
    }

    pub fn with_action_ns(mut self, ns: Option<&str>) -> Self {
        self.action_ns = non_blank(ns);
        self
    }

    pub fn with_remoting_api_var(mut self, var: impl Into<String>) -> Self {
        self.remoting_api_var = var.into();
        self
    }

    pub fn with_polling_urls_var(mut self, var: impl Into<String>) -> Self {
        self.polling_urls_var = var.into();
        self
    }

    /// Comma-separated group list; a blank value selects every method.
    pub fn with_group(mut self, group: Option<&str>) -> Self {
        self.group = non_blank(group);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_format(mut self, format: ApiFormat) -> Self {
        self.format = format;
        self
    }

    fn cache_key(&self) -> ApiCacheKey {
        ApiCacheKey {
            api_ns: self.api_ns.clone(),
            action_ns: self.action_ns.clone(),
            remoting_api_var: self.remoting_api_var.clone(),
            polling_urls_var: self.polling_urls_var.clone(),
            group: self.group.clone(),
            debug: self.debug,
            json: self.format == ApiFormat::Json,
            router_url: format!("{}|{}", self.router_url, self.poll_url),
        }
    }

    /// `apiNs.var`, or just `var` without a namespace.
    fn qualified(&self, var: &str) -> String {
        match &self.api_ns {
            Some(ns) => format!("{}.{}", ns, var),
            None => var.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds the client API descriptor from the catalog and caches each
/// rendering.
pub struct ApiDescriptorBuilder {
    registry: Arc<MethodRegistry>,
    config: Arc<RouterConfig>,
    codec: Arc<dyn Codec>,
    cache: ApiCache,
}

impl ApiDescriptorBuilder {
    pub(crate) fn new(registry: Arc<MethodRegistry>, config: Arc<RouterConfig>, codec: Arc<dyn Codec>) -> Self {
        let cache = ApiCache::new(config.api_cache_capacity);
        Self {
            registry,
            config,
            codec,
            cache,
        }
    }

    /// Rendered descriptor for `request`, served from the cache when an
    /// identical request was rendered before.
    pub fn build(&self, request: &ApiRequest) -> Result<Arc<str>, RouterError> {
        let key = request.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        debug!(group = ?request.group, debug = request.debug, "rendering api descriptor");
        let rendered: Arc<str> = Arc::from(self.render(request)?);
        Ok(self.cache.insert(key, rendered))
    }

    /// `build` wrapped into a response with the matching content type.
    pub fn respond(&self, request: &ApiRequest) -> Result<OutgoingResponse, RouterError> {
        let body = self.build(request)?;
        let content_type = match request.format {
            ApiFormat::Script => self.config.js_content_type.as_str(),
            ApiFormat::Json => JSON_CONTENT_TYPE,
        };
        Ok(OutgoingResponse::ok(content_type, body.as_bytes().to_vec()))
    }

    /// The descriptor document for the methods of `group`.
    pub fn document(&self, router_url: &str, action_ns: Option<&str>, group: Option<&str>) -> Result<RemotingApi, RouterError> {
        let mut api = RemotingApi::new(self.config.provider_type.as_str(), router_url, action_ns);
        api.timeout = self.config.timeout;
        api.max_retries = self.config.max_retries;
        api.enable_buffer = self.config.enable_buffer;
        api.buffer_limit = self.config.buffer_limit;

        for descriptor in self.registry.scan()? {
            if !in_group(group, descriptor.group()) {
                continue;
            }
            match summarize(&descriptor) {
                Some(summary) => api.add_action(descriptor.action(), summary),
                None => api.add_polling_provider(PollingProvider {
                    action: descriptor.action().to_string(),
                    method: descriptor.method().to_string(),
                    event: descriptor
                        .event_name()
                        .unwrap_or_else(|| descriptor.method())
                        .to_string(),
                }),
            }
        }
        Ok(api)
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    fn render(&self, request: &ApiRequest) -> Result<String, RouterError> {
        let mut api = self.document(
            &request.router_url,
            request.action_ns.as_deref(),
            request.group.as_deref(),
        )?;

        if request.format == ApiFormat::Json {
            api.descriptor = Some(request.qualified(&request.remoting_api_var));
            return self.encode(&to_json(&api)?, request.debug);
        }

        let mut parts = Vec::new();
        for ns in [&request.api_ns, &request.action_ns].into_iter().flatten() {
            parts.push(format!("Ext.ns('{}');", ns));
        }
        parts.push(format!(
            "{} = {};",
            request.qualified(&request.remoting_api_var),
            self.encode(&to_json(&api)?, request.debug)?
        ));
        if !api.polling_providers.is_empty() {
            parts.push(format!(
                "{} = {};",
                request.qualified(&request.polling_urls_var),
                self.encode(&polling_urls(&api.polling_providers, &request.poll_url), request.debug)?
            ));
        }

        let separator = if request.debug { "\n\n" } else { "" };
        Ok(parts.join(separator))
    }

    fn encode(&self, value: &Value, pretty: bool) -> Result<String, RouterError> {
        let bytes = if pretty {
            self.codec.encode_pretty(value)?
        } else {
            self.codec.encode(value)?
        };
        String::from_utf8(bytes).map_err(|e| CodecError::Encode(e.to_string()).into())
    }
}

/// Summary of a remoting method; `None` for polling providers.
fn summarize(descriptor: &MethodDescriptor) -> Option<ActionSummary> {
    let name = descriptor.method();
    let summary = match descriptor.kind() {
        CallKind::Poll => return None,
        CallKind::Simple => ActionSummary::positional(name, descriptor.payload_arity()),
        CallKind::SimpleNamed => ActionSummary::named(
            name,
            descriptor
                .payload_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        ),
        CallKind::FormLoad | CallKind::StoreRead | CallKind::StoreModify | CallKind::TreeLoad => {
            ActionSummary::positional(name, 1)
        }
        CallKind::FormPost | CallKind::FormPostJson => ActionSummary::form_handler(name),
    };
    if descriptor.kind().is_batchable() && !descriptor.batchable() {
        Some(summary.unbatched())
    } else {
        Some(summary)
    }
}

/// True when no group is requested or one requested token equals one of the
/// method's group tokens.
fn in_group(requested: Option<&str>, declared: Option<&str>) -> bool {
    let requested = match requested {
        Some(requested) => requested,
        None => return true,
    };
    let declared = match declared {
        Some(declared) => declared,
        None => return false,
    };
    requested
        .split(',')
        .any(|wanted| declared.split(',').any(|group| group == wanted))
}

/// Event name to poll URL.
fn polling_urls(providers: &[PollingProvider], base: &str) -> Value {
    let urls: Map<String, Value> = providers
        .iter()
        .map(|p| (p.event.clone(), Value::String(p.url(base))))
        .collect();
    Value::Object(urls)
}

fn to_json(api: &RemotingApi) -> Result<Value, RouterError> {
    serde_json::to_value(api).map_err(|e| CodecError::Encode(e.to_string()).into())
}
