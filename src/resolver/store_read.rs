//! Structured read request of STORE_READ calls: paging, sorting, grouping
//! and filtering, parsed out of the first payload map.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ResolutionError;
use crate::method::ParamType;

use super::coerce::coerce;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    /// Parse `ASC` / `DESC`, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(SortDirection::Ascending),
            "DESC" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortInfo {
    pub property: String,
    pub direction: Option<SortDirection>,
}

impl SortInfo {
    fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let property = map.get("property")?.as_str()?.to_string();
        let direction = map
            .get("direction")
            .and_then(Value::as_str)
            .and_then(SortDirection::parse);
        Some(Self {
            property,
            direction,
        })
    }
}

/// Grouping has the same shape as sorting.
pub type GroupInfo = SortInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Gt,
    Eq,
    Lte,
    Gte,
    Ne,
    In,
    Like,
}

impl Comparison {
    /// Parse a comparison name (`lt`, `gte`, ...) or operator (`<`, `>=`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lt" | "<" => Some(Comparison::Lt),
            "gt" | ">" => Some(Comparison::Gt),
            "eq" | "=" | "==" => Some(Comparison::Eq),
            "lte" | "<=" => Some(Comparison::Lte),
            "gte" | ">=" => Some(Comparison::Gte),
            "ne" | "!=" => Some(Comparison::Ne),
            "in" => Some(Comparison::In),
            "like" => Some(Comparison::Like),
            _ => None,
        }
    }
}

/// One filter of a grid or store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Numeric {
        field: String,
        value: serde_json::Number,
        comparison: Option<Comparison>,
    },
    String {
        field: String,
        value: String,
    },
    Date {
        field: String,
        value: String,
        comparison: Option<Comparison>,
    },
    List {
        field: String,
        values: Vec<String>,
    },
    Boolean {
        field: String,
        value: bool,
    },
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Numeric { field, .. }
            | Filter::String { field, .. }
            | Filter::Date { field, .. }
            | Filter::List { field, .. }
            | Filter::Boolean { field, .. } => field,
        }
    }

    /// Build a filter from its JSON form.
    ///
    /// Untyped `{property, value}` filters pick their variant from the value.
    /// Unknown types and malformed entries yield `None`.
    pub fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let value = map.get("value");
        let Some(kind) = map.get("type").and_then(Value::as_str) else {
            let property = map.get("property")?.as_str()?.to_string();
            return match value? {
                Value::Number(n) => Some(Filter::Numeric {
                    field: property,
                    value: n.clone(),
                    comparison: None,
                }),
                Value::Bool(b) => Some(Filter::Boolean {
                    field: property,
                    value: *b,
                }),
                Value::String(s) => Some(Filter::String {
                    field: property,
                    value: s.clone(),
                }),
                other => Some(Filter::String {
                    field: property,
                    value: other.to_string(),
                }),
            };
        };

        let field = map.get("field").and_then(Value::as_str)?.to_string();
        let comparison = map
            .get("comparison")
            .and_then(Value::as_str)
            .and_then(Comparison::parse);
        match kind {
            "numeric" => match coerce(value?, &ParamType::Float).ok()? {
                Value::Number(n) => Some(Filter::Numeric {
                    field,
                    value: n,
                    comparison,
                }),
                _ => None,
            },
            "string" => Some(Filter::String {
                field,
                value: value?.as_str()?.to_string(),
            }),
            "date" => Some(Filter::Date {
                field,
                value: value?.as_str()?.to_string(),
                comparison,
            }),
            "list" => {
                let values = match value? {
                    Value::String(s) => s.split(',').map(str::to_string).collect(),
                    Value::Array(items) => items
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    _ => return None,
                };
                Some(Filter::List { field, values })
            }
            "boolean" => match coerce(value?, &ParamType::Boolean).ok()? {
                Value::Bool(b) => Some(Filter::Boolean { field, value: b }),
                _ => None,
            },
            other => {
                debug!(filter_type = other, "ignoring filter of unknown type");
                None
            }
        }
    }
}

/// Paging, sorting, grouping and filtering of a STORE_READ call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReadRequest {
    pub query: Option<String>,
    pub limit: Option<i64>,
    pub start: Option<i64>,
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub group_by: Option<String>,
    pub group_dir: Option<String>,
    pub sorters: Vec<SortInfo>,
    pub groups: Vec<GroupInfo>,
    pub filters: Vec<Filter>,
    /// Keys of the payload map not consumed above.
    pub params: Map<String, Value>,
}

impl StoreReadRequest {
    /// Parse a read request out of `map`.
    ///
    /// Known keys fill the structured fields; every other key ends up in
    /// `params`, which is also returned for named parameter binding.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ResolutionError> {
        let mut request = StoreReadRequest::default();
        for (key, value) in map {
            match key.as_str() {
                "filter" => request.filters = parse_filters(value)?,
                "sort" if value.is_array() => request.sorters = parse_sorters(value),
                "group" if value.is_array() => request.groups = parse_sorters(value),
                "query" => request.query = string_field(key, value)?,
                "sort" => request.sort = string_field(key, value)?,
                "dir" => request.dir = string_field(key, value)?,
                "groupBy" => request.group_by = string_field(key, value)?,
                "groupDir" => request.group_dir = string_field(key, value)?,
                "limit" => request.limit = integer_field(key, value)?,
                "start" => request.start = integer_field(key, value)?,
                "page" => request.page = integer_field(key, value)?,
                _ => {
                    request.params.insert(key.clone(), value.clone());
                }
            }
        }

        if let Some(limit) = request.limit.filter(|l| *l > 0) {
            match (request.page, request.start) {
                (Some(page), None) => {
                    let start = page
                        .checked_sub(1)
                        .and_then(|pages| pages.checked_mul(limit))
                        .ok_or_else(|| out_of_range("page", page))?;
                    request.start = Some(start);
                }
                (None, Some(start)) => {
                    let page = (start / limit)
                        .checked_add(1)
                        .ok_or_else(|| out_of_range("start", start))?;
                    request.page = Some(page);
                }
                _ => {}
            }
        }

        if let (Some(sort), Some(dir)) = (&request.sort, &request.dir) {
            request.sorters = vec![SortInfo {
                property: sort.clone(),
                direction: SortDirection::parse(dir),
            }];
        }
        if let (Some(group_by), Some(group_dir)) = (&request.group_by, &request.group_dir) {
            request.groups = vec![GroupInfo {
                property: group_by.clone(),
                direction: SortDirection::parse(group_dir),
            }];
        }

        Ok(request)
    }

    /// First filter on `field`.
    pub fn first_filter_for(&self, field: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.field() == field)
    }

    pub fn filters_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Filter> + 'a {
        self.filters.iter().filter(move |f| f.field() == field)
    }

    pub fn is_ascending_sort(&self) -> bool {
        self.dir
            .as_deref()
            .and_then(SortDirection::parse)
            .map_or(false, |d| d == SortDirection::Ascending)
    }

    pub fn is_descending_sort(&self) -> bool {
        self.dir
            .as_deref()
            .and_then(SortDirection::parse)
            .map_or(false, |d| d == SortDirection::Descending)
    }
}

fn string_field(key: &str, value: &Value) -> Result<Option<String>, ResolutionError> {
    match coerce(value, &ParamType::String) {
        Ok(Value::String(s)) => Ok(Some(s)),
        Ok(_) => Ok(None),
        Err(detail) => Err(ResolutionError::InvalidValue {
            name: key.to_string(),
            detail,
        }),
    }
}

fn integer_field(key: &str, value: &Value) -> Result<Option<i64>, ResolutionError> {
    match coerce(value, &ParamType::Integer) {
        Ok(v) => Ok(v.as_i64()),
        Err(detail) => Err(ResolutionError::InvalidValue {
            name: key.to_string(),
            detail,
        }),
    }
}

fn out_of_range(key: &str, value: i64) -> ResolutionError {
    ResolutionError::InvalidValue {
        name: key.to_string(),
        detail: format!("paging overflows with {} = {}", key, value),
    }
}

fn parse_sorters(value: &Value) -> Vec<SortInfo> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(SortInfo::from_map)
                .collect()
        })
        .unwrap_or_default()
}

/// Filters arrive as a list or as a JSON-encoded string of a list.
fn parse_filters(value: &Value) -> Result<Vec<Filter>, ResolutionError> {
    let decoded;
    let list = match value {
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw).map_err(|e| {
                ResolutionError::InvalidValue {
                    name: "filter".to_string(),
                    detail: e.to_string(),
                }
            })?;
            &decoded
        }
        other => other,
    };
    Ok(list
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(Filter::from_map)
                .collect()
        })
        .unwrap_or_default())
}
