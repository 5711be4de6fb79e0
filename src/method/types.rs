use std::fmt;
use std::sync::Arc;

/// Declared type of a handler parameter, used to coerce payload values.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// Accept any JSON value as-is.
    Any,
    String,
    Integer,
    Float,
    Boolean,
    /// Epoch milliseconds or an ISO-8601 date / date-time string.
    Date,
    /// Any JSON object.
    Object,
    List(Box<ParamType>),
    Record(Arc<RecordSchema>),
}

impl ParamType {
    pub fn list(element: ParamType) -> Self {
        ParamType::List(Box::new(element))
    }

    pub fn record(schema: RecordSchema) -> Self {
        ParamType::Record(Arc::new(schema))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ParamType::List(_))
    }

    /// Element type of a list, or `None` for scalars.
    pub fn element(&self) -> Option<&ParamType> {
        match self {
            ParamType::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => f.write_str("Any"),
            ParamType::String => f.write_str("String"),
            ParamType::Integer => f.write_str("Integer"),
            ParamType::Float => f.write_str("Float"),
            ParamType::Boolean => f.write_str("Boolean"),
            ParamType::Date => f.write_str("Date"),
            ParamType::Object => f.write_str("Object"),
            ParamType::List(inner) => write!(f, "List<{}>", inner),
            ParamType::Record(schema) => f.write_str(schema.name()),
        }
    }
}

/// Field of a `RecordSchema`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
}

/// Named set of typed fields, used for store records and form beans.
///
/// Fields not listed in the schema pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add an optional field.
    pub fn field(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            required: false,
        });
        self
    }

    /// Add a field that must be present and non-null.
    pub fn required(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}
