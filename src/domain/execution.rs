use chrono::NaiveDateTime;
use serde::Serialize;

/// Result of one call to an execution service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    /// The statement as submitted by the caller (without any EXPLAIN prefix)
    pub statement: String,
    pub succeeded: bool,
    /// Round-trip time of the call in milliseconds
    pub elapsed_ms: f64,
    /// Result rows as text cells, present only when rows were requested
    pub rows: Option<Vec<Vec<String>>>,
    pub error_text: Option<String>,
    pub plan_text: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(statement: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            statement: statement.into(),
            succeeded: true,
            elapsed_ms,
            rows: None,
            error_text: None,
            plan_text: None,
        }
    }

    pub fn failure(
        statement: impl Into<String>,
        error_text: impl Into<String>,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            statement: statement.into(),
            succeeded: false,
            elapsed_ms,
            rows: None,
            error_text: Some(error_text.into()),
            plan_text: None,
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_plan(mut self, plan_text: impl Into<String>) -> Self {
        self.plan_text = Some(plan_text.into());
        self
    }

    /// Rows of a successful call, or an empty slice.
    pub fn rows_or_empty(&self) -> &[Vec<String>] {
        self.rows.as_deref().unwrap_or_default()
    }
}

/// A value bound to a `:name` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Timestamp(NaiveDateTime),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for SqlParam {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// Named bind parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindParams(Vec<(String, SqlParam)>);

impl BindParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlParam>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlParam> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlParam)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}
