//! Scripted gateway for tests.
//!
//! Replies are chosen by substring match against the submitted SQL, first
//! matching rule wins. Unmatched statements succeed with no rows. Every call is
//! recorded so tests can assert on the exact SQL issued.
//!
//! SQL submitted as read-only goes through [`ReadOnlyAnalyzer`] first, exactly
//! as in the real gateways, so statements the check refuses fail here too.

use crate::error::GatewayError;
use crate::{ReadOnlyAnalyzer, Row, SqlGateway};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// Canned reply for a matching statement.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    Error(GatewayError),
}

#[derive(Debug)]
struct Rule {
    needle: String,
    reply: Reply,
    remaining: Option<usize>,
}

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub query: String,
    pub read_only: bool,
}

/// In-memory [`SqlGateway`] driven by substring rules.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `needle` with `rows` (JSON objects).
    pub fn on(self, needle: &str, rows: Vec<Value>) -> Self {
        self.push(needle, Reply::Rows(to_rows(rows)), None)
    }

    /// Answer the next statement containing `needle` with `rows`, once.
    pub fn on_once(self, needle: &str, rows: Vec<Value>) -> Self {
        self.push(needle, Reply::Rows(to_rows(rows)), Some(1))
    }

    /// Fail statements containing `needle`.
    pub fn fail_on(self, needle: &str, err: GatewayError) -> Self {
        self.push(needle, Reply::Error(err), None)
    }

    fn push(self, needle: &str, reply: Reply, remaining: Option<usize>) -> Self {
        self.rules
            .lock()
            .expect("rules lock poisoned")
            .push(Rule {
                needle: needle.to_string(),
                reply,
                remaining,
            });
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// SQL text of all calls so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.query).collect()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }
}

fn to_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("scripted rows must be JSON objects, got {other}"),
        })
        .collect()
}

#[async_trait]
impl SqlGateway for ScriptedGateway {
    async fn execute(&self, query: &str, read_only: bool) -> Result<Vec<Row>, GatewayError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(RecordedCall {
                query: query.to_string(),
                read_only,
            });

        if read_only {
            ReadOnlyAnalyzer::new().ensure_read_only(query)?;
        }

        let mut rules = self.rules.lock().expect("rules lock poisoned");
        let Some(pos) = rules.iter().position(|r| {
            query.contains(&r.needle) && r.remaining.is_none_or(|n| n > 0)
        }) else {
            return Ok(Vec::new());
        };

        let rule = &mut rules[pos];
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        match &rule.reply {
            Reply::Rows(rows) => Ok(rows.clone()),
            Reply::Error(err) => Err(err.clone()),
        }
    }
}
