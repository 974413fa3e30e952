//! Event query expressions.
//!
//! A query is a conjunction of `key operator 'value'` clauses joined by
//! ` AND `:
//!
//! ```text
//! action = 'respond_service' AND consumer = 'ab12..' AND tm.event = 'Tx'
//! ```
//!
//! Values are always single-quoted. There is no `OR`, no nesting and no
//! parentheses. [`EventQueryBuilder`] renders expressions; [`EventQuery`]
//! parses and evaluates them (used by in-memory transports).

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RpcError};

/// Key carrying the event class of every event.
pub const EVENT_KEY: &str = "tm.event";
/// Key carrying the operation action of a transaction.
pub const ACTION_KEY: &str = "action";
/// Transfer tags of a transaction.
pub const SENDER_KEY: &str = "sender";
pub const RECIPIENT_KEY: &str = "recipient";

pub const EVENT_NEW_BLOCK: &str = "NewBlock";
pub const EVENT_TX: &str = "Tx";
pub const EVENT_NEW_BLOCK_HEADER: &str = "NewBlockHeader";
pub const EVENT_VALIDATOR_SET_UPDATES: &str = "ValidatorSetUpdates";

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Contains => "CONTAINS",
        }
    }

    fn holds(&self, actual: &str, expected: &str) -> bool {
        match self {
            Operator::Eq => actual == expected,
            Operator::Contains => actual.contains(expected),
            Operator::Lt | Operator::Gt | Operator::Lte | Operator::Gte => {
                let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) else {
                    return false;
                };
                match self {
                    Operator::Lt => a < b,
                    Operator::Gt => a > b,
                    Operator::Lte => a <= b,
                    _ => a >= b,
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            ">=" => Ok(Operator::Gte),
            "CONTAINS" => Ok(Operator::Contains),
            other => Err(RpcError::InvalidQuery(format!("unknown operator {other:?}"))),
        }
    }
}

/// A single `key operator 'value'` clause.
///
/// A condition missing its key, operator or value renders as nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    key: String,
    op: Option<Operator>,
    value: String,
}

impl Condition {
    /// Start a condition on `key`; complete it with an operator method.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: None,
            value: String::new(),
        }
    }

    pub fn new(key: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: Some(op),
            value: value.into(),
        }
    }

    fn with(mut self, op: Operator, value: impl Into<String>) -> Self {
        self.op = Some(op);
        self.value = value.into();
        self
    }

    pub fn eq(self, value: impl Into<String>) -> Self {
        self.with(Operator::Eq, value)
    }

    pub fn lt(self, value: impl Into<String>) -> Self {
        self.with(Operator::Lt, value)
    }

    pub fn gt(self, value: impl Into<String>) -> Self {
        self.with(Operator::Gt, value)
    }

    pub fn lte(self, value: impl Into<String>) -> Self {
        self.with(Operator::Lte, value)
    }

    pub fn gte(self, value: impl Into<String>) -> Self {
        self.with(Operator::Gte, value)
    }

    pub fn contains(self, value: impl Into<String>) -> Self {
        self.with(Operator::Contains, value)
    }

    /// Check whether this condition contributes nothing.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() || self.op.is_none() || self.value.is_empty()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Some(op) if !self.is_empty() => write!(f, "{} {} '{}'", self.key, op, self.value),
            _ => Ok(()),
        }
    }
}

/// Builder for event query expressions.
///
/// Conditions render in insertion order. Empty conditions are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueryBuilder {
    conditions: Vec<Condition>,
}

impl EventQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Render the expression. No non-empty conditions renders `""`.
    pub fn build(&self) -> String {
        self.conditions
            .iter()
            .filter(|c| !c.is_empty())
            .map(Condition::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// A parsed event query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    clauses: Vec<(String, Operator, String)>,
}

impl EventQuery {
    /// Parse an expression produced by [`EventQueryBuilder::build`].
    ///
    /// The empty expression parses to a query matching every event.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut clauses = Vec::new();
        let mut rest = expr.trim_start();

        while !rest.is_empty() {
            if !clauses.is_empty() {
                rest = rest
                    .strip_prefix("AND")
                    .filter(|r| r.starts_with(char::is_whitespace))
                    .ok_or_else(|| invalid(rest, "expected AND"))?
                    .trim_start();
            }

            let key_end = rest
                .find(|c: char| c.is_whitespace() || "<>=".contains(c))
                .unwrap_or(rest.len());
            let key = &rest[..key_end];
            if key.is_empty() || key.contains(&['(', ')', '\''][..]) {
                return Err(invalid(rest, "expected key"));
            }
            rest = rest[key_end..].trim_start();

            let op_end = rest
                .find(|c: char| c.is_whitespace() || c == '\'')
                .unwrap_or(rest.len());
            let op: Operator = rest[..op_end].parse()?;
            rest = rest[op_end..].trim_start();

            let quoted = rest
                .strip_prefix('\'')
                .ok_or_else(|| invalid(rest, "expected quoted value"))?;
            let close = quoted
                .find('\'')
                .ok_or_else(|| invalid(rest, "unterminated value"))?;
            clauses.push((key.to_string(), op, quoted[..close].to_string()));
            rest = quoted[close + 1..].trim_start();
        }

        Ok(Self { clauses })
    }

    /// Evaluate against an event's attributes.
    ///
    /// Every clause must be satisfied by at least one attribute with its key.
    pub fn matches<'a, I>(&self, attributes: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let attributes: Vec<(&str, &str)> = attributes.into_iter().collect();
        self.clauses.iter().all(|(key, op, expected)| {
            attributes
                .iter()
                .any(|(k, actual)| k == key && op.holds(actual, expected))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl FromStr for EventQuery {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn invalid(at: &str, what: &str) -> RpcError {
    RpcError::InvalidQuery(format!("{what} at {at:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_filter_composition() {
        let query = EventQueryBuilder::new()
            .add_condition(Condition::key("action").eq("respond_service"))
            .add_condition(Condition::key("consumer").eq("addr1"))
            .build();
        assert_eq!(query, "action = 'respond_service' AND consumer = 'addr1'");
    }

    #[test]
    fn test_transfer_filter_round_trips_through_parser() {
        let query = EventQueryBuilder::new()
            .add_condition(Condition::key(ACTION_KEY).eq("send"))
            .add_condition(Condition::key(SENDER_KEY).eq("alice"))
            .add_condition(Condition::key(RECIPIENT_KEY).eq("bob"))
            .build();
        assert_eq!(query, "action = 'send' AND sender = 'alice' AND recipient = 'bob'");

        let parsed = EventQuery::parse(&query).unwrap();
        assert!(parsed.matches([("action", "send"), ("sender", "alice"), ("recipient", "bob")]));
        assert!(!parsed.matches([("action", "send"), ("sender", "bob"), ("recipient", "alice")]));
    }

    #[test]
    fn test_empty_condition_dropped() {
        let query = EventQueryBuilder::new()
            .add_condition(Condition::key("action").eq("respond_service"))
            .add_condition(Condition::key("consumer").eq(""))
            .add_condition(Condition::key("provider"))
            .add_condition(Condition::key("").eq("x"))
            .build();
        assert_eq!(query, "action = 'respond_service'");
    }

    #[test]
    fn test_no_conditions_builds_empty() {
        assert_eq!(EventQueryBuilder::new().build(), "");
        let only_empty = EventQueryBuilder::new().add_condition(Condition::key("k"));
        assert_eq!(only_empty.build(), "");
    }

    #[test]
    fn test_all_operators_render() {
        let query = EventQueryBuilder::new()
            .add_condition(Condition::key("a").lt("1"))
            .add_condition(Condition::key("b").gt("2"))
            .add_condition(Condition::key("c").lte("3"))
            .add_condition(Condition::key("d").gte("4"))
            .add_condition(Condition::key("e").contains("x"))
            .build();
        assert_eq!(
            query,
            "a < '1' AND b > '2' AND c <= '3' AND d >= '4' AND e CONTAINS 'x'"
        );
    }

    #[test]
    fn test_parse_and_match() {
        let query = EventQuery::parse("tm.event = 'Tx' AND height >= '10' AND memo CONTAINS 'hi'")
            .unwrap();

        assert!(query.matches([("tm.event", "Tx"), ("height", "12"), ("memo", "ohio")]));
        assert!(!query.matches([("tm.event", "Tx"), ("height", "9"), ("memo", "hi")]));
        assert!(!query.matches([("tm.event", "NewBlock"), ("height", "12"), ("memo", "hi")]));
        assert!(!query.matches([("tm.event", "Tx"), ("memo", "hi")]));
    }

    #[test]
    fn test_parse_value_with_spaces_and_and() {
        let query = EventQuery::parse("memo = 'a AND b' AND x = 'y'").unwrap();
        assert!(query.matches([("memo", "a AND b"), ("x", "y")]));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = EventQuery::parse("").unwrap();
        assert!(query.is_empty());
        assert!(query.matches([("tm.event", "Tx")]));
    }

    #[test]
    fn test_parse_rejects_unsupported_grammar() {
        assert!(EventQuery::parse("a = 'x' OR b = 'y'").is_err());
        assert!(EventQuery::parse("(a = 'x')").is_err());
        assert!(EventQuery::parse("a != 'x'").is_err());
        assert!(EventQuery::parse("a = x").is_err());
        assert!(EventQuery::parse("a = 'x").is_err());
        assert!(EventQuery::parse("a = 'x' AND").is_err());
    }

    proptest! {
        #[test]
        fn prop_built_query_parses_and_matches(
            pairs in prop::collection::vec(("[a-z][a-z.]{0,8}", "[a-zA-Z0-9 _-]{1,12}"), 0..5)
        ) {
            let builder = pairs.iter().fold(EventQueryBuilder::new(), |b, (k, v)| {
                b.add_condition(Condition::key(k.clone()).eq(v.clone()))
            });
            let query = EventQuery::parse(&builder.build()).unwrap();
            let attrs: Vec<(&str, &str)> =
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            prop_assert!(query.matches(attrs));
        }
    }
}
