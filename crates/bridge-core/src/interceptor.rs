//! Meta-command interception
//!
//! Client tools send shortcuts (`\dt`, `DESC t`) that DuckDB does not accept.
//! The interceptor walks an ordered rule table and rewrites the first match
//! into backend-native SQL. Anything no rule claims goes to the backend as is.

use tracing::debug;

/// Outcome of intercepting one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Nothing to execute; answer with an `OK` completion
    Empty,
    /// A rule replaced the query text
    Rewrite { rule: &'static str, sql: String },
    /// Execute the (trimmed) query unchanged
    Passthrough(String),
}

impl Interception {
    /// SQL to send to the backend, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            Interception::Empty => None,
            Interception::Rewrite { sql, .. } | Interception::Passthrough(sql) => Some(sql),
        }
    }
}

/// One entry of the rule table.
///
/// `matches` sees the trimmed, upper-cased query. `rewrite` sees the trimmed
/// query with its original casing and may decline by returning `None`, in
/// which case the next rule is tried.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub rewrite: fn(&str) -> Option<Interception>,
}

/// Rules applied by [`Interceptor::new`], in order
pub const DEFAULT_RULES: &[RewriteRule] = &[
    RewriteRule {
        name: "empty",
        matches: |upper| upper.is_empty(),
        rewrite: |_| Some(Interception::Empty),
    },
    RewriteRule {
        name: "show-tables",
        matches: |upper| upper == "SHOW TABLES" || upper == "SHOW TABLES;",
        rewrite: |_| Some(show_tables("show-tables")),
    },
    RewriteRule {
        name: "psql-list-tables",
        // `\D` also covers `\DT`
        matches: |upper| upper.starts_with("\\D"),
        rewrite: |_| Some(show_tables("psql-list-tables")),
    },
    RewriteRule {
        name: "describe",
        matches: |upper| upper.starts_with("DESCRIBE ") || upper.starts_with("DESC "),
        rewrite: rewrite_describe,
    },
];

fn show_tables(rule: &'static str) -> Interception {
    Interception::Rewrite {
        rule,
        sql: "SHOW TABLES".to_string(),
    }
}

/// `DESC[RIBE] <table>[;]` becomes `DESCRIBE <table>`; declines without a table token
fn rewrite_describe(query: &str) -> Option<Interception> {
    let table = query.split_whitespace().nth(1)?.trim_end_matches(';');
    if table.is_empty() {
        return None;
    }
    Some(Interception::Rewrite {
        rule: "describe",
        sql: format!("DESCRIBE {}", table),
    })
}

/// Ordered rule table over incoming query text
#[derive(Debug, Clone)]
pub struct Interceptor {
    rules: Vec<RewriteRule>,
}

impl Interceptor {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    pub fn with_rules(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Decide what to execute for `query`
    pub fn intercept(&self, query: &str) -> Interception {
        let trimmed = query.trim();
        let upper = trimmed.to_uppercase();

        for rule in &self.rules {
            if !(rule.matches)(&upper) {
                continue;
            }
            if let Some(outcome) = (rule.rewrite)(trimmed) {
                if let Interception::Rewrite { sql, .. } = &outcome {
                    debug!("Rule '{}' rewrote query to: {}", rule.name, sql);
                }
                return outcome;
            }
            debug!("Rule '{}' declined query: {}", rule.name, trimmed);
        }

        Interception::Passthrough(trimmed.to_string())
    }
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new()
    }
}
