//! An in-memory [`Store`] for tests and dry runs.
//!
//! It understands the slice of SQL a bootstrap script typically contains:
//! `CREATE TABLE`, `CREATE [OR REPLACE] VIEW`, `CREATE [UNIQUE] INDEX`,
//! `DROP TABLE|VIEW [IF EXISTS] ... [CASCADE]`, `INSERT INTO ... VALUES`, and
//! simple `SELECT`s (`COUNT(*)`, `SELECT * ... LIMIT n`, literal selects).
//! Rows are not stored, only counted. Views and foreign keys are tracked as
//! dependencies so that drop ordering behaves like PostgreSQL.
//!
//! Clones share state: the store doubles as its own [`StoreConnector`], and
//! every connection it hands out sees the same tables.

use crate::error::StoreError;
use crate::row::{Row, Value};
use crate::{Store, StoreConnector};
use async_trait::async_trait;
use core_types::{ObjectKind, StoreErrorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const CATALOG_QUERY: &str = "information_schema.tables";
/// Needle matched by `fail_when` / `stall_when` for readiness checks.
const PING: &str = "ping";
const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, TableState>,
    /// View name -> relations it selects from.
    views: BTreeMap<String, BTreeSet<String>>,
    /// Index name -> indexed table.
    indexes: BTreeMap<String, String>,
    executed: Vec<String>,
    failures: Vec<(String, StoreError)>,
    stalls: Vec<(String, Duration)>,
    offline: bool,
    open_connections: usize,
}

#[derive(Debug, Default, Clone)]
struct TableState {
    rows: u64,
    /// Tables this one has foreign keys into.
    references: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table with `rows` rows.
    pub fn with_table(self, name: &str, rows: u64) -> Self {
        self.state().tables.insert(
            object_name(name),
            TableState {
                rows,
                references: BTreeSet::new(),
            },
        );
        self
    }

    /// Makes every execute or query whose SQL contains `needle`
    /// (case-insensitive) fail with `error`. The catalog listing matches
    /// `information_schema.tables` and the readiness check matches `ping`.
    pub fn fail_when(&self, needle: &str, error: StoreError) {
        self.state()
            .failures
            .push((needle.to_ascii_lowercase(), error));
    }

    /// Makes every execute or query whose SQL contains `needle` take `delay`.
    pub fn stall_when(&self, needle: &str, delay: Duration) {
        self.state()
            .stalls
            .push((needle.to_ascii_lowercase(), delay));
    }

    /// While offline, connecting and every call fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state().tables.keys().cloned().collect()
    }

    pub fn view_names(&self) -> Vec<String> {
        self.state().views.keys().cloned().collect()
    }

    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.state().tables.get(&object_name(table)).map(|t| t.rows)
    }

    /// Every statement submitted through `execute`, in order, failed ones included.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.state().open_connections
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies offline mode, failure injection and stalls for one call.
    async fn intercept(&self, sql: &str, record: bool) -> Result<(), StoreError> {
        let stall = {
            let mut state = self.state();
            if state.offline {
                return Err(StoreError::connection("connection refused"));
            }
            if record {
                state.executed.push(sql.to_string());
            }
            let lowered = sql.to_ascii_lowercase();
            if let Some((_, error)) = state
                .failures
                .iter()
                .find(|(needle, _)| lowered.contains(needle.as_str()))
            {
                return Err(error.clone());
            }
            state
                .stalls
                .iter()
                .find(|(needle, _)| lowered.contains(needle.as_str()))
                .map(|(_, delay)| *delay)
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        self.intercept(sql, true).await?;
        self.state().apply(sql)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, StoreError> {
        self.intercept(sql, false).await?;
        let mut state = self.state();
        let tokens = tokenize(sql);
        match tokens.first() {
            Some(first) if first.eq_ignore_ascii_case("SELECT") => state.select(&tokens),
            _ => state.apply(sql).map(|_| Vec::new()),
        }
    }

    async fn list_base_tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError> {
        self.intercept(CATALOG_QUERY, false).await?;
        if !schema.eq_ignore_ascii_case(DEFAULT_SCHEMA) {
            return Ok(Vec::new());
        }
        Ok(self.table_names())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.intercept(PING, false).await
    }

    async fn close(self) -> Result<(), StoreError> {
        let mut state = self.state();
        state.open_connections = state.open_connections.saturating_sub(1);
        Ok(())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore, StoreError> {
        let mut state = self.state();
        if state.offline {
            return Err(StoreError::connection("connection refused"));
        }
        state.open_connections += 1;
        Ok(self.clone())
    }
}

impl MemoryState {
    fn apply(&mut self, sql: &str) -> Result<u64, StoreError> {
        let tokens = tokenize(sql);
        let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
        let words: Vec<&str> = upper.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["CREATE", "TABLE", "IF", "NOT", "EXISTS", ..] => self.create_table(&tokens[5..], true),
            ["CREATE", "TABLE", ..] => self.create_table(&tokens[2..], false),
            ["CREATE", "OR", "REPLACE", "VIEW", ..] => self.create_view(&tokens[4..], true),
            ["CREATE", "VIEW", ..] => self.create_view(&tokens[2..], false),
            ["CREATE", "UNIQUE", "INDEX", ..] => self.create_index(&tokens[3..]),
            ["CREATE", "INDEX", ..] => self.create_index(&tokens[2..]),
            ["DROP", "TABLE", ..] => self.drop_relations(ObjectKind::Table, &tokens[2..]),
            ["DROP", "VIEW", ..] => self.drop_relations(ObjectKind::View, &tokens[2..]),
            ["INSERT", "INTO", ..] => self.insert(&tokens[2..]),
            ["SELECT", ..] => self.select(&tokens).map(|rows| rows.len() as u64),
            ["SET" | "BEGIN" | "COMMIT" | "COMMENT", ..] => Ok(0),
            _ => Err(syntax_error(sql)),
        }
    }

    fn relation_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.views.contains_key(name)
    }

    fn create_table(&mut self, rest: &[String], if_not_exists: bool) -> Result<u64, StoreError> {
        let name = first_name(rest)?;
        if self.relation_exists(&name) {
            return if if_not_exists {
                Ok(0)
            } else {
                Err(already_exists(&name))
            };
        }
        let references = names_after(rest, &["REFERENCES"]);
        self.tables.insert(
            name,
            TableState {
                rows: 0,
                references,
            },
        );
        Ok(0)
    }

    fn create_view(&mut self, rest: &[String], or_replace: bool) -> Result<u64, StoreError> {
        let name = first_name(rest)?;
        if self.tables.contains_key(&name) || (self.views.contains_key(&name) && !or_replace) {
            return Err(already_exists(&name));
        }
        let sources = names_after(rest, &["FROM", "JOIN"]);
        if let Some(missing) = sources.iter().find(|s| !self.relation_exists(s)) {
            return Err(StoreError::undefined_table(missing));
        }
        self.views.insert(name, sources);
        Ok(0)
    }

    fn create_index(&mut self, rest: &[String]) -> Result<u64, StoreError> {
        let (if_not_exists, rest) = strip_keywords(rest, &["IF", "NOT", "EXISTS"]);
        let on = rest
            .iter()
            .position(|t| t.eq_ignore_ascii_case("ON"))
            .ok_or_else(|| syntax_error("CREATE INDEX without ON"))?;
        let table = first_name(&rest[on + 1..])?;
        if !self.tables.contains_key(&table) {
            return Err(StoreError::undefined_table(&table));
        }
        let name = match on {
            0 => format!("{table}_idx{}", self.indexes.len()),
            _ => object_name(&rest[on - 1]),
        };
        if self.indexes.contains_key(&name) || self.relation_exists(&name) {
            return if if_not_exists {
                Ok(0)
            } else {
                Err(already_exists(&name))
            };
        }
        self.indexes.insert(name, table);
        Ok(0)
    }

    fn drop_relations(&mut self, kind: ObjectKind, rest: &[String]) -> Result<u64, StoreError> {
        let (if_exists, rest) = strip_keywords(rest, &["IF", "EXISTS"]);
        let cascade = rest.iter().any(|t| t.eq_ignore_ascii_case("CASCADE"));
        let names: Vec<String> = rest
            .iter()
            .filter(|t| !is_punctuation(t))
            .filter(|t| !t.eq_ignore_ascii_case("CASCADE") && !t.eq_ignore_ascii_case("RESTRICT"))
            .map(|t| object_name(t))
            .collect();
        if names.is_empty() {
            return Err(syntax_error("DROP without an object name"));
        }

        // The statement is all-or-nothing: check every name before dropping any.
        let mut present = Vec::new();
        for name in names {
            let is_kind = match kind {
                ObjectKind::Table => self.tables.contains_key(&name),
                ObjectKind::View => self.views.contains_key(&name),
            };
            if is_kind {
                present.push(name);
            } else if self.relation_exists(&name) {
                return Err(StoreError::new(
                    StoreErrorKind::Other,
                    format!("\"{name}\" is not a {kind}"),
                )
                .with_code("42809"));
            } else if !if_exists {
                return Err(StoreError::undefined_table(&name));
            }
        }
        for name in present {
            self.remove_relation(&name, cascade)?;
        }
        Ok(0)
    }

    fn remove_relation(&mut self, name: &str, cascade: bool) -> Result<(), StoreError> {
        let dependent_views: Vec<String> = self
            .views
            .iter()
            .filter(|(view, sources)| view.as_str() != name && sources.contains(name))
            .map(|(view, _)| view.clone())
            .collect();
        let dependent_tables: Vec<String> = self
            .tables
            .iter()
            .filter(|(table, state)| table.as_str() != name && state.references.contains(name))
            .map(|(table, _)| table.clone())
            .collect();

        if !cascade && (!dependent_views.is_empty() || !dependent_tables.is_empty()) {
            return Err(StoreError::new(
                StoreErrorKind::DependentObjectsStillExist,
                format!("cannot drop \"{name}\" because other objects depend on it"),
            )
            .with_code("2BP01"));
        }
        for view in dependent_views {
            self.remove_relation(&view, true)?;
        }
        for table in dependent_tables {
            if let Some(state) = self.tables.get_mut(&table) {
                state.references.remove(name);
            }
        }
        self.tables.remove(name);
        self.views.remove(name);
        self.indexes.retain(|_, table| table != name);
        Ok(())
    }

    fn insert(&mut self, rest: &[String]) -> Result<u64, StoreError> {
        let name = first_name(rest)?;
        if self.views.contains_key(&name) {
            return Err(StoreError::new(
                StoreErrorKind::Other,
                format!("cannot insert into view \"{name}\""),
            ));
        }
        let Some(table) = self.tables.get_mut(&name) else {
            return Err(StoreError::undefined_table(&name));
        };
        let rows = count_value_tuples(rest);
        table.rows += rows;
        Ok(rows)
    }

    fn select(&self, tokens: &[String]) -> Result<Vec<Row>, StoreError> {
        let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
        let words: Vec<&str> = upper.iter().map(String::as_str).collect();

        if let ["SELECT", "COUNT", "(", "*", ")", "FROM", ..] = words.as_slice() {
            let rows = self.relation_rows(&first_name(&tokens[6..])?)?;
            return Ok(vec![Row::new(vec![Value::Int(rows as i64)])]);
        }

        match words.iter().position(|w| *w == "FROM") {
            Some(from) => {
                let rows = self.relation_rows(&first_name(&tokens[from + 1..])?)?;
                let limit = words
                    .iter()
                    .position(|w| *w == "LIMIT")
                    .and_then(|at| tokens.get(at + 1))
                    .and_then(|n| n.parse::<u64>().ok())
                    .unwrap_or(u64::MAX);
                Ok((0..rows.min(limit)).map(|_| Row::default()).collect())
            }
            None => {
                let values = tokens
                    .iter()
                    .skip(1)
                    .filter(|t| !is_punctuation(t))
                    .map(|t| literal(t))
                    .collect();
                Ok(vec![Row::new(values)])
            }
        }
    }

    /// Row count of a table; views report zero rows.
    fn relation_rows(&self, name: &str) -> Result<u64, StoreError> {
        if let Some(table) = self.tables.get(name) {
            return Ok(table.rows);
        }
        if self.views.contains_key(name) {
            return Ok(0);
        }
        Err(StoreError::undefined_table(name))
    }
}

/// Splits SQL into words, quoted literals and single-character punctuation,
/// dropping `--` comments.
fn tokenize(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();

    fn flush(current: &mut String, tokens: &mut Vec<String>) {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                flush(&mut current, &mut tokens);
                let mut literal = String::from('\'');
                while let Some(c) = chars.next() {
                    literal.push(c);
                    if c == '\'' {
                        match chars.next_if_eq(&'\'') {
                            Some(escaped) => literal.push(escaped),
                            None => break,
                        }
                    }
                }
                tokens.push(literal);
            }
            '-' if chars.peek() == Some(&'-') => {
                flush(&mut current, &mut tokens);
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' | ')' | ',' | ';' => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn is_punctuation(token: &str) -> bool {
    matches!(token, "(" | ")" | "," | ";")
}

/// Normalises a possibly qualified, possibly quoted name to its bare lowercase form.
fn object_name(token: &str) -> String {
    let bare = token.rsplit('.').next().unwrap_or(token);
    bare.trim_matches('"').to_ascii_lowercase()
}

fn first_name(tokens: &[String]) -> Result<String, StoreError> {
    tokens
        .iter()
        .find(|t| !is_punctuation(t))
        .map(|t| object_name(t))
        .ok_or_else(|| syntax_error("missing object name"))
}

/// Names appearing right after any of `keywords`.
fn names_after(tokens: &[String], keywords: &[&str]) -> BTreeSet<String> {
    tokens
        .windows(2)
        .filter(|pair| keywords.iter().any(|k| pair[0].eq_ignore_ascii_case(k)))
        .filter(|pair| !is_punctuation(&pair[1]))
        .map(|pair| object_name(&pair[1]))
        .collect()
}

/// Strips a leading keyword sequence, reporting whether it was present.
fn strip_keywords<'a>(tokens: &'a [String], keywords: &[&str]) -> (bool, &'a [String]) {
    let matches = tokens.len() >= keywords.len()
        && tokens
            .iter()
            .zip(keywords)
            .all(|(token, keyword)| token.eq_ignore_ascii_case(keyword));
    if matches {
        (true, &tokens[keywords.len()..])
    } else {
        (false, tokens)
    }
}

/// Counts the top-level `( ... )` tuples following `VALUES`.
fn count_value_tuples(tokens: &[String]) -> u64 {
    let Some(start) = tokens.iter().position(|t| t.eq_ignore_ascii_case("VALUES")) else {
        return 0;
    };
    let mut rows = 0;
    let mut depth = 0usize;
    for token in &tokens[start + 1..] {
        match token.as_str() {
            "(" => {
                if depth == 0 {
                    rows += 1;
                }
                depth += 1;
            }
            ")" => depth = depth.saturating_sub(1),
            "," => {}
            _ if depth == 0 => break,
            _ => {}
        }
    }
    rows
}

fn literal(token: &str) -> Value {
    if let Ok(n) = token.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = token.parse::<f64>() {
        return Value::Float(f);
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return Value::Text(token[1..token.len() - 1].replace("''", "'"));
    }
    match token.to_ascii_uppercase().as_str() {
        "NULL" => Value::Null,
        "TRUE" => Value::Bool(true),
        "FALSE" => Value::Bool(false),
        _ => Value::Text(token.to_string()),
    }
}

fn already_exists(name: &str) -> StoreError {
    StoreError::new(
        StoreErrorKind::DuplicateTable,
        format!("relation \"{name}\" already exists"),
    )
    .with_code("42P07")
}

fn syntax_error(context: &str) -> StoreError {
    StoreError::new(
        StoreErrorKind::SyntaxError,
        format!("unsupported statement: {context}"),
    )
    .with_code("42601")
}
