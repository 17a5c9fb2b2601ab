//! Running compiled statements through a driver cursor.
//!
//! The driver is reached only through the [`Cursor`] trait. A dialect's
//! [`ExecutionContext`] wraps each execution: it may add statements before
//! the compiled SQL, fetch generated ids afterwards and undo session state
//! it changed. [`execute`] always runs the context's `restore` step, whether
//! execution succeeded or not.

use tracing::{debug, warn};

use crate::compiled::{CompiledStatement, Params};
use crate::dialect::Dialect;
use crate::error::{DriverError, Result, SqlError};
use crate::value::SqlValue;

/// A row as returned by the driver.
pub type Row = Vec<SqlValue>;

/// The driver boundary.
pub trait Cursor {
    /// Executes `sql` with positional `params` and returns any result rows.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<Vec<Row>, DriverError>;

    /// Sets the statement timeout in seconds.
    fn set_timeout(&mut self, _seconds: Option<u64>) {}
}

/// What to send to the driver for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Statements run before `sql`, without parameters.
    pub preamble: Vec<String>,
    /// The SQL to run.
    pub sql: String,
    /// Positional parameter values.
    pub params: Vec<SqlValue>,
    /// `sql` ends with a query that returns the generated id.
    pub postfetch_in_batch: bool,
    /// Statement timeout in seconds.
    pub timeout: Option<u64>,
}

impl ExecutionPlan {
    /// Creates a plan that runs the compiled SQL as-is.
    #[must_use]
    pub fn plain(compiled: &CompiledStatement, bound: &[(String, SqlValue)]) -> Self {
        Self {
            preamble: vec![],
            sql: compiled.sql.clone(),
            params: compiled.positional_values(bound),
            postfetch_in_batch: false,
            timeout: None,
        }
    }
}

/// Per-execution hooks supplied by a dialect.
pub trait ExecutionContext {
    /// Prepares the plan for one execution from the bound parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be executed as bound.
    fn pre_exec(
        &mut self,
        compiled: &CompiledStatement,
        bound: &[(String, SqlValue)],
    ) -> Result<ExecutionPlan>;

    /// Runs after the statement and returns the ids generated by an INSERT,
    /// if any are known.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching the ids fails.
    fn post_exec(
        &mut self,
        compiled: &CompiledStatement,
        plan: &ExecutionPlan,
        rows: &[Row],
        cursor: &mut dyn Cursor,
    ) -> Result<Option<Vec<SqlValue>>>;

    /// Undoes session state changed by `pre_exec`. Runs on every exit path
    /// and must not fail; errors are logged.
    fn restore(&mut self, cursor: &mut dyn Cursor);
}

/// Returns the first value of the first row.
#[must_use]
pub fn first_value(rows: &[Row]) -> Option<SqlValue> {
    rows.first().and_then(|row| row.first()).cloned()
}

/// Runs `query` and returns its first value, for last-id fetches.
///
/// # Errors
///
/// Returns the driver's error.
pub fn fetch_scalar(cursor: &mut dyn Cursor, query: &str) -> Result<Option<SqlValue>> {
    debug!(sql = query, "fetching generated id");
    let rows = cursor.execute(query, &[]).map_err(SqlError::Driver)?;
    Ok(first_value(&rows))
}

/// Logs a failed cleanup statement.
pub fn log_cleanup_failure(sql: &str, error: &DriverError) {
    warn!(sql, error = %error, "cleanup statement failed; continuing");
}

/// The context used by dialects without session state to manage.
#[derive(Debug, Clone, Default)]
pub struct DefaultExecutionContext {
    lastrowid_query: Option<String>,
    timeout: Option<u64>,
}

impl DefaultExecutionContext {
    /// Creates a context that fetches generated ids with `lastrowid_query`.
    #[must_use]
    pub const fn new(lastrowid_query: Option<String>, timeout: Option<u64>) -> Self {
        Self {
            lastrowid_query,
            timeout,
        }
    }
}

impl ExecutionContext for DefaultExecutionContext {
    fn pre_exec(
        &mut self,
        compiled: &CompiledStatement,
        bound: &[(String, SqlValue)],
    ) -> Result<ExecutionPlan> {
        Ok(ExecutionPlan {
            timeout: self.timeout,
            ..ExecutionPlan::plain(compiled, bound)
        })
    }

    fn post_exec(
        &mut self,
        compiled: &CompiledStatement,
        _plan: &ExecutionPlan,
        _rows: &[Row],
        cursor: &mut dyn Cursor,
    ) -> Result<Option<Vec<SqlValue>>> {
        let wants_id = compiled
            .insert
            .as_ref()
            .is_some_and(|info| info.postfetch_lastrowid);
        match (&self.lastrowid_query, wants_id) {
            (Some(query), true) => Ok(fetch_scalar(cursor, query)?.map(|v| vec![v])),
            _ => Ok(None),
        }
    }

    fn restore(&mut self, _cursor: &mut dyn Cursor) {}
}

/// The outcome of [`execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Decoded result rows.
    pub rows: Vec<Row>,
    /// Ids generated by an INSERT.
    pub last_inserted_ids: Option<Vec<SqlValue>>,
}

/// Executes a compiled statement on `cursor` through the dialect's
/// execution context.
///
/// # Errors
///
/// Returns bind, processor and driver errors. The context's `restore` step
/// has run by the time an error is returned.
pub fn execute(
    dialect: &dyn Dialect,
    compiled: &CompiledStatement,
    params: &Params,
    cursor: &mut dyn Cursor,
) -> Result<ExecutionOutcome> {
    let bound = compiled.bind(params)?;
    let mut context = dialect.create_execution_context();
    let outcome = run(context.as_mut(), compiled, &bound, cursor);
    context.restore(cursor);
    outcome
}

fn run(
    context: &mut dyn ExecutionContext,
    compiled: &CompiledStatement,
    bound: &[(String, SqlValue)],
    cursor: &mut dyn Cursor,
) -> Result<ExecutionOutcome> {
    let plan = context.pre_exec(compiled, bound)?;
    cursor.set_timeout(plan.timeout);
    for sql in &plan.preamble {
        debug!(sql = sql.as_str(), "executing preamble");
        cursor.execute(sql, &[]).map_err(SqlError::Driver)?;
    }
    debug!(sql = plan.sql.as_str(), params = plan.params.len(), "executing statement");
    let rows = cursor
        .execute(&plan.sql, &plan.params)
        .map_err(SqlError::Driver)?;
    let last_inserted_ids = context.post_exec(compiled, &plan, &rows, cursor)?;
    let rows = if plan.postfetch_in_batch {
        vec![]
    } else {
        rows.into_iter()
            .map(|row| compiled.decode_row(row))
            .collect::<Result<_>>()?
    };
    Ok(ExecutionOutcome {
        rows,
        last_inserted_ids,
    })
}
