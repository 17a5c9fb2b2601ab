//! Expression nodes.

use crate::schema::Table;
use crate::types::{SqlType, TypeKind};
use crate::value::{SqlValue, ToSqlValue};

use super::query::Query;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // String
    Concat,
    Like,
    NotLike,

    // Bitwise
    BitAnd,
    BitOr,
    LeftShift,
    RightShift,
}

impl BinaryOp {
    /// Returns the default SQL token of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
        }
    }

    /// Returns the precedence of the operator (higher = binds tighter).
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::Like
            | Self::NotLike => 4,
            Self::BitOr => 5,
            Self::BitAnd => 6,
            Self::LeftShift | Self::RightShift => 7,
            Self::Add | Self::Sub | Self::Concat => 8,
            Self::Mul | Self::Div | Self::Mod => 9,
        }
    }

    /// Returns `true` if `a op (b op c)` equals `(a op b) op c`.
    #[must_use]
    pub const fn is_associative(&self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Add | Self::Mul | Self::Concat | Self::BitAnd | Self::BitOr
        )
    }

    /// Returns `true` for operators producing a boolean.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        self.precedence() <= 4
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
    /// Bitwise NOT (~)
    BitNot,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "NOT ",
            Self::BitNot => "~",
        }
    }

    /// Returns the precedence of the operator.
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Not => 3,
            Self::Neg | Self::BitNot => 10,
        }
    }
}

/// A table referenced under an explicit alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    /// The aliased table.
    pub table: Table,
    /// The alias name.
    pub name: String,
}

impl TableAlias {
    /// Returns a column expression qualified by this alias.
    #[must_use]
    pub fn c(&self, key: &str) -> Expr {
        let (name, sql_type) = self.table.column(key).map_or_else(
            || (String::from(key), SqlType::null()),
            |col| (col.name.clone(), col.sql_type.clone()),
        );
        Expr::Column(ColumnRef {
            source: Some(ColumnSource::Alias(self.clone())),
            name,
            sql_type,
        })
    }

    /// Returns `alias.*`.
    #[must_use]
    pub fn star(&self) -> Expr {
        Expr::Wildcard(Some(ColumnSource::Alias(self.clone())))
    }
}

/// What a column reference is qualified by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnSource {
    /// A table.
    Table(Table),
    /// An aliased table.
    Alias(TableAlias),
    /// A derived table or CTE, by name.
    Derived(String),
}

impl ColumnSource {
    /// Returns the underlying table, if any.
    #[must_use]
    pub const fn table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) | Self::Alias(TableAlias { table, .. }) => Some(table),
            Self::Derived(_) => None,
        }
    }
}

/// A reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// The qualifier; `None` renders the bare name.
    pub source: Option<ColumnSource>,
    /// Column name.
    pub name: String,
    /// Logical type.
    pub sql_type: SqlType,
}

/// A bind parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindParam {
    /// The requested name.
    pub key: String,
    /// Captured value, if known at construction.
    pub value: Option<SqlValue>,
    /// Logical type used to pick processors.
    pub sql_type: SqlType,
    /// Unique binds are renamed on collision; non-unique binds with the
    /// same key share one placeholder.
    pub unique: bool,
}

impl BindParam {
    /// A named bind shared by every occurrence of `key`.
    #[must_use]
    pub fn named(key: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            key: key.into(),
            value: None,
            sql_type,
            unique: false,
        }
    }

    /// A bind renamed on collision, carrying a value.
    #[must_use]
    pub fn unique(key: impl Into<String>, value: SqlValue, sql_type: SqlType) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            sql_type,
            unique: true,
        }
    }

    /// Attaches a value.
    #[must_use]
    pub fn with_value(mut self, value: SqlValue) -> Self {
        self.value = Some(value);
        self
    }
}

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Null ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOrdering {
    /// NULLs come first.
    First,
    /// NULLs come last.
    Last,
}

impl NullOrdering {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// Explicit direction; `None` renders nothing.
    pub direction: Option<OrderDirection>,
    /// Null ordering (optional).
    pub nulls: Option<NullOrdering>,
}

impl OrderBy {
    /// Sets the null ordering.
    #[must_use]
    pub const fn nulls(mut self, nulls: NullOrdering) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

impl From<Expr> for OrderBy {
    fn from(expr: Expr) -> Self {
        Self {
            expr,
            direction: None,
            nulls: None,
        }
    }
}

/// The OVER clause of a window function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct WindowSpec {
    /// PARTITION BY expressions.
    pub partition_by: Vec<Expr>,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
}

/// A function call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Function {
    /// Function name as written by the caller.
    pub name: String,
    /// Arguments.
    pub args: Vec<Expr>,
    /// `DISTINCT` inside an aggregate.
    pub distinct: bool,
    /// Window specification.
    pub over: Option<WindowSpec>,
    /// Return type.
    pub sql_type: SqlType,
}

impl Function {
    /// Adds an OVER clause.
    #[must_use]
    pub fn over(mut self, partition_by: Vec<Expr>, order_by: Vec<OrderBy>) -> Expr {
        self.over = Some(WindowSpec {
            partition_by,
            order_by,
        });
        Expr::Function(self)
    }
}

impl From<Function> for Expr {
    fn from(func: Function) -> Self {
        Self::Function(func)
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Inline literal value.
    Literal(SqlValue),
    /// Column reference.
    Column(ColumnRef),
    /// Bind parameter.
    Bind(BindParam),
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Function call, aggregate or window function.
    Function(Function),
    /// CASE expression.
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    /// CAST expression.
    Cast { expr: Box<Expr>, to: SqlType },
    /// EXTRACT of a date part.
    Extract { field: String, expr: Box<Expr> },
    /// IS [NOT] NULL.
    IsNull { expr: Box<Expr>, negated: bool },
    /// [NOT] IN a list.
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// [NOT] IN a subquery.
    InSubquery {
        expr: Box<Expr>,
        query: Box<Query>,
        negated: bool,
    },
    /// [NOT] BETWEEN.
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// [NOT] EXISTS.
    Exists { query: Box<Query>, negated: bool },
    /// Scalar subquery.
    Subquery(Box<Query>),
    /// `expr AS name`.
    Label { expr: Box<Expr>, name: String },
    /// `*` or `qualifier.*`.
    Wildcard(Option<ColumnSource>),
    /// Parenthesized list.
    Tuple(Vec<Expr>),
    /// Raw SQL, rendered verbatim.
    Raw(String),
}

/// The right-hand side of a comparison: an expression or a plain value.
///
/// Plain values become unique bind parameters named after, and typed like,
/// the left-hand side.
#[derive(Debug, Clone)]
pub enum Operand {
    /// An expression.
    Expr(Expr),
    /// A value to bind.
    Value(SqlValue),
}

/// Types usable as an [`Operand`].
pub trait IntoOperand {
    /// Converts into an operand.
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Expr {
    fn into_operand(self) -> Operand {
        Operand::Expr(self)
    }
}

impl IntoOperand for &Expr {
    fn into_operand(self) -> Operand {
        Operand::Expr(self.clone())
    }
}

impl<T: ToSqlValue> IntoOperand for T {
    fn into_operand(self) -> Operand {
        Operand::Value(self.to_sql_value())
    }
}

impl Expr {
    /// Returns the inferred logical type.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        match self {
            Self::Literal(value) => literal_type(value),
            Self::Column(col) => col.sql_type.clone(),
            Self::Bind(bind) => bind.sql_type.clone(),
            Self::Binary { left, op, .. } => {
                if op.is_comparison() {
                    SqlType::boolean()
                } else if *op == BinaryOp::Concat {
                    SqlType::string(None)
                } else {
                    left.sql_type()
                }
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => SqlType::boolean(),
                UnaryOp::Neg | UnaryOp::BitNot => operand.sql_type(),
            },
            Self::Function(func) => func.sql_type.clone(),
            Self::Case {
                whens, else_result, ..
            } => whens
                .first()
                .map(|(_, then)| then.sql_type())
                .or_else(|| else_result.as_ref().map(|e| e.sql_type()))
                .unwrap_or_default(),
            Self::Cast { to, .. } => to.clone(),
            Self::Extract { .. } => SqlType::integer(),
            Self::IsNull { .. }
            | Self::InList { .. }
            | Self::InSubquery { .. }
            | Self::Between { .. }
            | Self::Exists { .. } => SqlType::boolean(),
            Self::Subquery(query) => query
                .selected_columns()
                .first()
                .map(Self::sql_type)
                .unwrap_or_default(),
            Self::Label { expr, .. } => expr.sql_type(),
            Self::Wildcard(_) | Self::Tuple(_) | Self::Raw(_) => SqlType::null(),
        }
    }

    /// Returns the name this expression is known by in a result row.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Column(col) => Some(&col.name),
            Self::Label { name, .. } => Some(name),
            _ => None,
        }
    }

    fn bind_key(&self) -> &str {
        match self {
            Self::Column(col) => &col.name,
            Self::Label { name, .. } => name,
            Self::Bind(bind) => &bind.key,
            _ => "param",
        }
    }

    fn resolve(&self, other: impl IntoOperand) -> Self {
        match other.into_operand() {
            Operand::Expr(expr) => expr,
            Operand::Value(value) => Self::Bind(BindParam::unique(
                self.bind_key(),
                value,
                self.sql_type(),
            )),
        }
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, other: impl IntoOperand) -> Self {
        let right = self.resolve(other);
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// `self = other`.
    #[must_use]
    pub fn eq(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// `self <> other`.
    #[must_use]
    pub fn not_eq(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::NotEq, other)
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// `self <= other`.
    #[must_use]
    pub fn lt_eq(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::LtEq, other)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// `self >= other`.
    #[must_use]
    pub fn gt_eq(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::GtEq, other)
    }

    /// `self AND other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `self + other`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// `self - other`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    /// `self * other`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    /// `self / other`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Div, other)
    }

    /// String concatenation.
    #[must_use]
    pub fn concat(self, other: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Concat, other)
    }

    /// `self LIKE pattern`.
    #[must_use]
    pub fn like(self, pattern: impl IntoOperand) -> Self {
        self.binary(BinaryOp::Like, pattern)
    }

    /// `self NOT LIKE pattern`.
    #[must_use]
    pub fn not_like(self, pattern: impl IntoOperand) -> Self {
        self.binary(BinaryOp::NotLike, pattern)
    }

    /// `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// `self IN (values...)`.
    #[must_use]
    pub fn in_list<T: IntoOperand>(self, values: Vec<T>) -> Self {
        let list = values.into_iter().map(|v| self.resolve(v)).collect();
        Self::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    /// `self NOT IN (values...)`.
    #[must_use]
    pub fn not_in_list<T: IntoOperand>(self, values: Vec<T>) -> Self {
        let list = values.into_iter().map(|v| self.resolve(v)).collect();
        Self::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    /// `self IN (subquery)`.
    #[must_use]
    pub fn in_query(self, query: impl Into<Query>) -> Self {
        Self::InSubquery {
            expr: Box::new(self),
            query: Box::new(query.into()),
            negated: false,
        }
    }

    /// `self BETWEEN low AND high`.
    #[must_use]
    pub fn between(self, low: impl IntoOperand, high: impl IntoOperand) -> Self {
        let low = self.resolve(low);
        let high = self.resolve(high);
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// `NOT self`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    /// `-self`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn neg(self) -> Self {
        Self::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }

    /// `CAST(self AS to)`.
    #[must_use]
    pub fn cast(self, to: SqlType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            to,
        }
    }

    /// `self AS name`.
    #[must_use]
    pub fn label(self, name: impl Into<String>) -> Self {
        Self::Label {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    /// Ascending order entry.
    #[must_use]
    pub const fn asc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: Some(OrderDirection::Asc),
            nulls: None,
        }
    }

    /// Descending order entry.
    #[must_use]
    pub const fn desc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: Some(OrderDirection::Desc),
            nulls: None,
        }
    }
}

fn literal_type(value: &SqlValue) -> SqlType {
    match value {
        SqlValue::Null => SqlType::null(),
        SqlValue::Bool(_) => SqlType::boolean(),
        SqlValue::Int(_) => SqlType::integer(),
        SqlValue::Float(_) => SqlType::float(None),
        SqlValue::Decimal(_) => SqlType::of(TypeKind::Numeric),
        SqlValue::Text(_) => SqlType::string(None),
        SqlValue::Blob(_) => SqlType::binary(None),
        SqlValue::Date(_) => SqlType::date(),
        SqlValue::DateTime(_) => SqlType::datetime(),
        SqlValue::Time(_) => SqlType::time(),
    }
}

/// An unqualified column reference.
#[must_use]
pub fn col(name: &str) -> Expr {
    Expr::Column(ColumnRef {
        source: None,
        name: String::from(name),
        sql_type: SqlType::null(),
    })
}

/// An inline literal.
#[must_use]
pub fn lit<T: ToSqlValue>(value: T) -> Expr {
    Expr::Literal(value.to_sql_value())
}

/// A named bind parameter without a value.
#[must_use]
pub fn bindparam(key: &str, sql_type: SqlType) -> Expr {
    Expr::Bind(BindParam::named(key, sql_type))
}

/// A function call with an untyped result.
#[must_use]
pub fn func(name: &str, args: Vec<Expr>) -> Function {
    Function {
        name: String::from(name),
        args,
        distinct: false,
        over: None,
        sql_type: SqlType::null(),
    }
}

/// `count(*)`.
#[must_use]
pub fn count_star() -> Expr {
    Expr::Function(Function {
        sql_type: SqlType::integer(),
        ..func("count", vec![Expr::Wildcard(None)])
    })
}

/// `ROW_NUMBER()`; combine with [`Function::over`].
#[must_use]
pub fn row_number() -> Function {
    Function {
        sql_type: SqlType::big_integer(),
        ..func("ROW_NUMBER", vec![])
    }
}

/// `EXTRACT(field FROM expr)`.
#[must_use]
pub fn extract(field: &str, expr: Expr) -> Expr {
    Expr::Extract {
        field: field.to_ascii_lowercase(),
        expr: Box::new(expr),
    }
}

/// A searched CASE expression.
#[must_use]
pub fn case(whens: Vec<(Expr, Expr)>, else_result: Option<Expr>) -> Expr {
    Expr::Case {
        operand: None,
        whens,
        else_result: else_result.map(Box::new),
    }
}

/// `EXISTS (query)`.
#[must_use]
pub fn exists(query: impl Into<Query>) -> Expr {
    Expr::Exists {
        query: Box::new(query.into()),
        negated: false,
    }
}

/// Raw SQL text.
///
/// **Warning**: Only use this for SQL fragments that don't contain user input.
#[must_use]
pub fn raw(sql: impl Into<String>) -> Expr {
    Expr::Raw(sql.into())
}
