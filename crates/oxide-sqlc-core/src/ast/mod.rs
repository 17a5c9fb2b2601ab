//! The statement tree.
//!
//! Every node is plain immutable data with structural equality and hashing,
//! so two independently built trees describing the same statement compare
//! equal and can share a cache entry. Rendering lives in
//! [`compiler`](crate::compiler).

mod expression;
mod query;
mod statement;

pub use expression::{
    BinaryOp, BindParam, ColumnRef, ColumnSource, Expr, Function, IntoOperand, NullOrdering,
    Operand, OrderBy, OrderDirection, TableAlias, UnaryOp, WindowSpec, bindparam, case, col,
    count_star, exists, extract, func, lit, raw, row_number,
};
pub use query::{Compound, Cte, FromItem, Join, JoinType, Query, Select, SetOp, derived_col, select};
pub use statement::{
    Delete, Index, Insert, InsertBuilder, InsertSource, Statement, Update, UpdateBuilder,
};
