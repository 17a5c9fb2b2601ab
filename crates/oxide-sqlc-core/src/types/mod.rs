//! Logical SQL types.
//!
//! A [`SqlType`] describes a column or bind parameter independently of any
//! backend. Optional facets (length, collation, timezone) are plain fields
//! set through builder methods and exposed through the [`HasLength`],
//! [`HasCollation`] and [`HasTimezone`] traits, so a dialect can ask for a
//! facet without knowing which concrete kind carries it.
//!
//! Turning a logical type into a native column specification is done by
//! [`resolve`], which consults the dialect's override table before the ANSI
//! base table.

mod processors;
mod resolve;

pub use processors::{
    LiteralProcessor, Processor, base_bind_processor, base_literal_processor,
    base_result_processor, bool_to_int, int_to_bool, literal_bool_as_int, literal_inline,
    to_decimal, to_float,
};
pub use resolve::{
    TypeOverride, base_spec, lookup_native, resolve, resolve_with, type_from_native,
};

use std::fmt;

/// The family of a logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    /// 4-byte integer.
    Integer,
    /// 2-byte integer.
    SmallInteger,
    /// 1-byte integer.
    TinyInteger,
    /// 8-byte integer.
    BigInteger,
    /// Fixed-point number.
    Numeric,
    /// Floating-point number.
    Float,
    /// Bounded character string.
    String,
    /// Bounded national character string.
    Unicode,
    /// Unbounded character string.
    Text,
    /// Unbounded national character string.
    UnicodeText,
    /// Fixed-length character string.
    Char,
    /// Fixed-length national character string.
    NChar,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Boolean.
    Boolean,
    /// Binary data.
    Binary,
    /// Unknown type.
    Null,
}

impl TypeKind {
    /// Returns the name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::SmallInteger => "SmallInteger",
            Self::TinyInteger => "TinyInteger",
            Self::BigInteger => "BigInteger",
            Self::Numeric => "Numeric",
            Self::Float => "Float",
            Self::String => "String",
            Self::Unicode => "Unicode",
            Self::Text => "Text",
            Self::UnicodeText => "UnicodeText",
            Self::Char => "Char",
            Self::NChar => "NChar",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Boolean => "Boolean",
            Self::Binary => "Binary",
            Self::Null => "Null",
        }
    }

    /// Returns `true` for integer kinds.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::SmallInteger | Self::TinyInteger | Self::BigInteger
        )
    }

    /// Returns `true` for character kinds.
    #[must_use]
    pub const fn is_character(self) -> bool {
        matches!(
            self,
            Self::String | Self::Unicode | Self::Text | Self::UnicodeText | Self::Char | Self::NChar
        )
    }

    const fn takes_length(self) -> bool {
        self.is_character() || matches!(self, Self::Binary)
    }
}

/// How numeric results are handed back to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumericMode {
    /// Exact decimal values.
    #[default]
    Decimal,
    /// Binary floating point.
    Float,
}

/// A logical column or parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlType {
    kind: TypeKind,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    collation: Option<String>,
    timezone: bool,
    numeric_mode: NumericMode,
}

impl SqlType {
    /// Creates a type of the given kind with no facets.
    #[must_use]
    pub const fn of(kind: TypeKind) -> Self {
        let numeric_mode = if matches!(kind, TypeKind::Float) {
            NumericMode::Float
        } else {
            NumericMode::Decimal
        };
        Self {
            kind,
            length: None,
            precision: None,
            scale: None,
            collation: None,
            timezone: false,
            numeric_mode,
        }
    }

    /// `INTEGER`.
    #[must_use]
    pub const fn integer() -> Self {
        Self::of(TypeKind::Integer)
    }

    /// `SMALLINT`.
    #[must_use]
    pub const fn small_integer() -> Self {
        Self::of(TypeKind::SmallInteger)
    }

    /// `TINYINT`.
    #[must_use]
    pub const fn tiny_integer() -> Self {
        Self::of(TypeKind::TinyInteger)
    }

    /// `BIGINT`.
    #[must_use]
    pub const fn big_integer() -> Self {
        Self::of(TypeKind::BigInteger)
    }

    /// Fixed-point with the given precision and scale.
    #[must_use]
    pub const fn numeric(precision: u32, scale: u32) -> Self {
        let mut ty = Self::of(TypeKind::Numeric);
        ty.precision = Some(precision);
        ty.scale = Some(scale);
        ty
    }

    /// Floating point with optional binary precision.
    #[must_use]
    pub const fn float(precision: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::Float);
        ty.precision = precision;
        ty
    }

    /// Bounded (or, with `None`, unbounded) character string.
    #[must_use]
    pub const fn string(length: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::String);
        ty.length = length;
        ty
    }

    /// National character string.
    #[must_use]
    pub const fn unicode(length: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::Unicode);
        ty.length = length;
        ty
    }

    /// Unbounded text.
    #[must_use]
    pub const fn text() -> Self {
        Self::of(TypeKind::Text)
    }

    /// Unbounded national text.
    #[must_use]
    pub const fn unicode_text() -> Self {
        Self::of(TypeKind::UnicodeText)
    }

    /// Fixed-length character string.
    #[must_use]
    pub const fn char(length: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::Char);
        ty.length = length;
        ty
    }

    /// Fixed-length national character string.
    #[must_use]
    pub const fn nchar(length: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::NChar);
        ty.length = length;
        ty
    }

    /// Calendar date.
    #[must_use]
    pub const fn date() -> Self {
        Self::of(TypeKind::Date)
    }

    /// Date and time.
    #[must_use]
    pub const fn datetime() -> Self {
        Self::of(TypeKind::DateTime)
    }

    /// Time of day.
    #[must_use]
    pub const fn time() -> Self {
        Self::of(TypeKind::Time)
    }

    /// Boolean.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::of(TypeKind::Boolean)
    }

    /// Binary data, optionally bounded.
    #[must_use]
    pub const fn binary(length: Option<u32>) -> Self {
        let mut ty = Self::of(TypeKind::Binary);
        ty.length = length;
        ty
    }

    /// The unknown type. Renders and processes nothing.
    #[must_use]
    pub const fn null() -> Self {
        Self::of(TypeKind::Null)
    }

    /// Sets the length of a character or binary type.
    #[must_use]
    pub const fn with_length(mut self, length: u32) -> Self {
        if self.kind.takes_length() {
            self.length = Some(length);
        }
        self
    }

    /// Sets the collation of a character type.
    #[must_use]
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        if self.kind.is_character() {
            self.collation = Some(collation.into());
        }
        self
    }

    /// Marks a date/time type as timezone-aware.
    #[must_use]
    pub const fn with_timezone(mut self) -> Self {
        if matches!(self.kind, TypeKind::DateTime | TypeKind::Time) {
            self.timezone = true;
        }
        self
    }

    /// Returns numeric results as exact decimals.
    #[must_use]
    pub const fn as_decimal(mut self) -> Self {
        self.numeric_mode = NumericMode::Decimal;
        self
    }

    /// Returns numeric results as floats.
    #[must_use]
    pub const fn as_float(mut self) -> Self {
        self.numeric_mode = NumericMode::Float;
        self
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns the numeric precision.
    #[must_use]
    pub const fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// Returns the numeric scale.
    #[must_use]
    pub const fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// Returns the result mode for numeric kinds.
    #[must_use]
    pub const fn numeric_mode(&self) -> NumericMode {
        self.numeric_mode
    }

    /// Returns `true` for the unknown type.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Null)
    }
}

impl Default for SqlType {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base_spec(self))
    }
}

/// Types that carry an optional length.
pub trait HasLength {
    /// Returns the declared length.
    fn length(&self) -> Option<u32>;
}

/// Types that carry an optional collation.
pub trait HasCollation {
    /// Returns the declared collation.
    fn collation(&self) -> Option<&str>;
}

/// Types that may be timezone-aware.
pub trait HasTimezone {
    /// Returns `true` if values carry a zone offset.
    fn timezone(&self) -> bool;
}

impl HasLength for SqlType {
    fn length(&self) -> Option<u32> {
        self.length
    }
}

impl HasCollation for SqlType {
    fn collation(&self) -> Option<&str> {
        self.collation.as_deref()
    }
}

impl HasTimezone for SqlType {
    fn timezone(&self) -> bool {
        self.timezone
    }
}
