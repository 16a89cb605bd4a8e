//! Column data types.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::quote::quote_string;

/// Marker for a length or scale that was not written in the DDL.
pub const UNSPECIFIED_LENGTH: i64 = -1;

/// Base type code of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Bit,
    Decimal,
    Float,
    Double,
    Date,
    DateTime,
    Timestamp,
    Time,
    Year,
    Char,
    VarChar,
    Binary,
    VarBinary,
    TinyText,
    Text,
    MediumText,
    LongText,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Enum,
    Set,
    Json,
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl TypeCode {
    /// Resolve a type keyword, including MySQL's aliases.
    ///
    /// The second element is a length implied by the alias (`BOOL` is
    /// `TINYINT(1)`).
    pub fn from_keyword(word: &str) -> Option<(Self, Option<i64>)> {
        let upper = word.to_ascii_uppercase();
        let code = match upper.as_str() {
            "BOOL" | "BOOLEAN" => return Some((Self::TinyInt, Some(1))),
            "TINYINT" | "INT1" => Self::TinyInt,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "MEDIUMINT" | "MIDDLEINT" | "INT3" => Self::MediumInt,
            "INT" | "INTEGER" | "INT4" => Self::Int,
            "BIGINT" | "INT8" => Self::BigInt,
            "BIT" => Self::Bit,
            "DECIMAL" | "DEC" | "NUMERIC" | "FIXED" => Self::Decimal,
            "FLOAT" | "FLOAT4" => Self::Float,
            "DOUBLE" | "REAL" | "FLOAT8" => Self::Double,
            "DATE" => Self::Date,
            "DATETIME" => Self::DateTime,
            "TIMESTAMP" => Self::Timestamp,
            "TIME" => Self::Time,
            "YEAR" => Self::Year,
            "CHAR" | "CHARACTER" | "NCHAR" => Self::Char,
            "VARCHAR" | "VARCHARACTER" | "NVARCHAR" => Self::VarChar,
            "BINARY" => Self::Binary,
            "VARBINARY" => Self::VarBinary,
            "TINYTEXT" => Self::TinyText,
            "TEXT" => Self::Text,
            "MEDIUMTEXT" => Self::MediumText,
            "LONGTEXT" => Self::LongText,
            "TINYBLOB" => Self::TinyBlob,
            "BLOB" => Self::Blob,
            "MEDIUMBLOB" => Self::MediumBlob,
            "LONGBLOB" => Self::LongBlob,
            "ENUM" => Self::Enum,
            "SET" => Self::Set,
            "JSON" => Self::Json,
            "GEOMETRY" => Self::Geometry,
            "POINT" => Self::Point,
            "LINESTRING" => Self::LineString,
            "POLYGON" => Self::Polygon,
            "MULTIPOINT" => Self::MultiPoint,
            "MULTILINESTRING" => Self::MultiLineString,
            "MULTIPOLYGON" => Self::MultiPolygon,
            "GEOMETRYCOLLECTION" => Self::GeometryCollection,
            _ => return None,
        };
        Some((code, None))
    }

    /// Canonical keyword used when rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::MediumInt => "MEDIUMINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Bit => "BIT",
            Self::Decimal => "DECIMAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Time => "TIME",
            Self::Year => "YEAR",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::TinyText => "TINYTEXT",
            Self::Text => "TEXT",
            Self::MediumText => "MEDIUMTEXT",
            Self::LongText => "LONGTEXT",
            Self::TinyBlob => "TINYBLOB",
            Self::Blob => "BLOB",
            Self::MediumBlob => "MEDIUMBLOB",
            Self::LongBlob => "LONGBLOB",
            Self::Enum => "ENUM",
            Self::Set => "SET",
            Self::Json => "JSON",
            Self::Geometry => "GEOMETRY",
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Integer types, whose declared length is only a display width.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt
        )
    }

    /// Types declared as `(precision, scale)`.
    pub fn is_fractional(&self) -> bool {
        matches!(self, Self::Decimal | Self::Float | Self::Double)
    }

    /// Types whose arguments are an element list.
    pub fn has_elements(&self) -> bool {
        matches!(self, Self::Enum | Self::Set)
    }

    /// Character string types.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::VarChar
                | Self::TinyText
                | Self::Text
                | Self::MediumText
                | Self::LongText
                | Self::Enum
                | Self::Set
        )
    }

    /// Date and time types.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::DateTime | Self::Timestamp | Self::Time | Self::Year
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column's declared data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub code: TypeCode,
    /// Declared length, precision or fractional-second digits.
    pub length: i64,
    /// Declared decimal scale.
    pub scale: i64,
    pub unsigned: bool,
    pub zerofill: bool,
    pub binary: bool,
    pub charset: Option<SmolStr>,
    pub collate: Option<SmolStr>,
    /// ENUM / SET members, in declaration order.
    pub elems: Vec<String>,
}

impl DataType {
    /// Create a type with nothing but its code.
    pub fn new(code: TypeCode) -> Self {
        Self {
            code,
            length: UNSPECIFIED_LENGTH,
            scale: UNSPECIFIED_LENGTH,
            unsigned: false,
            zerofill: false,
            binary: false,
            charset: None,
            collate: None,
            elems: Vec::new(),
        }
    }

    /// Set the declared length.
    pub fn with_length(mut self, length: i64) -> Self {
        self.length = length;
        self
    }

    /// Set precision and scale.
    pub fn with_scale(mut self, length: i64, scale: i64) -> Self {
        self.length = length;
        self.scale = scale;
        self
    }

    /// Mark the type unsigned.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Set ENUM / SET members.
    pub fn with_elems<I, S>(mut self, elems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elems = elems.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code.as_str())?;
        if self.code.has_elements() {
            let elems = self
                .elems
                .iter()
                .map(|e| quote_string(e))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "({elems})")?;
        } else if self.length != UNSPECIFIED_LENGTH {
            if self.scale != UNSPECIFIED_LENGTH {
                write!(f, "({},{})", self.length, self.scale)?;
            } else {
                write!(f, "({})", self.length)?;
            }
        }
        if self.unsigned {
            f.write_str(" UNSIGNED")?;
        }
        if self.zerofill {
            f.write_str(" ZEROFILL")?;
        }
        if self.binary {
            f.write_str(" BINARY")?;
        }
        if let Some(charset) = &self.charset {
            write!(f, " CHARACTER SET {charset}")?;
        }
        if let Some(collate) = &self.collate {
            write!(f, " COLLATE {collate}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(TypeCode::from_keyword("integer"), Some((TypeCode::Int, None)));
        assert_eq!(
            TypeCode::from_keyword("BOOL"),
            Some((TypeCode::TinyInt, Some(1)))
        );
        assert_eq!(TypeCode::from_keyword("numeric"), Some((TypeCode::Decimal, None)));
        assert_eq!(TypeCode::from_keyword("hyperint"), None);
    }

    #[test]
    fn test_display_variants() {
        assert_eq!(DataType::new(TypeCode::BigInt).to_string(), "BIGINT");
        assert_eq!(
            DataType::new(TypeCode::BigInt).with_length(20).unsigned().to_string(),
            "BIGINT(20) UNSIGNED"
        );
        assert_eq!(
            DataType::new(TypeCode::Decimal).with_scale(10, 2).to_string(),
            "DECIMAL(10,2)"
        );
        assert_eq!(
            DataType::new(TypeCode::Enum).with_elems(["a", "b"]).to_string(),
            "ENUM('a','b')"
        );
    }

    #[test]
    fn test_type_classes() {
        assert!(TypeCode::BigInt.is_integer());
        assert!(!TypeCode::Decimal.is_integer());
        assert!(TypeCode::Decimal.is_fractional());
        assert!(TypeCode::Set.has_elements());
        assert!(TypeCode::VarChar.is_string());
        assert!(TypeCode::Timestamp.is_temporal());
    }
}
