//! Canonical data types.
//!
//! Every dialect maps its native type names onto [`DataType`]. The generator
//! reasons exclusively in these terms; only the printer and the dialect's
//! type-name table ever see native spellings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::random::RandomSource;

/// Coarse category of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Numeric,
    Text,
    Boolean,
    Binary,
    Composite,
}

/// Canonical data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Int,
    Float,
    Decimal,
    Text,
    Char,
    Bool,
    Blob,
    Json,
}

impl DataType {
    /// All canonical types in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Int,
        Self::Float,
        Self::Decimal,
        Self::Text,
        Self::Char,
        Self::Bool,
        Self::Blob,
        Self::Json,
    ];

    #[must_use]
    pub const fn category(self) -> TypeCategory {
        match self {
            Self::Int | Self::Float | Self::Decimal => TypeCategory::Numeric,
            Self::Text | Self::Char => TypeCategory::Text,
            Self::Bool => TypeCategory::Boolean,
            Self::Blob => TypeCategory::Binary,
            Self::Json => TypeCategory::Composite,
        }
    }

    /// Whether values of this type are atomic.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(self.category(), TypeCategory::Composite)
    }

    /// Whether this type participates in numeric comparisons.
    ///
    /// Booleans count: every supported engine orders them as 0/1.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Decimal | Self::Bool)
    }

    /// Whether the engine can order two values of this type with `<`.
    #[must_use]
    pub const fn is_comparable(self) -> bool {
        self.is_primitive()
    }

    /// Pick a type uniformly from `enabled`.
    pub fn random(random: &mut RandomSource, enabled: &[Self]) -> Option<Self> {
        random.pick(enabled).copied()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Decimal => "DECIMAL",
            Self::Text => "TEXT",
            Self::Char => "CHAR",
            Self::Bool => "BOOL",
            Self::Blob => "BLOB",
            Self::Json => "JSON",
        })
    }
}

/// `true` when `ty` is among `supported`, or when `supported` is empty
/// (unconstrained).
#[must_use]
pub fn supports_return_type(supported: &[DataType], ty: DataType) -> bool {
    supported.is_empty() || supported.contains(&ty)
}

/// A canonical type with an optional storage width in bytes.
///
/// Only `INT` (1, 2, 4, 8) and `FLOAT` (4, 8) carry widths; every other
/// type has `size == None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeDataType {
    pub data_type: DataType,
    pub size: Option<u8>,
}

impl CompositeDataType {
    pub const INT_SIZES: [u8; 4] = [1, 2, 4, 8];
    pub const FLOAT_SIZES: [u8; 2] = [4, 8];

    #[must_use]
    pub const fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            size: None,
        }
    }

    #[must_use]
    pub const fn sized(data_type: DataType, size: u8) -> Self {
        Self {
            data_type,
            size: Some(size),
        }
    }

    #[must_use]
    pub const fn int(size: u8) -> Self {
        Self::sized(DataType::Int, size)
    }

    /// Choose a type from `enabled` and, where the type models a width,
    /// a random width for it.
    pub fn random(random: &mut RandomSource, enabled: &[DataType]) -> Option<Self> {
        let data_type = DataType::random(random, enabled)?;
        let size = match data_type {
            DataType::Int => random.pick(&Self::INT_SIZES).copied(),
            DataType::Float => random.pick(&Self::FLOAT_SIZES).copied(),
            _ => None,
        };
        Some(Self { data_type, size })
    }
}

impl From<DataType> for CompositeDataType {
    fn from(data_type: DataType) -> Self {
        Self::new(data_type)
    }
}

impl fmt::Display for CompositeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(f, "{}({size})", self.data_type),
            None => write!(f, "{}", self.data_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_partition_all_types() {
        for ty in DataType::ALL {
            let category = ty.category();
            assert_eq!(ty.is_primitive(), category != TypeCategory::Composite, "{ty}");
        }
        assert_eq!(DataType::Int.category(), TypeCategory::Numeric);
        assert_eq!(DataType::Char.category(), TypeCategory::Text);
        assert_eq!(DataType::Blob.category(), TypeCategory::Binary);
        assert_eq!(DataType::Json.category(), TypeCategory::Composite);
    }

    #[test]
    fn numeric_types_include_bool_but_not_text() {
        assert!(DataType::Bool.is_numeric());
        assert!(DataType::Decimal.is_numeric());
        assert!(!DataType::Text.is_numeric());
        assert!(!DataType::Blob.is_numeric());
    }

    #[test]
    fn empty_support_list_is_unconstrained() {
        assert!(supports_return_type(&[], DataType::Json));
        assert!(supports_return_type(&[DataType::Int], DataType::Int));
        assert!(!supports_return_type(&[DataType::Int], DataType::Text));
    }

    #[test]
    fn random_composite_widths_match_type() {
        let mut random = RandomSource::from_seed(7);
        for _ in 0..200 {
            let ty = CompositeDataType::random(&mut random, &DataType::ALL).unwrap();
            match ty.data_type {
                DataType::Int => assert!(CompositeDataType::INT_SIZES.contains(&ty.size.unwrap())),
                DataType::Float => {
                    assert!(CompositeDataType::FLOAT_SIZES.contains(&ty.size.unwrap()));
                }
                _ => assert_eq!(ty.size, None),
            }
        }
    }

    #[test]
    fn random_type_from_empty_set_is_none() {
        let mut random = RandomSource::from_seed(1);
        assert_eq!(DataType::random(&mut random, &[]), None);
        assert_eq!(CompositeDataType::random(&mut random, &[]), None);
    }

    #[test]
    fn serde_uses_sql_spelling() {
        let json = serde_json::to_string(&DataType::Bool).unwrap();
        assert_eq!(json, "\"BOOL\"");
        assert_eq!(CompositeDataType::int(8).to_string(), "INT(8)");
    }
}
