//! Счётчик байтов на весь диапазон u64.
//!
//! Ни SQLite, ни Postgres не хранят беззнаковый BIGINT, поэтому значение
//! лежит в TEXT десятичной строкой.

use sea_orm::sea_query::{
    ArrayType, ColumnType, Nullable, StringLen, Value, ValueType, ValueTypeErr,
};
use sea_orm::{ColIdx, DbErr, QueryResult, TryGetError, TryGetable};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteCount(pub u64);

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ByteCount {
    fn from(value: u64) -> Self {
        ByteCount(value)
    }
}

impl From<ByteCount> for Value {
    fn from(value: ByteCount) -> Self {
        Value::from(value.0.to_string())
    }
}

impl Nullable for ByteCount {
    fn null() -> Value {
        Value::String(None)
    }
}

impl ValueType for ByteCount {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        let text = <String as ValueType>::try_from(v)?;
        text.parse().map(ByteCount).map_err(|_| ValueTypeErr)
    }

    fn type_name() -> String {
        "ByteCount".to_string()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::String(StringLen::None)
    }
}

impl TryGetable for ByteCount {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        let text = String::try_get_by(res, index)?;
        text.parse().map(ByteCount).map_err(|_| {
            TryGetError::DbErr(DbErr::Type(format!(
                "ожидалось число байтов, получено {text:?}"
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_survives_value_conversion() {
        let value: Value = ByteCount(u64::MAX).into();
        assert_eq!(
            <ByteCount as ValueType>::try_from(value).unwrap(),
            ByteCount(u64::MAX)
        );
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&ByteCount(u64::MAX)).unwrap();
        assert_eq!(json, "18446744073709551615");
    }
}
