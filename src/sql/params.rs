//! Typed values collected while building a query and bound positionally.

use chrono::{DateTime, Utc};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Each variant reports its own
/// wire type so one `Vec<SqlParam>` can carry mixed parameter types.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    I32(i32),
    I64(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl<'q> Encode<'q, Postgres> for SqlParam {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            SqlParam::I32(n) => <i32 as Encode<Postgres>>::encode_by_ref(n, buf),
            SqlParam::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            SqlParam::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            SqlParam::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            SqlParam::I32(_) => <i32 as Type<Postgres>>::type_info(),
            SqlParam::I64(_) => <i64 as Type<Postgres>>::type_info(),
            SqlParam::Text(_) => <String as Type<Postgres>>::type_info(),
            SqlParam::Timestamp(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for SqlParam {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
