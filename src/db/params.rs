//! Parameter binding for prepared statements.

use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::types::Json;

pub(crate) type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// Bind one scalar parameter. Lists must already be flattened by
/// [`Escaper::expand_for_binding`](crate::db::Escaper::expand_for_binding).
pub(crate) fn bind_param<'q>(
    query: MySqlQuery<'q>,
    param: &'q QueryParam,
) -> DbResult<MySqlQuery<'q>> {
    let query = match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::UInt(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
        QueryParam::DateTime(v) => query.bind(*v),
        QueryParam::Json(v) => query.bind(Json(v)),
        QueryParam::List(_) => {
            return Err(DbError::invalid_input(
                "List parameters cannot be bound directly; expand the statement first",
            ));
        }
    };
    Ok(query)
}

/// Bind parameters in placeholder order.
pub(crate) fn bind_all<'q>(
    query: MySqlQuery<'q>,
    params: impl IntoIterator<Item = &'q QueryParam>,
) -> DbResult<MySqlQuery<'q>> {
    params.into_iter().try_fold(query, bind_param)
}
