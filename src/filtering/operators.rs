//! Filter keys and operator dispatch.
//!
//! A filter key is an optional dotted relation path, a column, and an optional
//! `__op` suffix: `name`, `floor__gte`, `units.tenant_contact.name__like`.

use sea_orm::{
    ColumnTrait, ColumnType, IdenStatic, Value as SqlValue,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde_json::Value;
use uuid::Uuid;

pub const OPERATOR_SEPARATOR: &str = "__";

/// Comparison operators for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equality (=)
    Eq,
    /// Not equal (!=)
    Neq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Case-insensitive substring match
    Like,
    /// IN (array of values)
    In,
    /// NOT IN (array of values)
    NotIn,
    /// IS NULL for `true`, IS NOT NULL for `false`
    IsNull,
}

impl FilterOperator {
    /// Parse the operator name that follows `__`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "neq" | "ne" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "like" | "ilike" | "contains" => Some(Self::Like),
            "in" => Some(Self::In),
            "nin" | "not_in" => Some(Self::NotIn),
            "isnull" => Some(Self::IsNull),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::In => "in",
            Self::NotIn => "nin",
            Self::IsNull => "isnull",
        }
    }

    /// Operator implied by the value when the key has no suffix.
    #[must_use]
    pub fn implied_by(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::In,
            Value::Null => Self::IsNull,
            _ => Self::Eq,
        }
    }
}

/// A parsed filter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey<'a> {
    /// Relation names to walk, outermost first; empty for a plain column
    pub path: Vec<&'a str>,
    pub column: &'a str,
    /// `None` when the key had no `__op` suffix
    pub operator: Option<FilterOperator>,
}

impl FilterKey<'_> {
    #[must_use]
    pub fn is_relation_path(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Split `units.tenant_contact.name__like` into its parts. Returns `None` for
/// an unknown operator or an empty segment.
#[must_use]
pub fn parse_filter_key(key: &str) -> Option<FilterKey<'_>> {
    let (field, operator) = match key.rsplit_once(OPERATOR_SEPARATOR) {
        Some((field, name)) => (field, Some(FilterOperator::from_name(name)?)),
        None => (key, None),
    };

    let mut segments: Vec<&str> = field.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    let column = segments.pop()?;

    Some(FilterKey {
        path: segments,
        column,
        operator,
    })
}

/// What a column stores, as far as filter values are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Compared case-insensitively, substring matches allowed
    Text,
    /// Stored as text; compared like [`ColumnKind::Text`]
    Enum,
    Uuid,
    /// Integers, floats and booleans
    Numeric,
    /// Anything else (timestamps, JSON); values bind as given
    Other,
}

impl ColumnKind {
    /// Kind of `column`, with `enums` naming the columns backed by an enum.
    #[must_use]
    pub fn of<C: ColumnTrait>(column: C, enums: &[&str]) -> Self {
        if enums.contains(&column.as_str()) {
            return Self::Enum;
        }
        match column.def().get_column_type() {
            ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_) => Self::Text,
            ColumnType::Uuid => Self::Uuid,
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal(_)
            | ColumnType::Money(_)
            | ColumnType::Boolean => Self::Numeric,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Enum)
    }
}

/// Convert a JSON scalar to a bind value for a column of `kind`. Returns
/// `None` when the value cannot be stored in such a column.
#[must_use]
pub fn scalar_value(kind: ColumnKind, value: &Value) -> Option<SqlValue> {
    match (kind, value) {
        (ColumnKind::Uuid, Value::String(text)) => Uuid::parse_str(text.trim()).ok().map(Into::into),
        (ColumnKind::Uuid, _) | (ColumnKind::Numeric, Value::String(_)) => None,
        (_, Value::String(text)) => Some(text.trim().to_string().into()),
        (_, Value::Number(number)) => number
            .as_i64()
            .map(SqlValue::from)
            .or_else(|| number.as_f64().map(SqlValue::from)),
        (_, Value::Bool(flag)) => Some((*flag).into()),
        (_, Value::Null | Value::Array(_) | Value::Object(_)) => None,
    }
}

fn upper(column: &Expr) -> Expr {
    Expr::expr(Func::upper(column.clone()))
}

fn list_values(kind: ColumnKind, value: &Value) -> Option<Vec<SqlValue>> {
    let values: Vec<SqlValue> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| scalar_value(kind, item))
            .collect::<Option<_>>()?,
        other => vec![scalar_value(kind, other)?],
    };
    (!values.is_empty()).then_some(values)
}

/// Build `column <op> value` for a column of `kind`. Strings compare
/// case-insensitively against text columns. Returns `None` when the value
/// does not fit the operator or the column.
#[must_use]
pub fn build_expr(
    column: &Expr,
    kind: ColumnKind,
    operator: FilterOperator,
    value: &Value,
) -> Option<SimpleExpr> {
    match operator {
        FilterOperator::IsNull => match value {
            Value::Bool(false) => Some(column.clone().is_not_null()),
            Value::Bool(true) | Value::Null => Some(column.clone().is_null()),
            _ => None,
        },
        FilterOperator::In => list_values(kind, value).map(|values| column.clone().is_in(values)),
        FilterOperator::NotIn => {
            list_values(kind, value).map(|values| column.clone().is_not_in(values))
        }
        FilterOperator::Like => {
            let text = value.as_str()?.trim();
            (kind.is_textual() && !text.is_empty())
                .then(|| upper(column).like(format!("%{}%", text.to_uppercase())))
        }
        FilterOperator::Eq | FilterOperator::Neq if kind.is_textual() && value.is_string() => {
            let text = value.as_str()?.trim().to_uppercase();
            Some(match operator {
                FilterOperator::Eq => upper(column).eq(text),
                _ => upper(column).ne(text),
            })
        }
        FilterOperator::Eq if value.is_null() => Some(column.clone().is_null()),
        FilterOperator::Neq if value.is_null() => Some(column.clone().is_not_null()),
        FilterOperator::Eq => scalar_value(kind, value).map(|v| column.clone().eq(v)),
        FilterOperator::Neq => scalar_value(kind, value).map(|v| column.clone().ne(v)),
        FilterOperator::Gt => scalar_value(kind, value).map(|v| column.clone().gt(v)),
        FilterOperator::Gte => scalar_value(kind, value).map(|v| column.clone().gte(v)),
        FilterOperator::Lt => scalar_value(kind, value).map(|v| column.clone().lt(v)),
        FilterOperator::Lte => scalar_value(kind, value).map(|v| column.clone().lte(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Alias, Query, SqliteQueryBuilder};
    use serde_json::json;

    fn render(expr: SimpleExpr) -> String {
        Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("units"))
            .and_where(expr)
            .to_string(SqliteQueryBuilder)
    }

    fn floor() -> Expr {
        Expr::col((Alias::new("units"), Alias::new("floor")))
    }

    #[test]
    fn test_parse_plain_column() {
        let key = parse_filter_key("name").unwrap();
        assert!(!key.is_relation_path());
        assert_eq!(key.column, "name");
        assert_eq!(key.operator, None);
    }

    #[test]
    fn test_parse_operator_suffix() {
        let key = parse_filter_key("floor__gte").unwrap();
        assert_eq!(key.column, "floor");
        assert_eq!(key.operator, Some(FilterOperator::Gte));

        let key = parse_filter_key("monthly_rent__lt").unwrap();
        assert_eq!(key.column, "monthly_rent");
        assert_eq!(key.operator, Some(FilterOperator::Lt));
    }

    #[test]
    fn test_parse_relation_path() {
        let key = parse_filter_key("units.tenant_contact.name__like").unwrap();
        assert_eq!(key.path, vec!["units", "tenant_contact"]);
        assert_eq!(key.column, "name");
        assert_eq!(key.operator, Some(FilterOperator::Like));
    }

    #[test]
    fn test_parse_rejects_unknown_operator_and_empty_segments() {
        assert_eq!(parse_filter_key("floor__between"), None);
        assert_eq!(parse_filter_key("units..name"), None);
        assert_eq!(parse_filter_key(".name"), None);
    }

    #[test]
    fn test_operator_names_round_trip() {
        for operator in [
            FilterOperator::Eq,
            FilterOperator::Neq,
            FilterOperator::Gt,
            FilterOperator::Gte,
            FilterOperator::Lt,
            FilterOperator::Lte,
            FilterOperator::Like,
            FilterOperator::In,
            FilterOperator::NotIn,
            FilterOperator::IsNull,
        ] {
            assert_eq!(FilterOperator::from_name(operator.name()), Some(operator));
        }
    }

    #[test]
    fn test_implied_operator() {
        assert_eq!(FilterOperator::implied_by(&json!([1, 2])), FilterOperator::In);
        assert_eq!(FilterOperator::implied_by(&json!(null)), FilterOperator::IsNull);
        assert_eq!(FilterOperator::implied_by(&json!("x")), FilterOperator::Eq);
    }

    #[test]
    fn test_numeric_comparison_sql() {
        let sql = render(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::Gte, &json!(3)).unwrap());
        assert!(sql.contains(r#""units"."floor" >= 3"#), "{sql}");
    }

    #[test]
    fn test_text_equality_is_case_insensitive() {
        let label = Expr::col((Alias::new("units"), Alias::new("label")));
        let sql = render(build_expr(&label, ColumnKind::Text, FilterOperator::Eq, &json!(" 1a ")).unwrap());
        assert!(sql.contains(r#"UPPER("units"."label") = '1A'"#), "{sql}");
    }

    #[test]
    fn test_like_wraps_in_wildcards() {
        let label = Expr::col((Alias::new("units"), Alias::new("label")));
        let sql = render(build_expr(&label, ColumnKind::Text, FilterOperator::Like, &json!("ground")).unwrap());
        assert!(sql.contains("LIKE '%GROUND%'"), "{sql}");
    }

    #[test]
    fn test_in_and_not_in() {
        let sql = render(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::In, &json!([1, 2])).unwrap());
        assert!(sql.contains("IN (1, 2)"), "{sql}");

        let sql = render(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::NotIn, &json!([4])).unwrap());
        assert!(sql.contains("NOT IN (4)"), "{sql}");

        assert!(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::In, &json!([])).is_none());
    }

    #[test]
    fn test_is_null() {
        let sql = render(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::IsNull, &json!(true)).unwrap());
        assert!(sql.contains("IS NULL"), "{sql}");
        let sql = render(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::IsNull, &json!(false)).unwrap());
        assert!(sql.contains("IS NOT NULL"), "{sql}");
        assert!(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::IsNull, &json!("yes")).is_none());
    }

    #[test]
    fn test_values_that_do_not_fit_are_skipped() {
        assert!(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::Gt, &json!({"a": 1})).is_none());
        assert!(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::Like, &json!(3)).is_none());
    }

    #[test]
    fn test_strings_against_numeric_columns_are_skipped() {
        for operator in [FilterOperator::Eq, FilterOperator::Gte, FilterOperator::Like] {
            assert!(build_expr(&floor(), ColumnKind::Numeric, operator, &json!("3")).is_none());
        }
        assert!(build_expr(&floor(), ColumnKind::Numeric, FilterOperator::In, &json!([1, "x"])).is_none());
    }

    #[test]
    fn test_uuid_columns_only_take_uuids() {
        let id = Expr::col((Alias::new("units"), Alias::new("id")));
        assert!(build_expr(&id, ColumnKind::Uuid, FilterOperator::Like, &json!("ab")).is_none());
        assert!(build_expr(&id, ColumnKind::Uuid, FilterOperator::Eq, &json!("not-an-id")).is_none());
        assert!(build_expr(&id, ColumnKind::Uuid, FilterOperator::Eq, &json!(7)).is_none());

        let uuid = Uuid::new_v4().to_string();
        let sql = render(build_expr(&id, ColumnKind::Uuid, FilterOperator::Eq, &json!(uuid)).unwrap());
        assert!(!sql.contains("UPPER"), "{sql}");
    }

    #[test]
    fn test_uuid_looking_text_still_compares_as_text() {
        let label = Expr::col((Alias::new("units"), Alias::new("label")));
        let uuid = "6f1c2b1e-8f43-4a8e-9d2b-0c0e6f3a9b11";
        let sql = render(build_expr(&label, ColumnKind::Text, FilterOperator::Eq, &json!(uuid)).unwrap());
        assert!(sql.contains(&format!(r#"UPPER("units"."label") = '{}'"#, uuid.to_uppercase())), "{sql}");
    }
}
