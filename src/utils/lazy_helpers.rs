//! Known-schema projection with column validation
//!
//! Profile tables arrive with whatever extra columns the upstream export
//! carried. These helpers select exactly the columns the pipeline knows,
//! by name and with a fixed dtype, so later stages never depend on
//! column order, suffixes or inferred types.

use polars::prelude::*;
use anyhow::{anyhow, Context, Result};

/// One column of a known schema
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub dtype: DataType,
    pub required: bool,
}

impl ColumnSpec {
    pub fn required(name: &'static str, dtype: DataType) -> Self {
        Self { name, dtype, required: true }
    }

    pub fn optional(name: &'static str, dtype: DataType) -> Self {
        Self { name, dtype, required: false }
    }
}

/// Validate that every expected column is present
///
/// # Arguments
/// * `df` - DataFrame to check
/// * `columns` - Column names that must exist
/// * `context` - Context for error messages (e.g., "year 2021 profile 2")
///
/// # Errors
/// Returns error naming the first missing column and listing the
/// available ones
///
/// # Example
/// ```rust,ignore
/// require_columns(&df, &["account_id", "scope"], "year 2021 profile 2")?;
/// ```
pub fn require_columns(df: &DataFrame, columns: &[&str], context: &str) -> Result<()> {
    for &expected in columns {
        if df.column(expected).is_err() {
            let available: Vec<String> = df
                .get_column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            return Err(anyhow!(
                "{}: Missing expected column '{}'. Available columns: {:?}",
                context, expected, available
            ));
        }
    }
    Ok(())
}

/// Project a DataFrame onto a known schema
///
/// # Arguments
/// * `df` - Table as loaded, possibly with extra columns
/// * `schema` - Known columns with their dtypes
/// * `context` - Context for error messages (e.g., "year 2021 profile 1")
///
/// # Returns
/// DataFrame with exactly the schema columns, in schema order, each cast
/// to its declared dtype. Absent optional columns are all-null.
///
/// # Errors
/// Returns error if:
/// - A required column is missing
/// - A cast or the projection fails
///
/// # Example
/// ```rust,ignore
/// let projected = project_schema(&df, &profile_schema(), "year 2021 profile 1")?;
/// ```
pub fn project_schema(df: &DataFrame, schema: &[ColumnSpec], context: &str) -> Result<DataFrame> {
    let required: Vec<&str> = schema
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.name)
        .collect();
    require_columns(df, &required, context)?;

    let mut working = df.clone();
    for spec in schema.iter().filter(|spec| !spec.required) {
        if working.column(spec.name).is_err() {
            let nulls = Series::full_null(spec.name.into(), working.height(), &spec.dtype);
            working
                .with_column(nulls)
                .with_context(|| format!("{}: Failed to add null column '{}'", context, spec.name))?;
        }
    }

    let exprs: Vec<Expr> = schema
        .iter()
        .map(|spec| cast_expr(spec.name, &spec.dtype))
        .collect();

    working
        .lazy()
        .select(exprs)
        .collect()
        .with_context(|| format!("{}: Failed to project known columns", context))
}

/// Integers are cast through Float64 so values exported as "2020.0" survive
fn cast_expr(name: &str, dtype: &DataType) -> Expr {
    if dtype.is_integer() {
        col(name).cast(DataType::Float64).cast(dtype.clone())
    } else {
        col(name).cast(dtype.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::required("account_id", DataType::String),
            ColumnSpec::required("base_year", DataType::Int32),
            ColumnSpec::optional("organization", DataType::String),
        ]
    }

    #[test]
    fn test_project_schema_selects_and_casts() {
        let df = df![
            "extra_col" => &["e1", "e2"],
            "base_year" => &[2019.0, 2020.0],
            "account_id" => &[101i64, 202],
        ].unwrap();

        let projected = project_schema(&df, &schema(), "test").unwrap();

        let names: Vec<String> = projected
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["account_id", "base_year", "organization"]);
        assert_eq!(projected.height(), 2);

        let ids = projected.column("account_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("101"));
        let years = projected.column("base_year").unwrap().i32().unwrap();
        assert_eq!(years.get(1), Some(2020));
        let org = projected.column("organization").unwrap();
        assert_eq!(org.null_count(), 2);
    }

    #[test]
    fn test_project_schema_missing_required() {
        let df = df![
            "account_id" => &["A1"],
        ].unwrap();

        let result = project_schema(&df, &schema(), "2021 profile 1");

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("base_year"));
        assert!(err_msg.contains("2021 profile 1"));
    }

    #[test]
    fn test_require_columns_success() {
        let df = df![
            "account_id" => &["A1"],
            "scope" => &["Scope 1"],
        ].unwrap();

        assert!(require_columns(&df, &["account_id", "scope"], "test").is_ok());
    }
}
