#![cfg(test)]

//! Test assertion to check SQL statements and parameters.

/// Assert that a statement has the expected SQL text and the expected parameters, in binding
/// order.
///
/// # Usage:
/// ```no_run
/// assert_binding!(statement, "SELECT ... WHERE a.id = ?", SqlValue::Int(1));
/// ```
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {
        let actual: $crate::sql::SqlStatement = $actual;
        assert_eq!(actual.sql, $expected_stmt);
        assert!(actual.params.is_empty(), "Extra actual parameters: {:?}", actual.params);
    };
    ($actual:expr, $expected_stmt:expr, $($expected_param:expr), +) => {
        let actual: $crate::sql::SqlStatement = $actual;
        assert_eq!(actual.sql, $expected_stmt);
        let expected_params: Vec<$crate::sql::SqlValue> = vec![$($expected_param), +];
        assert_eq!(actual.params, expected_params, "Parameter mismatch");
    };
}
