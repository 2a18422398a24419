/// Builds a [`Row`](crate::types::Row) from column/value pairs.
///
/// ```rust,ignore
/// let row = row! { "id" => "1", "username" => "alice", "age" => 30i64 };
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::types::Row::new()
    };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut row = $crate::types::Row::new();
        $(
            row.insert(
                ::std::string::String::from($col),
                $crate::types::Value::from($val),
            );
        )+
        row
    }};
}
