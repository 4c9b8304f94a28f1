/// Looks up `key_value` in `table` by the column `key_of` selects and returns
/// the `value_of` column of the first matching row.
///
/// `None` covers both "no row matched" and "the matching row has no value";
/// duplicates past the first match are ignored.
pub fn resolve<R, K, V>(
    table: &[R],
    key_of: impl Fn(&R) -> K,
    key_value: K,
    value_of: impl Fn(&R) -> Option<V>,
) -> Option<V>
where
    K: PartialEq,
{
    table
        .iter()
        .find(|row| key_of(row) == key_value)
        .and_then(value_of)
}
