//! Default column names: camelCase property names to snake_case.

/// `"stationKey"` -> `"station_key"`. Each uppercase ASCII letter after the
/// first character starts a new `_`-separated word.
pub fn to_snake_case(property: &str) -> String {
    let mut column = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            if !column.is_empty() {
                column.push('_');
            }
            column.push(c.to_ascii_lowercase());
        } else {
            column.push(c);
        }
    }
    column
}
