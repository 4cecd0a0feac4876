/// Quote a free-text field for CSV when it contains a delimiter, quote, or
/// newline; embedded quotes are doubled.
pub fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join already-escaped fields into one CSV row.
pub fn row(fields: &[String]) -> String {
    fields.join(",")
}
