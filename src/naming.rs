//! Argument-name conventions shared by the binder and the CLI.

/// Separator used in argument names (`log_file`).
pub const SEPARATOR: char = '_';

/// Converts a field identifier to its argument name.
///
/// Runs of capitals are kept together as acronyms; a separator goes before an
/// uppercase letter when the previous character is lowercase, or when the next
/// one is lowercase and the letter is not the first character:
///
/// - `LogFile` → `log_file`
/// - `UserID` → `user_id`
/// - `OOMReason` → `oom_reason`
/// - `EnableTLSV12Support` → `enable_tlsv12_support`
///
/// Applying it to its own output is a no-op.
pub fn to_param_name(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }
        let prev_lower = i > 0 && chars[i - 1].is_lowercase();
        let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
        if i > 0 && (prev_lower || next_lower) {
            out.push(SEPARATOR);
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// Normalizes a name the way the host does before exporting it: every run of
/// non-alphanumeric characters becomes one `separator`, leading and trailing
/// separators are dropped, and the result is lower-cased.
pub fn sanitize_arg_name(name: &str, separator: char) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with(separator) {
            out.push(separator);
        }
    }

    if out.ends_with(separator) {
        out.pop();
    }

    out.to_lowercase()
}

/// Identifier → sanitized argument name, as the binder resolves it when no
/// override is given.
pub fn arg_name_for(ident: &str) -> String {
    sanitize_arg_name(&to_param_name(ident), SEPARATOR)
}

// ------------------------------- Tests ------------------------------------ //
