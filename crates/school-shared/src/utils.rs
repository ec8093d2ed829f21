//! Utility functions

/// `date_of_birth` -> `dateOfBirth`
pub fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `dateOfBirth` -> `date_of_birth`
pub fn to_snake_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for ch in camel.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Resolves a JSON key in camelCase, PascalCase or snake_case to its column name
pub fn normalize_field_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => {
            let lowered: String = first.to_lowercase().chain(chars).collect();
            to_snake_case(&lowered)
        }
        None => String::new(),
    }
}
