//! Identifier conversions for generated TypeScript.

/// TypeScript reserved words that cannot be used as parameter names.
const RESERVED_WORDS: &[&str] = &[
    "arguments",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// JavaScript globals a generated class must not shadow.
const JS_GLOBALS: &[&str] = &[
    "Array", "Boolean", "Date", "Error", "Function", "Intl", "Iterator", "JSON", "Map", "Math",
    "Number", "Object", "Promise", "Proxy", "Reflect", "RegExp", "Set", "String", "Symbol",
];

/// Converts `snake_case` or `kebab-case` to camelCase.
#[must_use]
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' || c == '-' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Converts a string to PascalCase.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if c == '_' || c == '-' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Converts PascalCase (including acronym runs) to kebab-case.
///
/// `HeaderBar` becomes `header-bar`, `IMContext` becomes `im-context`.
#[must_use]
pub fn to_kebab_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !result.is_empty() && !result.ends_with('-') {
                result.push('-');
            }
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !result.ends_with('-') {
                result.push('-');
            }
        }
        result.push(c.to_ascii_lowercase());
    }

    result
}

/// Converts an enum member name to SCREAMING_SNAKE_CASE.
///
/// Names that would start with a digit get a leading underscore.
#[must_use]
pub fn to_member_name(s: &str) -> String {
    let upper: String = s
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    if upper.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{upper}")
    } else {
        upper
    }
}

/// Returns a camelCase parameter name that is a valid identifier.
#[must_use]
pub fn to_param_name(s: &str) -> String {
    let name = to_camel_case(s);
    if name.is_empty() {
        return "arg".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{name}");
    }
    if is_reserved_word(&name) {
        format!("{name}_")
    } else {
        name
    }
}

/// Returns true if `name` is a TypeScript reserved word.
#[must_use]
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Returns true if a class called `name` would shadow a JavaScript global.
#[must_use]
pub fn shadows_global(name: &str) -> bool {
    JS_GLOBALS.contains(&name)
}

/// Returns the TypeScript class name for a type.
///
/// Names that shadow JavaScript globals are prefixed with their namespace,
/// so `GObject.Object` becomes `GObjectObject`.
#[must_use]
pub fn transformed_type_name(namespace: &str, name: &str) -> String {
    if shadows_global(name) {
        format!("{namespace}{name}")
    } else {
        name.to_string()
    }
}
