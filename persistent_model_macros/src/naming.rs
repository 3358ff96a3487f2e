/// `PersistentArticle` -> `persistent_article`, `HTTPHeader` -> `http_header`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// English plural of the last word: `item` -> `items`, `box` -> `boxes`,
/// `category` -> `categories`. Words already ending in a single `s` are kept.
pub fn pluralize(word: &str) -> String {
    const ES_SUFFIXES: [&str; 6] = ["ss", "x", "ch", "sh", "status", "alias"];
    if ES_SUFFIXES.iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", stem);
        }
    }

    format!("{}s", word)
}

/// `MyNamespace::Inner` or `my_namespace/inner` -> `my_namespace/inner`.
pub fn namespace_path(namespace: &str) -> String {
    namespace
        .split(|c: char| c == ':' || c == '/')
        .filter(|segment| !segment.is_empty())
        .map(to_snake_case)
        .collect::<Vec<_>>()
        .join("/")
}
