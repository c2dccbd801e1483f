/// Join path segments into an absolute registry path.
///
/// Empty segments and redundant separators are dropped; the result always
/// starts with `/` and never ends with one (except for the root itself).
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .flat_map(|p| p.as_ref().split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

/// Parent of an absolute path, `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Last segment of an absolute path.
pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_normalizes_separators() {
        assert_eq!(join(&["/hydra/", "/api", "conf/"]), "/hydra/api/conf");
        assert_eq!(join(&["a", "", "b"]), "/a/b");
        assert_eq!(join::<&str>(&[]), "/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/a/b/c"), Some("/a/b"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(base_name("/a/b/c"), "c");
    }
}
