//! Request path canonicalization.

/// Return the canonical form of a URL path.
///
/// - repeated slashes collapse into one
/// - `.` elements are removed
/// - `..` elements remove the preceding element (never above the root)
/// - a missing leading slash is added
/// - a trailing slash is kept, and added when the last element is `.`
///
/// The trailing slash is significant: the result is used to look for a
/// registered route.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut trailing = path.len() > 1 && path.ends_with('/');
    let mut elements: Vec<&str> = Vec::new();

    let mut parts = path.split('/').peekable();
    while let Some(part) = parts.next() {
        let last = parts.peek().is_none();
        match part {
            "" => {}
            "." => {
                if last {
                    trailing = true;
                }
            }
            ".." => {
                elements.pop();
            }
            element => elements.push(element),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for element in &elements {
        cleaned.push('/');
        cleaned.push_str(element);
    }

    if cleaned.is_empty() {
        cleaned.push('/');
    } else if trailing {
        cleaned.push('/');
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_keeps_canonical_paths() {
        for path in ["/", "/abc", "/a/b/c", "/abc/", "/a/b/c/"] {
            assert_eq!(clean_path(path), path);
        }
    }

    #[test]
    fn clean_adds_leading_slash() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("abc"), "/abc");
        assert_eq!(clean_path("a/b/c"), "/a/b/c");
        assert_eq!(clean_path("abc/"), "/abc/");
    }

    #[test]
    fn clean_collapses_slashes() {
        assert_eq!(clean_path("//"), "/");
        assert_eq!(clean_path("/abc//"), "/abc/");
        assert_eq!(clean_path("/abc/def//"), "/abc/def/");
        assert_eq!(clean_path("/a//b//c/"), "/a/b/c/");
    }

    #[test]
    fn clean_removes_dot_elements() {
        assert_eq!(clean_path("."), "/");
        assert_eq!(clean_path("./"), "/");
        assert_eq!(clean_path("/abc/./def"), "/abc/def");
        assert_eq!(clean_path("/./abc/def"), "/abc/def");
        assert_eq!(clean_path("/abc/."), "/abc/");
    }

    #[test]
    fn clean_resolves_parent_elements() {
        assert_eq!(clean_path(".."), "/");
        assert_eq!(clean_path("../../.."), "/");
        assert_eq!(clean_path("/abc/def/../ghi/../jkl"), "/abc/jkl");
        assert_eq!(clean_path("/abc/def/.."), "/abc");
        assert_eq!(clean_path("/abc/def/../.."), "/");
        assert_eq!(clean_path("/abc/def/../../.."), "/");
        assert_eq!(clean_path("abc/../../../def"), "/def");
    }

    #[test]
    fn clean_keeps_dotted_names() {
        assert_eq!(clean_path("/..abc"), "/..abc");
        assert_eq!(clean_path("/abc.../"), "/abc.../");
    }
}
