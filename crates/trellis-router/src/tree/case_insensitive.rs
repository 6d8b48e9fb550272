//! Case-insensitive lookup, used to build fixed-path redirects.
//!
//! The walk follows index bytes of the lowercased rune first and falls back
//! to the uppercased rune. Because a child may be selected by the first byte
//! of a multi-byte rune, the remaining bytes of the rune being matched are
//! carried along in a small buffer.

use super::{Node, NodeKind};

impl<H> Node<H> {
    /// Case-insensitive lookup of `path`.
    ///
    /// Returns the path as registered: static parts in the registered
    /// spelling, wildcard values as given in the request. With
    /// `fix_trailing_slash`, a path that only matches with a trailing slash
    /// added or removed is corrected as well.
    pub(crate) fn find_case_insensitive_path(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        if !path.starts_with('/') {
            return None;
        }

        let mut ci_path = Vec::with_capacity(path.len() + 1);
        if self.find_ci_rec(path.as_bytes(), &mut ci_path, [0; 4], fix_trailing_slash, false) {
            String::from_utf8(ci_path).ok()
        } else {
            None
        }
    }

    /// Appends the registered spelling of the matched route to `ci_path`.
    /// On failure `ci_path` may hold a partial result; callers truncate.
    fn find_ci_rec(
        &self,
        mut path: &[u8],
        ci_path: &mut Vec<u8>,
        mut rb: [u8; 4],
        fix: bool,
        mut parent_handler: bool,
    ) -> bool {
        let mut n = self;
        let mut np_len = n.path.len();

        'walk: while path.len() >= np_len && (np_len == 0 || eq_fold(&path[1..np_len], &n.path[1..])) {
            let old_path = path;
            path = &path[np_len..];
            ci_path.extend_from_slice(&n.path);

            if path.is_empty() {
                if n.handler.is_some() {
                    return true;
                }

                // try adding a trailing slash
                if fix {
                    if let Some(i) = index_of(&n.indices, b'/') {
                        let child = &n.children[i];
                        if (child.path.len() == 1 && child.handler.is_some())
                            || (child.kind.is_catch_all()
                                && child.children.first().is_some_and(|c| c.handler.is_some()))
                        {
                            ci_path.push(b'/');
                            return true;
                        }
                    }
                }
                return false;
            }

            if !n.wild_child {
                rb = shift_rune_bytes(rb, np_len);

                if rb[0] != 0 {
                    // old rune not finished
                    if let Some(i) = index_of(&n.indices, rb[0]) {
                        parent_handler = n.handler.is_some();
                        n = &n.children[i];
                        np_len = n.path.len();
                        continue 'walk;
                    }
                } else if let Some((rune, off)) = rune_at(old_path, np_len) {
                    let lo = simple_lower(rune);
                    let lo_rb = shift_rune_bytes(encode_rune(lo), off);

                    // Both the lowercase and the uppercase byte may be an
                    // index, so the lowercase branch is tried recursively.
                    if let Some(i) = index_of(&n.indices, lo_rb[0]) {
                        let mark = ci_path.len();
                        if n.children[i].find_ci_rec(path, ci_path, lo_rb, fix, n.handler.is_some()) {
                            return true;
                        }
                        ci_path.truncate(mark);
                    }

                    let up = simple_upper(rune);
                    if up != lo {
                        rb = shift_rune_bytes(encode_rune(up), off);
                        if let Some(i) = index_of(&n.indices, rb[0]) {
                            parent_handler = n.handler.is_some();
                            n = &n.children[i];
                            np_len = n.path.len();
                            continue 'walk;
                        }
                    }
                }

                // try removing the trailing slash
                return fix && path == b"/" && n.handler.is_some();
            }

            n = &n.children[0];
            match &n.kind {
                NodeKind::Param(_) => {
                    let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
                    if end == 0 {
                        return false;
                    }
                    ci_path.extend_from_slice(&path[..end]);

                    if end < path.len() {
                        if let Some(child) = n.children.first() {
                            parent_handler = n.handler.is_some();
                            n = child;
                            np_len = n.path.len();
                            path = &path[end..];
                            // the param ended on a rune boundary
                            rb = [0; 4];
                            continue 'walk;
                        }

                        return fix && path.len() == end + 1;
                    }

                    if n.handler.is_some() {
                        return true;
                    }

                    if fix
                        && n.children.len() == 1
                        && n.children[0].path == b"/"
                        && n.children[0].handler.is_some()
                    {
                        ci_path.push(b'/');
                        return true;
                    }
                    return false;
                }
                NodeKind::CatchAll(_) => {
                    ci_path.extend_from_slice(path);
                    return n.handler.is_some();
                }
                NodeKind::Static | NodeKind::Root => return false,
            }
        }

        // Nothing found. Try adding or removing a trailing slash.
        if fix {
            if path == b"/" {
                return parent_handler;
            }

            if !path.is_empty()
                && path.len() + 1 == np_len
                && n.path[path.len()] == b'/'
                && eq_fold(&path[1..], &n.path[1..path.len()])
                && n.handler.is_some()
            {
                ci_path.extend_from_slice(&n.path);
                return true;
            }
        }

        false
    }
}

fn index_of(indices: &[u8], c: u8) -> Option<usize> {
    indices.iter().position(|&i| i == c)
}

/// Drop the first `n` bytes of a rune buffer.
fn shift_rune_bytes(rb: [u8; 4], n: usize) -> [u8; 4] {
    match n {
        0 => rb,
        1 => [rb[1], rb[2], rb[3], 0],
        2 => [rb[2], rb[3], 0, 0],
        3 => [rb[3], 0, 0, 0],
        _ => [0; 4],
    }
}

fn encode_rune(c: char) -> [u8; 4] {
    let mut buf = [0; 4];
    c.encode_utf8(&mut buf);
    buf
}

fn is_rune_start(b: u8) -> bool {
    b & 0xC0 != 0x80
}

/// Find the rune covering `old_path[np_len]`, looking back into the bytes
/// just matched by the node label. Returns the rune and how many of its
/// bytes were already consumed.
fn rune_at(old_path: &[u8], np_len: usize) -> Option<(char, usize)> {
    (0..=np_len.min(3)).find_map(|off| {
        let i = np_len - off;
        is_rune_start(old_path[i]).then(|| (decode_rune(&old_path[i..]), off))
    })
}

fn decode_rune(bytes: &[u8]) -> char {
    let len = match bytes.first() {
        Some(&b) if b < 0x80 => 1,
        Some(&b) if b >= 0xF0 => 4,
        Some(&b) if b >= 0xE0 => 3,
        Some(&b) if b >= 0xC0 => 2,
        _ => return char::REPLACEMENT_CHARACTER,
    };

    bytes
        .get(..len)
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Single-char lowercase mapping; chars that lowercase to several chars
/// are left alone.
fn simple_lower(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn simple_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn eq_fold(a: &[u8], b: &[u8]) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }

    let a = String::from_utf8_lossy(a);
    let b = String::from_utf8_lossy(b);
    a.chars().map(simple_lower).eq(b.chars().map(simple_lower))
}
