//! Request path matching.

use std::sync::Arc;

use super::{to_string, Node, NodeKind};
use crate::cache::HitCounter;
use crate::params::Params;

/// Outcome of walking one tree.
#[derive(Debug)]
pub(crate) struct Match<'a, H> {
    pub(crate) handler: Option<&'a Arc<H>>,
    /// No route matched, but one exists with the trailing slash toggled.
    pub(crate) trailing_slash_redirect: bool,
    /// Hit count of the deepest wildcard node on the matched route, this
    /// match included. Zero for purely static routes and for misses.
    pub(crate) hits: u32,
}

impl<'a, H> Match<'a, H> {
    fn miss(trailing_slash_redirect: bool) -> Self {
        Self {
            handler: None,
            trailing_slash_redirect,
            hits: 0,
        }
    }

    fn found(handler: Option<&'a Arc<H>>, deepest: Option<&HitCounter>) -> Self {
        let hits = match (handler, deepest) {
            (Some(_), Some(counter)) => counter.bump(),
            _ => 0,
        };
        Self {
            handler,
            trailing_slash_redirect: false,
            hits,
        }
    }
}

impl<H> Node<H> {
    /// Find the handler registered for `path`.
    ///
    /// Captured parameters are appended to `params` as the walk goes; they
    /// are only meaningful when a handler is returned.
    pub(crate) fn get_value(&self, path: &str, params: &mut Params) -> Match<'_, H> {
        let mut path = path.as_bytes();
        let mut n = self;
        let mut deepest: Option<&HitCounter> = None;
        // whether the node we descended from has a handler
        let mut parent_handler = false;

        loop {
            let prefix = n.path.as_slice();

            if path.len() > prefix.len() {
                if path.starts_with(prefix) {
                    path = &path[prefix.len()..];

                    if !n.wild_child {
                        let idxc = path[0];
                        if let Some(i) = n.indices.iter().position(|&c| c == idxc) {
                            parent_handler = n.handler.is_some();
                            n = &n.children[i];
                            continue;
                        }

                        // Nothing found. Recommend dropping the trailing
                        // slash if a leaf exists for the path without it.
                        return Match::miss(path == b"/" && n.handler.is_some());
                    }

                    parent_handler = n.handler.is_some();
                    n = &n.children[0];
                    match &n.kind {
                        NodeKind::Param(counter) => {
                            deepest = Some(counter);

                            let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
                            if end == 0 {
                                // a parameter never matches an empty segment
                                return Match::miss(false);
                            }
                            params.push(to_string(&n.path[1..]), to_string(&path[..end]));

                            if end < path.len() {
                                if let Some(child) = n.children.first() {
                                    path = &path[end..];
                                    parent_handler = n.handler.is_some();
                                    n = child;
                                    continue;
                                }

                                // ... but we can't go deeper
                                return Match::miss(path.len() == end + 1);
                            }

                            if n.handler.is_some() {
                                return Match::found(n.handler.as_ref(), deepest);
                            }

                            let tsr = n.children.len() == 1
                                && n.children[0].path == b"/"
                                && n.children[0].handler.is_some();
                            return Match::miss(tsr);
                        }
                        NodeKind::CatchAll(counter) => {
                            // label is "/*name", the value keeps its leading '/'
                            params.push(to_string(&n.path[2..]), to_string(path));
                            return Match::found(n.handler.as_ref(), Some(counter));
                        }
                        NodeKind::Static | NodeKind::Root => return Match::miss(false),
                    }
                }
            } else if path == prefix {
                if n.handler.is_some() {
                    return Match::found(n.handler.as_ref(), deepest);
                }

                // the request is the parent route plus '/'
                if path == b"/" && !n.kind.is_root() {
                    return Match::miss(parent_handler);
                }

                // No handler here. Check for a route with an added '/'.
                let tsr = n
                    .indices
                    .iter()
                    .position(|&c| c == b'/')
                    .map(|i| &n.children[i])
                    .is_some_and(|child| {
                        (child.path.len() == 1 && child.handler.is_some())
                            || (child.kind.is_catch_all()
                                && child.children.first().is_some_and(|c| c.handler.is_some()))
                    });
                return Match::miss(tsr);
            }

            // Nothing found. Recommend adding a trailing slash if a leaf
            // exists for that path.
            let tsr = (path == b"/" && parent_handler)
                || (prefix.len() == path.len() + 1
                    && prefix[path.len()] == b'/'
                    && path == &prefix[..path.len()]
                    && n.handler.is_some());
            return Match::miss(tsr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HitCounters;

    fn build(routes: &[&str]) -> Node<String> {
        let counters = HitCounters::default();
        let mut root = Node::default();
        for route in routes {
            root.insert(route, Arc::new(route.to_string()), &counters)
                .unwrap_or_else(|e| panic!("inserting {route}: {e}"));
        }
        root
    }

    fn check_requests(root: &Node<String>, requests: &[(&str, Option<&str>, &[(&str, &str)])]) {
        for (path, route, expected) in requests {
            let mut params = Params::new();
            let found = root.get_value(path, &mut params);
            match (found.handler, route) {
                (Some(handler), Some(route)) => {
                    assert_eq!(handler.as_str(), *route, "wrong handler for {path}");
                    let got: Vec<(&str, &str)> = params.iter().collect();
                    assert_eq!(got.as_slice(), *expected, "wrong params for {path}");
                }
                (None, None) => {}
                (handler, route) => {
                    panic!("{path}: expected {route:?}, got {:?}", handler.map(|h| h.as_str()))
                }
            }
        }
    }

    #[test]
    fn test_static_routes() {
        let root = build(&[
            "/hi",
            "/contact",
            "/co",
            "/c",
            "/a",
            "/ab",
            "/doc/",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/α",
            "/β",
        ]);

        check_requests(
            &root,
            &[
                ("/a", Some("/a"), &[]),
                ("/", None, &[]),
                ("/hi", Some("/hi"), &[]),
                ("/contact", Some("/contact"), &[]),
                ("/co", Some("/co"), &[]),
                ("/con", None, &[]),
                ("/cona", None, &[]),
                ("/no", None, &[]),
                ("/ab", Some("/ab"), &[]),
                ("/α", Some("/α"), &[]),
                ("/β", Some("/β"), &[]),
                ("/doc/go1.html", Some("/doc/go1.html"), &[]),
            ],
        );
    }

    #[test]
    fn test_wildcard_routes() {
        let root = build(&[
            "/",
            "/cmd/:tool/:sub",
            "/cmd/:tool/",
            "/src/*filepath",
            "/search/",
            "/search/:query",
            "/user_:name",
            "/user_:name/about",
            "/files/:dir/*filepath",
            "/doc/",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/info/:user/public",
            "/info/:user/project/:project",
        ]);

        check_requests(
            &root,
            &[
                ("/", Some("/"), &[]),
                ("/cmd/test/", Some("/cmd/:tool/"), &[("tool", "test")]),
                ("/cmd/test", None, &[]),
                ("/cmd/test/3", Some("/cmd/:tool/:sub"), &[("tool", "test"), ("sub", "3")]),
                ("/src/", Some("/src/*filepath"), &[("filepath", "/")]),
                ("/src/some/file.png", Some("/src/*filepath"), &[("filepath", "/some/file.png")]),
                ("/search/", Some("/search/"), &[]),
                ("/search/someth!ng+in+ünìcodé", Some("/search/:query"), &[("query", "someth!ng+in+ünìcodé")]),
                ("/search/someth!ng+in+ünìcodé/", None, &[]),
                ("/user_gopher", Some("/user_:name"), &[("name", "gopher")]),
                ("/user_gopher/about", Some("/user_:name/about"), &[("name", "gopher")]),
                ("/files/js/inc/framework.js", Some("/files/:dir/*filepath"), &[("dir", "js"), ("filepath", "/inc/framework.js")]),
                ("/info/gordon/public", Some("/info/:user/public"), &[("user", "gordon")]),
                ("/info/gordon/project/go", Some("/info/:user/project/:project"), &[("user", "gordon"), ("project", "go")]),
            ],
        );
    }

    #[test]
    fn test_catch_all_value_keeps_leading_slash() {
        let root = build(&["/files/*path"]);
        let mut params = Params::new();
        let found = root.get_value("/files/a/b/c.txt", &mut params);
        assert!(found.handler.is_some());
        assert_eq!(params.get("path"), Some("/a/b/c.txt"));
    }

    #[test]
    fn test_trailing_slash_redirect() {
        let root = build(&[
            "/hi",
            "/b/",
            "/search/:query",
            "/cmd/:tool/",
            "/src/*filepath",
            "/x",
            "/x/y",
            "/y/",
            "/y/z",
            "/0/:id",
            "/0/:id/1",
            "/1/:id/",
            "/1/:id/2",
            "/aa",
            "/a/",
            "/admin",
            "/admin/:category",
            "/admin/:category/:page",
            "/doc",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/no/a",
            "/no/b",
            "/api/hello/:name",
        ]);

        let tsr_routes = [
            "/hi/",
            "/b",
            "/search/gopher/",
            "/cmd/vet",
            "/src",
            "/x/",
            "/y",
            "/0/go/",
            "/1/go",
            "/a",
            "/admin/",
            "/admin/config/",
            "/admin/config/permissions/",
            "/doc/",
        ];
        for route in tsr_routes {
            let mut params = Params::new();
            let found = root.get_value(route, &mut params);
            assert!(found.handler.is_none(), "non-nil handler for {route}");
            assert!(found.trailing_slash_redirect, "expected TSR for {route}");
        }

        let no_tsr_routes = ["/", "/no", "/no/", "/_", "/_/", "/api/world/abc"];
        for route in no_tsr_routes {
            let mut params = Params::new();
            let found = root.get_value(route, &mut params);
            assert!(found.handler.is_none(), "non-nil handler for {route}");
            assert!(!found.trailing_slash_redirect, "unexpected TSR for {route}");
        }
    }

    #[test]
    fn test_param_rejects_empty_segment() {
        let root = build(&["/user/:name/posts", "/src/:dir/*filepath"]);
        check_requests(
            &root,
            &[
                ("/user//posts", None, &[]),
                ("/user/", None, &[]),
                ("/src//a.txt", None, &[]),
                ("/user/gopher/posts", Some("/user/:name/posts"), &[("name", "gopher")]),
            ],
        );

        let mut params = Params::new();
        let found = root.get_value("/user//posts", &mut params);
        assert!(found.handler.is_none());
        assert!(!found.trailing_slash_redirect);
        assert!(params.is_empty());
    }

    #[test]
    fn test_root_trailing_slash_redirect() {
        let root = build(&["/:test"]);
        let mut params = Params::new();
        let found = root.get_value("/", &mut params);
        assert!(found.handler.is_none());
        assert!(!found.trailing_slash_redirect);
    }

    #[test]
    fn test_hits_count_deepest_wildcard() {
        let root = build(&["/static", "/users/:id", "/users/:id/posts/:post"]);

        let mut params = Params::new();
        assert_eq!(root.get_value("/static", &mut params).hits, 0);

        assert_eq!(root.get_value("/users/1", &mut params).hits, 1);
        assert_eq!(root.get_value("/users/2", &mut params).hits, 2);

        // the deeper route has its own counter
        assert_eq!(root.get_value("/users/1/posts/9", &mut params).hits, 1);
        assert_eq!(root.get_value("/users/1", &mut params).hits, 3);

        // misses are not counted
        assert_eq!(root.get_value("/users/1/posts", &mut params).hits, 0);
        assert_eq!(root.get_value("/users/3", &mut params).hits, 4);
    }

    #[test]
    fn test_catch_all_hits_are_counted() {
        let root = build(&["/src/*filepath"]);
        let mut params = Params::new();
        for expected in 1..=3 {
            assert_eq!(root.get_value("/src/a.txt", &mut params).hits, expected);
        }
    }
}
