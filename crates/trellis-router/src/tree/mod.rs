//! Compressed radix trie holding the routes of one HTTP method.
//!
//! Every edge is labelled with the longest byte string shared by all routes
//! below it. Children are selected by their first byte through `indices`,
//! except for wildcard children: a node with a `:param` or `*catch-all`
//! child has exactly that one child and `wild_child` set.
//!
//! Labels are raw bytes rather than `str` because an edge split may fall in
//! the middle of a multi-byte UTF-8 sequence.
//!
//! Catch-all routes use two nodes that share a hit counter: an empty-label
//! node reached through the `/` index byte, whose single wild child holds
//! the `/*name` label and the handler.

mod case_insensitive;
mod lookup;

use std::mem;
use std::sync::Arc;

use crate::cache::{HitCounter, HitCounters};
use crate::error::RouteError;

/// Node kind. Wildcard kinds carry the hit counter used for cache promotion.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Static,
    Root,
    Param(HitCounter),
    CatchAll(HitCounter),
}

impl NodeKind {
    fn is_param(&self) -> bool {
        matches!(self, NodeKind::Param(_))
    }

    fn is_catch_all(&self) -> bool {
        matches!(self, NodeKind::CatchAll(_))
    }

    fn is_root(&self) -> bool {
        matches!(self, NodeKind::Root)
    }
}

#[derive(Debug)]
pub(crate) struct Node<H> {
    path: Vec<u8>,
    /// First byte of each child's label, parallel to `children`.
    indices: Vec<u8>,
    wild_child: bool,
    kind: NodeKind,
    /// Number of routes registered at or below this node.
    priority: u32,
    children: Vec<Node<H>>,
    handler: Option<Arc<H>>,
}

impl<H> Default for Node<H> {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            indices: Vec::new(),
            wild_child: false,
            kind: NodeKind::Static,
            priority: 0,
            children: Vec::new(),
            handler: None,
        }
    }
}

impl<H> Node<H> {
    /// Register `handler` under `pattern`.
    ///
    /// Pattern syntax errors are reported before the tree is touched.
    /// Conflicts are found while descending; a tree that rejected a route
    /// keeps resolving every previously registered route unchanged, and
    /// its priorities and child order are recounted from the registered
    /// handlers.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        handler: Arc<H>,
        counters: &HitCounters,
    ) -> Result<(), RouteError> {
        validate_pattern(pattern)?;

        let result = self.insert_route(pattern, handler, counters);
        if result.is_err() {
            self.recount_priorities();
        }
        result
    }

    fn insert_route(
        &mut self,
        pattern: &str,
        handler: Arc<H>,
        counters: &HitCounters,
    ) -> Result<(), RouteError> {
        let full_path = pattern.as_bytes();
        let mut path = full_path;
        self.priority += 1;

        // empty tree
        if self.path.is_empty() && self.indices.is_empty() && !self.wild_child {
            self.insert_child(path, full_path, handler, counters)?;
            self.kind = NodeKind::Root;
            return Ok(());
        }

        let mut n = self;
        loop {
            let i = longest_common_prefix(path, &n.path);

            // split edge
            if i < n.path.len() {
                let child = Node {
                    path: n.path.split_off(i),
                    indices: mem::take(&mut n.indices),
                    wild_child: n.wild_child,
                    kind: NodeKind::Static,
                    priority: n.priority.saturating_sub(1),
                    children: mem::take(&mut n.children),
                    handler: n.handler.take(),
                };

                n.indices = vec![child.path[0]];
                n.children = vec![child];
                n.wild_child = false;
            }

            if i == path.len() {
                if n.handler.is_some() {
                    return Err(RouteError::DuplicateRoute {
                        path: pattern.to_string(),
                    });
                }
                n.handler = Some(handler);
                return Ok(());
            }

            path = &path[i..];

            if n.wild_child {
                n = &mut n.children[0];
                n.priority += 1;

                if n.accepts_wildcard(path) {
                    continue;
                }

                if n.kind.is_catch_all() && path == n.path.as_slice() {
                    return Err(RouteError::DuplicateRoute {
                        path: pattern.to_string(),
                    });
                }

                let segment = if n.kind.is_catch_all() {
                    path
                } else {
                    path.split(|&c| c == b'/').next().unwrap_or(path)
                };

                return Err(RouteError::ConflictingWildcard {
                    path: pattern.to_string(),
                    segment: to_string(segment),
                    existing: existing_route(full_path, path, n),
                });
            }

            let idxc = path[0];

            // '/' after param
            if n.kind.is_param() && idxc == b'/' && n.children.len() == 1 {
                n = &mut n.children[0];
                n.priority += 1;
                continue;
            }

            if let Some(pos) = n.indices.iter().position(|&c| c == idxc) {
                n = n.increment_child_priority(pos);
                continue;
            }

            if idxc != b':' && idxc != b'*' {
                n.indices.push(idxc);
                n.children.push(Node::default());
                let pos = n.indices.len() - 1;
                n = n.increment_child_priority(pos);
            }

            return n.insert_child(path, full_path, handler, counters);
        }
    }

    /// Whether a route continuing with `path` can descend into this
    /// wildcard node instead of conflicting with it.
    fn accepts_wildcard(&self, path: &[u8]) -> bool {
        path.starts_with(&self.path)
            && !self.kind.is_catch_all()
            && (self.path.len() >= path.len() || path[self.path.len()] == b'/')
    }

    /// Reset every priority to the number of handlers at or below the node
    /// and sort static children to match. Returns this node's priority.
    fn recount_priorities(&mut self) -> u32 {
        let mut priority = u32::from(self.handler.is_some());
        for child in &mut self.children {
            priority += child.recount_priorities();
        }
        self.priority = priority;

        // wildcard children and the child of a param carry no index
        if self.children.len() > 1 && self.indices.len() == self.children.len() {
            let mut pairs: Vec<(u8, Node<H>)> = mem::take(&mut self.indices)
                .into_iter()
                .zip(mem::take(&mut self.children))
                .collect();
            pairs.sort_by(|a, b| b.1.priority.cmp(&a.1.priority));
            let (indices, children): (Vec<u8>, Vec<Node<H>>) = pairs.into_iter().unzip();
            self.indices = indices;
            self.children = children;
        }

        priority
    }

    /// Bump the priority of a child and move it in front of every sibling
    /// with a lower priority. Returns the child at its new position.
    fn increment_child_priority(&mut self, pos: usize) -> &mut Node<H> {
        self.children[pos].priority += 1;
        let priority = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < priority {
            self.children.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }

        if new_pos != pos {
            let index = self.indices.remove(pos);
            self.indices.insert(new_pos, index);
        }

        &mut self.children[new_pos]
    }

    /// Build the nodes for the not yet stored remainder `path` below this
    /// node, which must not have a label conflict with it.
    fn insert_child(
        &mut self,
        mut path: &[u8],
        full_path: &[u8],
        handler: Arc<H>,
        counters: &HitCounters,
    ) -> Result<(), RouteError> {
        let mut n = self;

        while let Some(wildcard) = find_wildcard(path) {
            let mut i = wildcard.start;
            let name = wildcard.name;

            if !wildcard.valid {
                return Err(RouteError::MultipleWildcardsInSegment {
                    path: to_string(full_path),
                    segment: to_string(name),
                });
            }

            if name.len() < 2 {
                return Err(RouteError::NamelessWildcard {
                    path: to_string(full_path),
                    wildcard: to_string(name),
                });
            }

            if let Some(existing) = n.children.first() {
                let existing = format!(
                    "{}{}",
                    to_string(&full_path[..full_path.len() - path.len()]),
                    existing.sample_route()
                );
                return Err(if name[0] == b':' {
                    RouteError::ConflictingWildcard {
                        path: to_string(full_path),
                        segment: to_string(name),
                        existing,
                    }
                } else {
                    RouteError::CatchAllConflictsWithChildren {
                        path: to_string(full_path),
                        existing,
                    }
                });
            }

            if name[0] == b':' {
                if i > 0 {
                    n.path = path[..i].to_vec();
                    path = &path[i..];
                }

                n.wild_child = true;
                n.children = vec![Node {
                    path: name.to_vec(),
                    kind: NodeKind::Param(counters.track()),
                    priority: 1,
                    ..Node::default()
                }];
                n = &mut n.children[0];

                // the pattern continues with a static part after the param
                if name.len() < path.len() {
                    path = &path[name.len()..];
                    n.children = vec![Node {
                        priority: 1,
                        ..Node::default()
                    }];
                    n = &mut n.children[0];
                    continue;
                }

                n.handler = Some(handler);
                return Ok(());
            }

            if i + name.len() != path.len() {
                return Err(RouteError::CatchAllMustBeLast {
                    path: to_string(full_path),
                });
            }

            if n.path.last() == Some(&b'/') {
                return Err(RouteError::CatchAllConflictsWithChildren {
                    path: to_string(full_path),
                    existing: to_string(&full_path[..full_path.len() - path.len()]),
                });
            }

            if i == 0 || path[i - 1] != b'/' {
                return Err(RouteError::NoSlashBeforeCatchAll {
                    path: to_string(full_path),
                });
            }

            i -= 1;
            let hits = counters.track();

            n.path = path[..i].to_vec();
            n.indices = vec![b'/'];
            n.children = vec![Node {
                wild_child: true,
                kind: NodeKind::CatchAll(hits.clone()),
                priority: 1,
                children: vec![Node {
                    path: path[i..].to_vec(),
                    kind: NodeKind::CatchAll(hits),
                    priority: 1,
                    handler: Some(handler),
                    ..Node::default()
                }],
                ..Node::default()
            }];

            return Ok(());
        }

        n.path = path.to_vec();
        n.handler = Some(handler);
        Ok(())
    }

    /// Label of this node followed by the labels down to the first route
    /// below it, used to name the existing side of a conflict.
    fn sample_route(&self) -> String {
        let mut route = self.path.clone();
        let mut n = self;
        while n.handler.is_none() {
            match n.children.first() {
                Some(child) => {
                    route.extend_from_slice(&child.path);
                    n = child;
                }
                None => break,
            }
        }
        to_string(&route)
    }
}

fn existing_route<H>(full_path: &[u8], remaining: &[u8], node: &Node<H>) -> String {
    format!(
        "{}{}",
        to_string(&full_path[..full_path.len() - remaining.len()]),
        node.sample_route()
    )
}

/// Check the syntax of a route pattern without touching any tree.
pub(crate) fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::PathMustStartWithSlash {
            path: pattern.to_string(),
        });
    }

    let bytes = pattern.as_bytes();
    let mut offset = 0;

    while let Some(wildcard) = find_wildcard(&bytes[offset..]) {
        let start = offset + wildcard.start;
        let name = wildcard.name;

        if !wildcard.valid {
            return Err(RouteError::MultipleWildcardsInSegment {
                path: pattern.to_string(),
                segment: to_string(name),
            });
        }

        if name.len() < 2 {
            return Err(RouteError::NamelessWildcard {
                path: pattern.to_string(),
                wildcard: to_string(name),
            });
        }

        if name[0] == b'*' {
            if start + name.len() != bytes.len() {
                return Err(RouteError::CatchAllMustBeLast {
                    path: pattern.to_string(),
                });
            }
            if bytes[start - 1] != b'/' {
                return Err(RouteError::NoSlashBeforeCatchAll {
                    path: pattern.to_string(),
                });
            }
        }

        offset = start + name.len();
    }

    Ok(())
}

/// A wildcard found in a pattern.
#[derive(Debug, PartialEq, Eq)]
struct Wildcard<'a> {
    /// Byte offset of the `:` or `*` marker.
    start: usize,
    /// Marker plus name, up to the next `/` or the end.
    name: &'a [u8],
    /// False when the segment contains a second marker.
    valid: bool,
}

fn find_wildcard(path: &[u8]) -> Option<Wildcard<'_>> {
    let start = path.iter().position(|&c| c == b':' || c == b'*')?;

    let mut valid = true;
    for (offset, &c) in path[start + 1..].iter().enumerate() {
        match c {
            b'/' => {
                return Some(Wildcard {
                    start,
                    name: &path[start..start + 1 + offset],
                    valid,
                })
            }
            b':' | b'*' => valid = false,
            _ => {}
        }
    }

    Some(Wildcard {
        start,
        name: &path[start..],
        valid,
    })
}

fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
