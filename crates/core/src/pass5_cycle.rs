//! Pass 5: Cycle guard -- commit proposed parent edges in input order,
//! rejecting any edge whose proposed parent already descends from the
//! child through committed edges.
//!
//! Every child is still a tree top when its own edge is proposed, so an
//! edge closes a loop exactly when the parent's tree top is the child.
//! Tree tops are tracked with a union-find, keeping acceptance near
//! constant time; the ancestor path is only walked for rejected edges.

use crate::pass4_resolve::Resolution;
use crate::snapshot::{ParentRef, UplineSource};
use std::collections::HashMap;
use tracing::warn;

/// An edge the guard refused to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleBreak {
    pub child_id: String,
    pub rejected_parent: String,
    /// Ancestor path from the rejected parent back to the child.
    pub path: Vec<String>,
}

/// Committed edges over a fixed set of contact ids.
pub struct CycleGuard<'a> {
    ids: &'a [&'a str],
    slots: HashMap<&'a str, usize>,
    /// Committed parent per contact.
    up: Vec<Option<usize>>,
    /// Union-find links; a representative is always its tree's top.
    rep: Vec<usize>,
}

impl<'a> CycleGuard<'a> {
    pub fn new(ids: &'a [&'a str]) -> Self {
        CycleGuard {
            ids,
            slots: ids.iter().enumerate().map(|(i, id)| (*id, i)).collect(),
            up: vec![None; ids.len()],
            rep: (0..ids.len()).collect(),
        }
    }

    fn top(&mut self, mut i: usize) -> usize {
        let mut root = i;
        while self.rep[root] != root {
            root = self.rep[root];
        }
        while self.rep[i] != root {
            let next = self.rep[i];
            self.rep[i] = root;
            i = next;
        }
        root
    }

    /// Commit `child -> parent`, or return the ancestor path from `parent`
    /// back to `child` when the edge would close a loop. Ids outside the
    /// guard's set have no ancestors and are always accepted.
    pub fn propose(&mut self, child: &str, parent: &str) -> Result<(), Vec<String>> {
        let (Some(&c), Some(&p)) = (self.slots.get(child), self.slots.get(parent)) else {
            return Ok(());
        };
        let top = self.top(p);
        if top == c {
            return Err(self.path(p, c));
        }
        // `c` is a tree top, so it is its own representative.
        self.up[c] = Some(p);
        self.rep[c] = top;
        Ok(())
    }

    fn path(&self, from: usize, to: usize) -> Vec<String> {
        let mut path = vec![self.ids[from].to_string()];
        let mut cur = from;
        while cur != to {
            match self.up[cur] {
                Some(next) => {
                    path.push(self.ids[next].to_string());
                    cur = next;
                }
                None => break,
            }
        }
        path
    }
}

/// Commit every proposal in order. Rejected contacts lose their parent
/// and are reported as cycle breaks.
pub fn commit_edges(
    contact_ids: &[&str],
    resolutions: Vec<Resolution>,
) -> (Vec<Resolution>, Vec<CycleBreak>) {
    let mut guard = CycleGuard::new(contact_ids);
    let mut breaks = Vec::new();
    let mut committed = Vec::with_capacity(resolutions.len());

    for (child, mut r) in contact_ids.iter().zip(resolutions) {
        // Synthetic nodes are always roots and cannot close a loop.
        let proposed = match &r.parent {
            Some(ParentRef::Contact(parent)) => Some(parent.clone()),
            _ => None,
        };
        if let Some(parent) = proposed {
            if let Err(path) = guard.propose(child, &parent) {
                warn!(
                    child = %child,
                    parent = %parent,
                    path = %path.join(" \u{2192} "),
                    "upline edge rejected: would create a cycle"
                );
                breaks.push(CycleBreak {
                    child_id: child.to_string(),
                    rejected_parent: parent,
                    path,
                });
                r.parent = None;
                r.source = UplineSource::Unknown;
                r.confidence = UplineSource::Unknown.confidence();
            }
        }
        committed.push(r);
    }

    (committed, breaks)
}
