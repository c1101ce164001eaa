//! Pass 7: Snapshot serialization -- canonical JSON with sorted keys.
//!
//! Pure rendering; no resolution decisions are made here. Two layouts are
//! supported (nested tree or flat id map) and synthetic nodes can either be
//! kept inline or flattened away, promoting their children to roots.

use crate::snapshot::{ForestNode, ResolvedNode, Snapshot, SyntheticGroupNode};
use crate::SNAPSHOT_FORMAT_VERSION;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Roots with children nested recursively.
    #[default]
    Tree,
    /// `roots` id list plus a `nodes` id map.
    Flat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticMode {
    #[default]
    Inline,
    /// Drop synthetic nodes; their children become roots tagged with
    /// `synthetic_group`.
    Flatten,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub layout: Layout,
    pub synthetic: SyntheticMode,
    /// Leave out opportunity-pipeline payloads.
    pub omit_pipeline: bool,
}

pub fn emit(snapshot: &Snapshot, options: &EmitOptions) -> Value {
    let mut emitter = Emitter {
        snapshot,
        options,
        flat: Map::new(),
    };
    let roots = emitter.walk();

    let mut out = Map::new();
    out.insert("fallback_root".to_owned(), json!(snapshot.fallback_root));
    out.insert("issues".to_owned(), snapshot.issues.to_json());
    out.insert("kind".to_owned(), json!("OrgSnapshot"));
    out.insert(
        "layout".to_owned(),
        json!(match options.layout {
            Layout::Tree => "tree",
            Layout::Flat => "flat",
        }),
    );
    if options.layout == Layout::Flat {
        out.insert("nodes".to_owned(), Value::Object(emitter.flat));
    }
    out.insert("roots".to_owned(), Value::Array(roots));
    out.insert(
        "stats".to_owned(),
        serde_json::to_value(snapshot.stats).unwrap_or_default(),
    );
    out.insert("version".to_owned(), json!(SNAPSHOT_FORMAT_VERSION));
    Value::Object(out)
}

/// Pending work for the walk. `Open` schedules a node's children;
/// `Close` renders the node once they are all placed.
enum Step<'s> {
    Open {
        id: &'s str,
        depth_offset: usize,
        group: Option<&'s str>,
    },
    Close {
        id: &'s str,
        depth_offset: usize,
        group: Option<&'s str>,
    },
}

struct Emitter<'a> {
    snapshot: &'a Snapshot,
    options: &'a EmitOptions,
    flat: Map<String, Value>,
}

impl<'a> Emitter<'a> {
    /// Depth-first walk with an explicit stack, so hierarchy depth never
    /// turns into call depth. `levels` holds the values placed so far at
    /// each open node; the bottom entry collects the roots. A flattened
    /// synthetic node opens no level, so its children land one level up.
    fn walk(&mut self) -> Vec<Value> {
        let snapshot: &'a Snapshot = self.snapshot;
        let mut levels: Vec<Vec<Value>> = vec![Vec::new()];
        let mut stack: Vec<Step<'a>> = snapshot
            .roots
            .iter()
            .rev()
            .map(|id| Step::Open {
                id: id.as_str(),
                depth_offset: 0,
                group: None,
            })
            .collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Open {
                    id,
                    depth_offset,
                    group,
                } => {
                    let Some(node) = snapshot.get(id) else {
                        continue;
                    };
                    let (children, child_offset, child_group) = match node {
                        ForestNode::Synthetic(s)
                            if self.options.synthetic == SyntheticMode::Flatten =>
                        {
                            (s.child_ids.as_slice(), depth_offset + 1, Some(s.id.as_str()))
                        }
                        _ => {
                            stack.push(Step::Close {
                                id,
                                depth_offset,
                                group,
                            });
                            levels.push(Vec::new());
                            (node.child_ids(), depth_offset, None)
                        }
                    };
                    stack.extend(children.iter().rev().map(|child| Step::Open {
                        id: child.as_str(),
                        depth_offset: child_offset,
                        group: child_group,
                    }));
                }
                Step::Close {
                    id,
                    depth_offset,
                    group,
                } => {
                    let children = levels.pop().unwrap_or_default();
                    let obj = match snapshot.get(id) {
                        Some(ForestNode::Contact(n)) => {
                            contact_object(n, depth_offset, group, self.options.omit_pipeline)
                        }
                        Some(ForestNode::Synthetic(s)) => synthetic_object(s),
                        None => continue,
                    };
                    let placed = self.place(id, obj, children);
                    if let Some(parent_level) = levels.last_mut() {
                        parent_level.push(placed);
                    }
                }
            }
        }
        levels.pop().unwrap_or_default()
    }

    fn place(&mut self, id: &str, mut obj: Map<String, Value>, children: Vec<Value>) -> Value {
        match self.options.layout {
            Layout::Tree => {
                obj.insert("children".to_owned(), Value::Array(children));
                Value::Object(obj)
            }
            Layout::Flat => {
                obj.insert("child_ids".to_owned(), Value::Array(children));
                self.flat.insert(id.to_owned(), Value::Object(obj));
                json!(id)
            }
        }
    }
}

fn contact_object(
    n: &ResolvedNode,
    depth_offset: usize,
    group: Option<&str>,
    omit_pipeline: bool,
) -> Map<String, Value> {
    let c = &n.contact;
    let mut m = Map::new();
    m.insert(
        "branch_status".to_owned(),
        json!({
            "active": n.branch_status.active,
            "inactive": n.branch_status.inactive,
            "pending": n.branch_status.pending,
        }),
    );
    m.insert("depth".to_owned(), json!(n.depth.saturating_sub(depth_offset)));
    m.insert("descendant_count".to_owned(), json!(n.descendant_count));
    m.insert("display_name".to_owned(), json!(c.display_name));
    m.insert("email".to_owned(), json!(c.email));
    m.insert("id".to_owned(), json!(c.id));
    m.insert(
        "issues".to_owned(),
        json!({
            "cycle_break": n.issues.cycle_break,
            "duplicate_identifier": n.issues.duplicate_identifier,
            "missing_identifier": n.issues.missing_identifier,
            "upline_not_found": n.issues.upline_not_found,
        }),
    );
    m.insert("licensing_number".to_owned(), json!(c.licensing_number));
    m.insert("node_type".to_owned(), json!("contact"));
    // Under a flattened synthetic node the contact becomes a root.
    let parent_id = match group {
        Some(_) => None,
        None => n.parent_id(),
    };
    m.insert("parent_id".to_owned(), json!(parent_id));
    if !omit_pipeline {
        if let Some(p) = &c.pipeline {
            m.insert("pipeline".to_owned(), p.clone());
        }
    }
    m.insert(
        "secondary_producer_id".to_owned(),
        json!(c.secondary_producer_id),
    );
    m.insert("status".to_owned(), json!(n.status.as_str()));
    if let Some(g) = group {
        m.insert("synthetic_group".to_owned(), json!(g));
    }
    m.insert("test_candidate".to_owned(), json!(n.test_candidate));
    m.insert("upline_confidence".to_owned(), json!(n.upline_confidence));
    m.insert("upline_display_name".to_owned(), json!(c.upline_display_name));
    m.insert("upline_source".to_owned(), json!(n.upline_source.as_str()));
    m.insert("vendor".to_owned(), json!(c.vendor));
    m
}

fn synthetic_object(s: &SyntheticGroupNode) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert(
        "branch_status".to_owned(),
        json!({
            "active": s.branch_status.active,
            "inactive": s.branch_status.inactive,
            "pending": s.branch_status.pending,
        }),
    );
    m.insert("depth".to_owned(), json!(0));
    m.insert("descendant_count".to_owned(), json!(s.descendant_count));
    m.insert("id".to_owned(), json!(s.id));
    m.insert("key".to_owned(), json!(s.key));
    m.insert("key_kind".to_owned(), json!(s.key_kind));
    m.insert("member_ids".to_owned(), json!(s.member_ids));
    m.insert("node_type".to_owned(), json!("synthetic"));
    m.insert("synthetic_kind".to_owned(), json!(s.kind));
    m
}
