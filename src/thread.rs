use std::collections::HashSet;

use clap::ValueEnum;
use eyre::{Result, eyre};
use serde::Deserialize;

use crate::importer::NodeMap;

/// Which child to follow when a node has several (regenerated or edited replies).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BranchPolicy {
    /// The original reply. Matches what the ChatGPT export shows first.
    #[default]
    First,
    /// The most recent regeneration or edit.
    Last,
}

impl BranchPolicy {
    fn pick<'a>(&self, children: &'a [String]) -> Option<&'a String> {
        match self {
            BranchPolicy::First => children.first(),
            BranchPolicy::Last => children.last(),
        }
    }
}

/// One rendered turn of the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub role: String,
    pub content: String,
}

/// Walk the message tree from the root down a single branch and collect the
/// authored messages in order.
///
/// Nodes without a message, or whose content trims to nothing, are passed
/// through without producing an entry. A mapping with no parentless node yields
/// an empty thread; with several, the first one in the export is the root.
pub fn extract(mapping: &NodeMap, policy: BranchPolicy) -> Result<Vec<Entry>> {
    let Some((root_id, root)) = mapping.iter().find(|(_, node)| node.parent.is_none()) else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    let mut visited: HashSet<&str> = HashSet::from([root_id]);
    let mut cursor = policy.pick(&root.children);

    while let Some(id) = cursor {
        if !visited.insert(id.as_str()) {
            return Err(eyre!("Cycle in message tree at node {:?}", id));
        }
        let node = mapping
            .get(id)
            .ok_or_else(|| eyre!("Node {:?} is referenced but missing from mapping", id))?;

        if let Some(message) = &node.message {
            let content = message.text();
            if !content.is_empty() {
                entries.push(Entry {
                    role: message.author.role.clone(),
                    content,
                });
            }
        }
        cursor = policy.pick(&node.children);
    }

    Ok(entries)
}
