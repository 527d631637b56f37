use std::collections::BTreeMap;

use skiff_core::{ArchiveClient, ArchiveError, EntryStat, ListOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("archive gateway error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("entry path is empty")]
    EmptyPath,
    #[error("path {path} descends through file node {segment}")]
    PathConflict { path: String, segment: String },
}

/// Directories show up in two ways: listed with real metadata, or
/// materialized early because a deeper path needed them. The variant keeps
/// the two distinguishable until the real listing arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEntry {
    Placeholder,
    Real(EntryStat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    name: String,
    path: String,
    entry: NodeEntry,
    children: Option<BTreeMap<String, TreeNode>>,
}

impl TreeNode {
    /// Synthetic root directory carrying the display label.
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            name: label.into(),
            path: "/".to_string(),
            entry: NodeEntry::Placeholder,
            children: Some(BTreeMap::new()),
        }
    }

    /// Builds the full hierarchy from a flat listing; entry order is
    /// irrelevant.
    pub fn build<I>(entries: I, root_label: &str) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (String, EntryStat)>,
    {
        let mut root = Self::root(root_label);
        for (path, stat) in entries {
            root.insert(&path, stat)?;
        }
        Ok(root)
    }

    /// Inserts one entry, materializing placeholder directories for missing
    /// ancestors. Re-inserting an existing path replaces its metadata and
    /// keeps whatever children were already discovered.
    pub fn insert(&mut self, path: &str, stat: EntryStat) -> Result<(), TreeError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, ancestors)) = segments.split_last() else {
            return Err(TreeError::EmptyPath);
        };

        let mut node = &mut *self;
        let mut walked = String::new();
        for segment in ancestors {
            walked.push('/');
            walked.push_str(segment);
            let children = match node.children.as_mut() {
                Some(children) => children,
                None => return Err(conflict(path, &node.name)),
            };
            node = children
                .entry((*segment).to_string())
                .or_insert_with(|| TreeNode::placeholder(&walked, segment));
        }

        walked.push('/');
        walked.push_str(last);
        let Some(children) = node.children.as_mut() else {
            return Err(conflict(path, &node.name));
        };
        match children.get_mut(*last) {
            Some(existing) => existing.reconcile(stat),
            None => {
                children.insert((*last).to_string(), TreeNode::from_stat(walked, last, stat));
            }
        }
        Ok(())
    }

    fn placeholder(path: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            entry: NodeEntry::Placeholder,
            children: Some(BTreeMap::new()),
        }
    }

    fn from_stat(path: String, name: &str, stat: EntryStat) -> Self {
        let children = stat.is_directory().then(BTreeMap::new);
        Self {
            name: name.to_string(),
            path,
            entry: NodeEntry::Real(stat),
            children,
        }
    }

    fn reconcile(&mut self, stat: EntryStat) {
        if stat.is_directory() && self.children.is_none() {
            self.children = Some(BTreeMap::new());
        }
        self.entry = NodeEntry::Real(stat);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entry(&self) -> &NodeEntry {
        &self.entry
    }

    pub fn stat(&self) -> Option<&EntryStat> {
        match &self.entry {
            NodeEntry::Real(stat) => Some(stat),
            NodeEntry::Placeholder => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.entry, NodeEntry::Placeholder)
    }

    pub fn is_directory(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.iter().flat_map(|map| map.values())
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.as_ref()?.get(name)
    }

    /// Walks the slash path from this node; empty segments are ignored, so
    /// `node("/")` is the node itself.
    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

fn conflict(path: &str, segment: &str) -> TreeError {
    TreeError::PathConflict {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// List only the top level up front; deeper levels arrive via `expand`.
    pub on_demand: bool,
}

/// In-memory directory-tree projection of one archive's flat listing.
pub struct FileTree {
    client: ArchiveClient,
    on_demand: bool,
    root: TreeNode,
}

impl FileTree {
    pub fn new(client: ArchiveClient, options: TreeOptions) -> Self {
        Self {
            client,
            on_demand: options.on_demand,
            root: TreeNode::root("/"),
        }
    }

    /// Lists the archive and (re)builds the tree.
    pub async fn setup(&mut self) -> Result<(), TreeError> {
        let entries = self
            .client
            .list_directory(
                "/",
                ListOptions {
                    recursive: !self.on_demand,
                    include_stat: true,
                },
            )
            .await?;

        let mut root = TreeNode::root("/");
        for entry in entries {
            let Some(stat) = entry.stat else { continue };
            root.insert(&entry.name, stat)?;
        }
        self.root = root;
        Ok(())
    }

    /// Adds one entry discovered out of band.
    pub fn insert(&mut self, path: &str, stat: EntryStat) -> Result<(), TreeError> {
        self.root.insert(path, stat)
    }

    /// Populates one level under a directory; used in on-demand mode. Does
    /// not recurse.
    pub async fn expand(&mut self, path: &str) -> Result<(), TreeError> {
        let entries = self
            .client
            .list_directory(
                path,
                ListOptions {
                    recursive: false,
                    include_stat: true,
                },
            )
            .await?;

        let parent = path.trim_end_matches('/');
        for entry in entries {
            let Some(stat) = entry.stat else { continue };
            self.root.insert(&format!("{parent}/{}", entry.name), stat)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        self.root.node(path)
    }
}
