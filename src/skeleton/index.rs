use std::collections::{HashMap, VecDeque};

use crate::error::MappingError;

use super::types::Bone;

/// Read-only lookup structure over a bone list and its parent links.
///
/// Built once per skeleton. Children keep declaration order, which is what
/// breadth-first visitation and sibling positions are defined against.
#[derive(Debug, Clone)]
pub struct BoneIndex {
    bones: Vec<Bone>,
    by_name: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    depths: Vec<usize>,
}

impl BoneIndex {
    /// Build the index, rejecting duplicate names, dangling parents and
    /// parent cycles.
    pub fn build(bones: Vec<Bone>) -> Result<Self, MappingError> {
        let mut by_name = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            if by_name.insert(bone.name.clone(), i).is_some() {
                return Err(MappingError::Input(format!(
                    "Duplicate bone name {:?}",
                    bone.name
                )));
            }
        }

        let mut parents = Vec::with_capacity(bones.len());
        let mut children = vec![Vec::new(); bones.len()];
        let mut roots = Vec::new();
        for (i, bone) in bones.iter().enumerate() {
            match bone.parent() {
                None => {
                    parents.push(None);
                    roots.push(i);
                }
                Some(parent_name) => {
                    let parent = *by_name.get(parent_name).ok_or_else(|| {
                        MappingError::Input(format!(
                            "Bone {:?} references missing parent {:?}",
                            bone.name, parent_name
                        ))
                    })?;
                    parents.push(Some(parent));
                    children[parent].push(i);
                }
            }
        }

        // Walk up from every bone; more steps than bones means a cycle.
        let mut depths = Vec::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            let mut depth = 0;
            let mut current = parents[i];
            while let Some(p) = current {
                depth += 1;
                if depth > bones.len() {
                    return Err(MappingError::Input(format!(
                        "Parent cycle detected at bone {:?}",
                        bone.name
                    )));
                }
                current = parents[p];
            }
            depths.push(depth);
        }

        Ok(Self {
            bones,
            by_name,
            parents,
            children,
            roots,
            depths,
        })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Bone> {
        self.by_name.get(name).map(|&i| &self.bones[i])
    }

    /// Declaration position of a bone.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Bone names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bones.iter().map(|b| b.name.as_str())
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        let i = *self.by_name.get(name)?;
        self.parents[i].map(|p| self.bones[p].name.as_str())
    }

    /// Children of a bone in declaration order. Unknown names have none.
    pub fn children(&self, name: &str) -> Vec<&str> {
        match self.by_name.get(name) {
            Some(&i) => self.children[i]
                .iter()
                .map(|&c| self.bones[c].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn depth(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).map(|&i| self.depths[i])
    }

    pub fn roots(&self) -> Vec<&str> {
        self.roots
            .iter()
            .map(|&i| self.bones[i].name.as_str())
            .collect()
    }

    /// Ancestors of `name`, nearest first. Empty for roots and unknown names.
    pub fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let mut current = self.by_name.get(name).and_then(|&i| self.parents[i]);
        std::iter::from_fn(move || {
            let i = current?;
            current = self.parents[i];
            Some(self.bones[i].name.as_str())
        })
    }

    /// True if `ancestor` is `name` itself or lies on its parent chain.
    pub fn is_ancestor_or_equal(&self, ancestor: &str, name: &str) -> bool {
        if !self.contains(ancestor) || !self.contains(name) {
            return false;
        }
        ancestor == name || self.ancestors(name).any(|a| a == ancestor)
    }

    /// Strict ancestry: `ancestor` lies on the parent chain of `name`.
    pub fn is_ancestor(&self, ancestor: &str, name: &str) -> bool {
        ancestor != name && self.is_ancestor_or_equal(ancestor, name)
    }

    /// Breadth-first order: roots in declaration order, then each level's
    /// children in declaration order.
    pub fn breadth_first(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            order.push(self.bones[i].name.as_str());
            queue.extend(self.children[i].iter().copied());
        }
        order
    }

    /// Position of a bone among its siblings, plus the sibling count.
    /// Roots count each other as siblings.
    pub fn sibling_position(&self, name: &str) -> Option<(usize, usize)> {
        let i = *self.by_name.get(name)?;
        let siblings = match self.parents[i] {
            Some(p) => &self.children[p],
            None => &self.roots,
        };
        let pos = siblings.iter().position(|&s| s == i)?;
        Some((pos, siblings.len()))
    }
}
