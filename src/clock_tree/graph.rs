//! Clock graph
//!
//! Clocks are declared in topological order: every candidate parent
//! must already be part of the graph when a clock is added, which also
//! rules out cycles. The declaration order is the iteration order of
//! the resolver.

use heapless::Vec;

use super::{
    Activation, ClockId, ClockSourceDescriptor, Error, MAX_CHILDREN,
    MAX_CLOCKS, MAX_PARENTS,
};

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) descriptor: ClockSourceDescriptor,
    /// Indices of the candidate parents, in order of preference
    pub(crate) parents: Vec<u8, MAX_PARENTS>,
}

/// The clock sources of a device and their candidate connections
#[derive(Clone, Debug)]
pub struct ClockGraph {
    nodes: Vec<Node, MAX_CLOCKS>,
    priority: Vec<u8, MAX_CLOCKS>,
}

/// Builder for a [`ClockGraph`]. The first error encountered is
/// reported by `build`.
pub struct ClockGraphBuilder {
    nodes: Vec<Node, MAX_CLOCKS>,
    priority: Vec<ClockId, MAX_CLOCKS>,
    error: Option<Error>,
}

fn index_of(nodes: &[Node], id: ClockId) -> Option<usize> {
    nodes.iter().position(|node| node.descriptor.id == id)
}

impl ClockGraphBuilder {
    /// Add a clock with its candidate parents. The first parent is tried
    /// first.
    pub fn clock(
        mut self,
        descriptor: ClockSourceDescriptor,
        parents: &[ClockId],
    ) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.add(descriptor, parents) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Order in which frequencies are fixed and compared. Clocks not
    /// listed follow in declaration order.
    pub fn priority(mut self, order: &[ClockId]) -> Self {
        self.priority.clear();
        for &id in order {
            if self.priority.push(id).is_err() {
                self.error.get_or_insert(Error::CapacityExceeded);
            }
        }
        self
    }

    fn add(
        &mut self,
        descriptor: ClockSourceDescriptor,
        parents: &[ClockId],
    ) -> Result<(), Error> {
        let id = descriptor.id;
        descriptor.prescaler.validate()?;

        let (min, max) = descriptor.limits.bounds();
        if min > max {
            return Err(Error::InvertedRange(id));
        }
        if index_of(&self.nodes, id).is_some() {
            return Err(Error::DuplicateClock(id));
        }

        let mut list = Vec::new();
        for &parent in parents {
            let index = index_of(&self.nodes, parent)
                .ok_or(Error::NotTopological(id))?;
            if list.contains(&(index as u8)) {
                return Err(Error::DuplicateClock(parent));
            }
            list.push(index as u8)
                .map_err(|_| Error::CapacityExceeded)?;
        }

        self.nodes
            .push(Node {
                descriptor,
                parents: list,
            })
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Validate and finish the graph
    pub fn build(self) -> Result<ClockGraph, Error> {
        if let Some(e) = self.error {
            return Err(e);
        }

        for index in 0..self.nodes.len() {
            let children = self
                .nodes
                .iter()
                .filter(|node| node.parents.contains(&(index as u8)))
                .count();
            if children > MAX_CHILDREN {
                return Err(Error::CapacityExceeded);
            }
        }

        let mut priority = Vec::new();
        for &id in &self.priority {
            let index =
                index_of(&self.nodes, id).ok_or(Error::UnknownClock(id))?;
            if priority.contains(&(index as u8)) {
                return Err(Error::DuplicateClock(id));
            }
            // Cannot overflow: indices are unique and below MAX_CLOCKS
            priority.push(index as u8).ok();
        }
        for index in 0..self.nodes.len() {
            if !priority.contains(&(index as u8)) {
                priority.push(index as u8).ok();
            }
        }

        Ok(ClockGraph {
            nodes: self.nodes,
            priority,
        })
    }
}

impl ClockGraph {
    /// Start describing a graph
    pub fn builder() -> ClockGraphBuilder {
        ClockGraphBuilder {
            nodes: Vec::new(),
            priority: Vec::new(),
            error: None,
        }
    }

    /// Number of clocks
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no clocks
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of `id` in declaration order
    pub fn index_of(&self, id: ClockId) -> Option<usize> {
        index_of(&self.nodes, id)
    }

    /// Descriptor of `id`
    pub fn descriptor(&self, id: ClockId) -> Option<&ClockSourceDescriptor> {
        self.index_of(id).map(|i| &self.nodes[i].descriptor)
    }

    /// Identifiers of all clocks, in declaration order
    pub fn ids(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.nodes.iter().map(|node| node.descriptor.id)
    }

    /// Candidate parents of `id`, in order of preference
    pub fn parents(&self, id: ClockId) -> impl Iterator<Item = ClockId> + '_ {
        self.index_of(id)
            .map(|i| &self.nodes[i].parents[..])
            .unwrap_or(&[])
            .iter()
            .map(move |&p| self.id(p as usize))
    }

    /// Clocks that list `id` as a candidate parent
    pub fn children(&self, id: ClockId) -> impl Iterator<Item = ClockId> + '_ {
        let index = self.index_of(id).map(|i| i as u8);
        self.nodes
            .iter()
            .filter(move |node| {
                index.map_or(false, |i| node.parents.contains(&i))
            })
            .map(|node| node.descriptor.id)
    }

    /// Clocks without parents
    pub fn roots(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.parents.is_empty())
            .map(|node| node.descriptor.id)
    }

    /// Clocks marked as leaves
    pub fn leaves(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.descriptor.leaf.is_some())
            .map(|node| node.descriptor.id)
    }

    /// Priority order
    pub fn priority(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.priority.iter().map(move |&i| self.id(i as usize))
    }

    pub(crate) fn id(&self, index: usize) -> ClockId {
        self.nodes[index].descriptor.id
    }

    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn priority_indices(&self) -> &[u8] {
        &self.priority
    }

    /// Bitmap of the leaves that are always active
    pub(crate) fn always_active(&self) -> u32 {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.descriptor.leaf == Some(Activation::Always))
            .fold(0, |set, (i, _)| set | 1 << i)
    }
}
