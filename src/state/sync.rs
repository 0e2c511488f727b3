/// View synchronization
///
/// Keeps the rendered list in one-to-one correspondence with the backend's
/// rows while notifications arrive unordered and possibly more than once.
/// Three delivery anomalies are absorbed here:
/// - the same insert seen through both the initial snapshot and the stream
/// - an update for a row that was never rendered
/// - a delete for a row that was never rendered
///
/// The synchronizer never touches widgets directly. It drives a
/// `RenderSurface`, so the same logic runs against the iced list and
/// against the fakes used in tests.
use log::debug;
use std::collections::HashMap;

use super::data::{RecordId, TestCase};
use crate::backend::ChangeEvent;

/// Something that can show records as nodes
pub trait RenderSurface {
    /// Handle to one shown record
    type Node;

    /// Append a node for `record`
    fn create(&mut self, record: &TestCase) -> Self::Node;

    /// Refresh the status shown by `node`
    fn update(&mut self, node: &Self::Node, record: &TestCase);

    /// Take `node` off the surface (possibly after a short transition)
    fn remove(&mut self, node: Self::Node);
}

/// Owner of the rendered-set.
///
/// Invariant: an id is a key of `rendered` iff the surface holds a live
/// node for it.
pub struct ViewSynchronizer<S: RenderSurface> {
    surface: S,
    rendered: HashMap<RecordId, S::Node>,
}

impl<S: RenderSurface> ViewSynchronizer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            rendered: HashMap::new(),
        }
    }

    /// Render every record of a snapshot, in the order given.
    /// Returns how many new nodes were created.
    pub fn load_initial(&mut self, records: impl IntoIterator<Item = TestCase>) -> usize {
        let mut created = 0;
        for record in records {
            if self.render(&record) {
                created += 1;
            }
        }
        created
    }

    /// Show `record` unless it is already shown. Returns whether a node
    /// was created.
    pub fn render(&mut self, record: &TestCase) -> bool {
        if self.rendered.contains_key(&record.id) {
            debug!("record {} already rendered", record.id);
            return false;
        }
        let node = self.surface.create(record);
        self.rendered.insert(record.id.clone(), node);
        true
    }

    /// Refresh the status of `record`, rendering it if it is unknown
    pub fn update(&mut self, record: &TestCase) {
        match self.rendered.get(&record.id) {
            Some(node) => self.surface.update(node, record),
            None => {
                debug!("update for unrendered record {}, rendering it", record.id);
                self.render(record);
            }
        }
    }

    /// Forget `id` and take its node off the surface if there is one.
    /// Returns whether a node was removed.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        match self.rendered.remove(id) {
            Some(node) => {
                self.surface.remove(node);
                true
            }
            None => false,
        }
    }

    /// Route one change notification
    pub fn apply(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Insert(record) => {
                self.render(&record);
            }
            ChangeEvent::Update(record) => self.update(&record),
            ChangeEvent::Delete(id) => {
                self.remove(&id);
            }
        }
    }

    #[cfg(test)]
    pub fn is_rendered(&self, id: &RecordId) -> bool {
        self.rendered.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    #[cfg(test)]
    pub fn rendered_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.rendered.keys()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
