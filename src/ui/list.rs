/// The test case list
///
/// `ListSurface` is what the view synchronizer renders into. It holds one
/// `ItemNode` per shown record, in arrival order, and builds the iced
/// widgets for them. Removed nodes stay on screen, faded, for
/// `REMOVE_DELAY` before the app purges them.
use iced::widget::{column, container, pick_list, row, text, Column};
use iced::{Alignment, Element, Length};
use std::time::Duration;

use super::style;
use crate::state::data::{sanitize, RecordId, Status, StatusChoice, Team, TestCase};
use crate::state::sync::RenderSurface;
use crate::Message;

/// How long a removed item stays visible while fading out
pub const REMOVE_DELAY: Duration = Duration::from_millis(200);

pub type NodeId = u64;

/// One rendered test case
#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub node_id: NodeId,
    pub record_id: RecordId,
    /// "ID: 42 – Quotation to Pricing"
    pub heading: String,
    pub team: Team,
    /// "Added on dd/mm/yyyy, HH:MM:SS"
    pub added_on: String,
    pub status: Status,
    /// Fixed at creation
    pub description: String,
    pub removing: bool,
}

#[derive(Debug, Default)]
pub struct ListSurface {
    items: Vec<ItemNode>,
    next_node: NodeId,
    pending_purges: Vec<NodeId>,
}

impl ListSurface {
    #[cfg(test)]
    pub fn items(&self) -> &[ItemNode] {
        &self.items
    }

    /// Nodes marked for removal since the last call; the caller purges
    /// each of them after `REMOVE_DELAY`
    pub fn take_pending_purges(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_purges)
    }

    /// Drop a node for good. Returns whether it was still there.
    pub fn purge(&mut self, node: NodeId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.node_id != node);
        self.items.len() != before
    }

    fn find_mut(&mut self, node: NodeId) -> Option<&mut ItemNode> {
        self.items.iter_mut().find(|item| item.node_id == node)
    }

    pub fn view(&self) -> Element<'_, Message> {
        if self.items.is_empty() {
            return container(text("No test cases yet.").size(14))
                .padding(20)
                .width(Length::Fill)
                .center_x(Length::Fill)
                .into();
        }

        self.items
            .iter()
            .fold(Column::new().spacing(10), |list, item| list.push(item_view(item)))
            .padding(10)
            .into()
    }
}

impl RenderSurface for ListSurface {
    type Node = NodeId;

    fn create(&mut self, record: &TestCase) -> NodeId {
        self.next_node += 1;
        self.items.push(ItemNode {
            node_id: self.next_node,
            record_id: record.id.clone(),
            heading: record.heading(),
            team: record.team,
            added_on: record.added_on(),
            status: record.status,
            description: sanitize(&record.description),
            removing: false,
        });
        self.next_node
    }

    fn update(&mut self, node: &NodeId, record: &TestCase) {
        if let Some(item) = self.find_mut(*node) {
            item.status = record.status;
        }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(item) = self.find_mut(node) {
            item.removing = true;
            self.pending_purges.push(node);
        }
    }
}

fn item_view(item: &ItemNode) -> Element<'_, Message> {
    let record_id = item.record_id.clone();
    let status = item.status;
    let removing = item.removing;
    let team = item.team;

    let select = pick_list(
        StatusChoice::ALL,
        Some(StatusChoice::Set(status)),
        move |choice| Message::StatusPicked(record_id.clone(), choice),
    )
    .text_size(14)
    .style(move |theme, state| style::status_select(theme, state, status));

    let header = row![
        column![
            text(&item.heading).size(16),
            text(&item.added_on).size(12),
        ]
        .spacing(2)
        .width(Length::Fill),
        text("Status:").size(14),
        select,
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    container(column![header, text(&item.description).size(14)].spacing(8))
        .padding(12)
        .width(Length::Fill)
        .style(move |theme| style::item(theme, team, status, removing))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::sync::ViewSynchronizer;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, description: &str) -> TestCase {
        TestCase {
            id: RecordId::from(id),
            test_case_id: 100 + id,
            team: Team::PricingToQuotation,
            description: description.into(),
            status: Status::New,
            created_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        }
    }

    #[test]
    fn test_items_keep_arrival_order() {
        let mut sync = ViewSynchronizer::new(ListSurface::default());
        sync.load_initial(vec![record(2, "b"), record(1, "a"), record(3, "c")]);

        let items = sync.surface().items();
        let order: Vec<_> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
        assert_eq!(sync.surface().items()[0].heading, "ID: 102 – Pricing to Quotation");
        assert!(sync.surface().items()[0].added_on.starts_with("Added on "));
    }

    #[test]
    fn test_update_keeps_description() {
        let mut sync = ViewSynchronizer::new(ListSurface::default());
        sync.render(&record(1, "original"));

        let mut changed = record(1, "edited elsewhere");
        changed.status = Status::Done;
        sync.update(&changed);

        let item = &sync.surface().items()[0];
        assert_eq!(item.status, Status::Done);
        assert_eq!(item.description, "original");
    }

    #[test]
    fn test_remove_fades_then_purges() {
        let mut sync = ViewSynchronizer::new(ListSurface::default());
        sync.render(&record(1, "a"));
        sync.render(&record(2, "b"));

        sync.remove(&RecordId::from(1));
        assert!(sync.surface().items()[0].removing);
        assert_eq!(sync.surface().items().len(), 2);

        let purges = sync.surface_mut().take_pending_purges();
        assert_eq!(purges.len(), 1);
        assert!(sync.surface_mut().take_pending_purges().is_empty());

        assert!(sync.surface_mut().purge(purges[0]));
        assert!(!sync.surface_mut().purge(purges[0]));
        let items = sync.surface().items();
        let left: Vec<_> = items.iter().map(|i| i.record_id.clone()).collect();
        assert_eq!(left, [RecordId::from(2)]);
    }

    #[test]
    fn test_description_is_sanitized() {
        let mut surface = ListSurface::default();
        surface.create(&record(1, "line\u{0}one\nline two"));
        assert_eq!(surface.items()[0].description, "lineone\nline two");
    }
}
