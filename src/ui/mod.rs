/// Widgets of the board
///
/// - `list.rs` - the synced list of test cases
/// - `style.rs` - status and team colours

pub mod list;
pub mod style;
