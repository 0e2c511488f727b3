/// State management module
///
/// This module handles all application state, including:
/// - The record model shared with the backend (data.rs)
/// - Reconciliation of the list with backend changes (sync.rs)
/// - The creation form and its validation (form.rs)
/// - Writes sent to the backend (actions.rs)
/// - Local UI preferences (prefs.rs)

pub mod actions;
pub mod data;
pub mod form;
pub mod prefs;
pub mod sync;
