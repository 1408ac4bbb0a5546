//! Shared state for HTTP handlers.

use std::sync::Arc;

use crate::search_index::SearchIndex;
use crate::submission::Submitter;

#[derive(Clone)]
pub struct ServerState {
    pub submitter: Arc<Submitter>,
    pub index: Arc<dyn SearchIndex>,
}

impl ServerState {
    pub fn new(submitter: Arc<Submitter>, index: Arc<dyn SearchIndex>) -> Self {
        Self { submitter, index }
    }
}
