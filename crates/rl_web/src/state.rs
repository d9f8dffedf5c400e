use std::sync::Arc;

use rl_core::TextGenerator;
use rl_storage::ArticleStore;

use crate::actions::Actions;

pub struct AppState {
    pub store: Arc<ArticleStore>,
    pub actions: Actions,
}

impl AppState {
    pub fn new(store: Arc<ArticleStore>, model: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            actions: Actions::new(model),
        }
    }
}
