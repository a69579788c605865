use crate::services::ChatServices;

#[derive(Clone)]
pub struct AppState {
    pub services: ChatServices,
}
