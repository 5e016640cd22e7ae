// GDK Bridge Infrastructure - Local Platform Adapters
// Implements: UserDirectory, StoreBackend, LiveBackend from a JSON fixture

mod fixture;
mod live;
mod store;
mod users;

pub use fixture::PlatformFixture;
pub use live::{LocalLive, Presence};
pub use store::LocalStore;
pub use users::LocalUsers;

use std::sync::Arc;

/// All three adapters sharing one fixture
pub struct LocalPlatform {
    pub users: Arc<LocalUsers>,
    pub store: Arc<LocalStore>,
    pub live: Arc<LocalLive>,
}

impl LocalPlatform {
    pub fn new(fixture: PlatformFixture) -> Self {
        let fixture = Arc::new(fixture);
        Self {
            users: Arc::new(LocalUsers::new(Arc::clone(&fixture))),
            store: Arc::new(LocalStore::new(Arc::clone(&fixture))),
            live: Arc::new(LocalLive::new(fixture)),
        }
    }
}
