//! Shared fixtures for reducer tests

use std::sync::Arc;

use ticket_verifier_api::{MemoryStore, SessionEvents};
use ticket_verifier_testing::{MockApi, test_clock};

use crate::environment::ConsoleEnvironment;

/// Everything a reducer test needs to inspect after the fact
pub struct Harness {
    pub env: ConsoleEnvironment,
    pub api: MockApi,
    pub storage: Arc<MemoryStore>,
    pub session: SessionEvents,
}

/// Environment over `api` with fresh storage, a fixed clock, and no polling
pub fn harness(api: MockApi) -> Harness {
    harness_with_storage(api, MemoryStore::new())
}

/// Like [`harness`], with pre-populated storage
pub fn harness_with_storage(api: MockApi, storage: MemoryStore) -> Harness {
    let session = SessionEvents::new();
    let api = api.with_session(session.clone());
    let storage = Arc::new(storage);
    let env = ConsoleEnvironment::new(
        Arc::new(api.clone()),
        storage.clone(),
        Arc::new(test_clock()),
        session.clone(),
    );
    Harness {
        env,
        api,
        storage,
        session,
    }
}
