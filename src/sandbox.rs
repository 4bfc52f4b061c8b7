//! Demo data for local runs.
//!
//! Seeds a user with an event, a parent task with two dependent child tasks
//! and a routine over all three, then logs the credentials a client needs to
//! connect.

use crate::auth::Credentials;
use crate::store::{Kind, MemoryStore, Record, Store, StoreError};

pub const SANDBOX_USER: &str = "Sandy Sandbox";
pub const SANDBOX_EVENT: &str = "Sandy's Party";

/// Populate `store` and return the demo user's credentials.
pub async fn seed(store: &MemoryStore) -> Result<Credentials, StoreError> {
    let (user, key) = store.create_user(SANDBOX_USER);
    let owner = user.id.clone();

    let event = store
        .save(Record::new(Kind::Event).with_owner(&owner).with_attr("name", SANDBOX_EVENT))
        .await?;

    let parent = store
        .save(Record::new(Kind::Task).with_owner(&owner).with_attr("name", "Sandy's Parent Task"))
        .await?;

    let mut tasks = vec![parent.id.clone()];
    for n in 1..=2 {
        let child = store
            .save(
                Record::new(Kind::Task)
                    .with_owner(&owner)
                    .with_attr("name", format!("Sandy's Child Task {n}"))
                    .with_attr("depends_on", &parent.id),
            )
            .await?;
        tasks.push(child.id);
    }

    let routine = store
        .save(
            Record::new(Kind::Routine)
                .with_owner(&owner)
                .with_attr("tasks", tasks.join(",")),
        )
        .await?;

    let credentials = Credentials { id: owner, key };
    tracing::info!(
        user = %credentials.id,
        event = %event.id,
        routine = %routine.id,
        protocol = %credentials.header_value(),
        "Sandbox seeded"
    );
    Ok(credentials)
}
