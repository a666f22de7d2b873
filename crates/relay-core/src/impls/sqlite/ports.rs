//! Port implementations for `SqliteRegistry`.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use std::net::IpAddr;

use super::SqliteRegistry;
use super::rows::Filter;
use crate::domain::{
    EntityKind, Event, EventId, Partner, PartnerId, ProcessingStep, State, StepId, StoreError,
    Subscriber, SubscriberId, SubscriberView, Task, TaskId,
};
use crate::ports::{
    DuplicateCandidate, DuplicateKey, EventStore, PartnerStore, ProcessingStepStore,
    SubscriberStore, TaskStore,
};

const PENDING: &[State] = &[State::New, State::InProgress];

#[async_trait]
impl TaskStore for SqliteRegistry {
    async fn duplicate_candidates(
        &self,
        key: &DuplicateKey,
    ) -> Result<Vec<DuplicateCandidate>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT TASKS.ID, TASKS.STATE, TASKS.UPDATED_ON, EV.METHOD
               FROM TASKS
               JOIN EVENTS EV ON EV.ID = TASKS.EVENT_ID
              WHERE TASKS.EVENT_ID = ?1 AND TASKS.PARTNER_ID = ?2 AND TASKS.LOCAL_ID = ?3
              ORDER BY TASKS.ID",
        )?;
        let rows = stmt
            .query_map(
                params![key.event_id, key.partner_id, key.local_id.as_str()],
                |row| {
                    Ok(DuplicateCandidate {
                        task_id: row.get(0)?,
                        state: row.get(1)?,
                        updated_on: row.get(2)?,
                        method: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn insert_task(&self, task: &Task) -> Result<TaskId, StoreError> {
        let now = self.clock.now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO TASKS (LOCAL_ID, PARTNER_ID, EVENT_ID, DATA, STATE, CREATED_ON, UPDATED_ON)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                task.local_id.as_str(),
                task.partner_id,
                task.event_id,
                task.data,
                task.state,
                now
            ],
        )?;
        Ok(TaskId::new(conn.last_insert_rowid()))
    }

    async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.read_one(id.get())
    }

    async fn tasks_in_state(&self, state: State) -> Result<Vec<Task>, StoreError> {
        let states: &'static [State] = match state {
            State::New => &[State::New],
            State::InProgress => &[State::InProgress],
            State::Published => &[State::Published],
            State::Processed => &[State::Processed],
            State::Error => &[State::Error],
        };
        self.read(Filter::States(states))
    }

    async fn spread_task(&self, id: TaskId) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO PROCESSING_STEPS (TASK_ID, PARTNER_ID, STATE, CREATED_ON, UPDATED_ON)
             SELECT TASKS.ID, SUBSCRIBERS.PARTNER_ID, ?2, ?3, ?3
               FROM TASKS
               JOIN SUBSCRIBERS ON SUBSCRIBERS.EVENT_ID = TASKS.EVENT_ID
               JOIN PARTNERS ON PARTNERS.ID = SUBSCRIBERS.PARTNER_ID
              WHERE TASKS.ID = ?1 AND SUBSCRIBERS.DELETED = 0 AND PARTNERS.DELETED = 0
              ORDER BY SUBSCRIBERS.ID",
            params![id, State::New, now],
        )?;
        let updated = tx.execute(
            "UPDATE TASKS SET STATE = ?2, UPDATED_ON = ?3 WHERE ID = ?1",
            params![id, State::Published, now],
        )?;
        if updated == 0 {
            // Dropping `tx` rolls the insert back.
            return Err(StoreError::NotFound {
                kind: "task",
                id: id.get(),
            });
        }
        tx.commit()?;
        Ok(inserted)
    }
}

#[async_trait]
impl ProcessingStepStore for SqliteRegistry {
    async fn pending_steps(&self) -> Result<Vec<ProcessingStep>, StoreError> {
        self.read(Filter::States(PENDING))
    }

    async fn steps_of_task(&self, task_id: TaskId) -> Result<Vec<ProcessingStep>, StoreError> {
        self.read(Filter::Column("TASK_ID", task_id.get()))
    }

    async fn update_step_state(&self, id: StepId, state: State) -> Result<usize, StoreError> {
        self.update_state(EntityKind::ProcessingSteps, id.get(), state)
    }
}

#[async_trait]
impl EventStore for SqliteRegistry {
    async fn event_by_route(&self, url: &str, method: &str) -> Result<Option<Event>, StoreError> {
        let conn = self.lock()?;
        let event = conn
            .query_row(
                "SELECT ID, URL, METHOD, DESCRIPTION FROM EVENTS
                  WHERE URL = ?1 AND METHOD = ?2 AND DELETED = 0
                  ORDER BY ID LIMIT 1",
                params![url, method.to_ascii_uppercase()],
                |row| {
                    Ok(Event {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        method: row.get(2)?,
                        description: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(event)
    }

    async fn events(&self) -> Result<Vec<Event>, StoreError> {
        self.read(Filter::All)
    }

    async fn insert_event(&self, event: &Event) -> Result<EventId, StoreError> {
        let now = self.clock.now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO EVENTS (URL, METHOD, DESCRIPTION, CREATED_ON, UPDATED_ON)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                event.url,
                event.method.to_ascii_uppercase(),
                event.description,
                now
            ],
        )?;
        Ok(EventId::new(conn.last_insert_rowid()))
    }
}

#[async_trait]
impl PartnerStore for SqliteRegistry {
    async fn partner(&self, id: PartnerId) -> Result<Option<Partner>, StoreError> {
        self.read_one(id.get())
    }

    async fn partner_by_address(
        &self,
        ip_address: IpAddr,
        port: u16,
    ) -> Result<Option<Partner>, StoreError> {
        let partners: Vec<Partner> = self.read(Filter::All)?;
        Ok(partners
            .into_iter()
            .find(|p| p.ip_address == ip_address && p.port == port))
    }

    async fn save_partner(&self, partner: &Partner) -> Result<Partner, StoreError> {
        let now = self.clock.now();
        let id = {
            let conn = self.lock()?;
            if partner.id.is_unsaved() {
                conn.execute(
                    "INSERT INTO PARTNERS (IP_ADDRESS, PORT, DESCRIPTION, CREATED_ON, UPDATED_ON)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![
                        partner.ip_address.to_string(),
                        partner.port,
                        partner.description,
                        now
                    ],
                )?;
                PartnerId::new(conn.last_insert_rowid())
            } else {
                let updated = conn.execute(
                    "UPDATE PARTNERS SET IP_ADDRESS = ?2, PORT = ?3, DESCRIPTION = ?4, UPDATED_ON = ?5
                      WHERE ID = ?1 AND DELETED = 0",
                    params![
                        partner.id,
                        partner.ip_address.to_string(),
                        partner.port,
                        partner.description,
                        now
                    ],
                )?;
                if updated == 0 {
                    return Err(StoreError::NotFound {
                        kind: "partner",
                        id: partner.id.get(),
                    });
                }
                partner.id
            }
        };
        self.read_one(id.get())?.ok_or(StoreError::NotFound {
            kind: "partner",
            id: id.get(),
        })
    }
}

#[async_trait]
impl SubscriberStore for SqliteRegistry {
    async fn subscribers(&self) -> Result<Vec<SubscriberView>, StoreError> {
        self.read(Filter::All)
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<SubscriberId, StoreError> {
        let now = self.clock.now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO SUBSCRIBERS (EVENT_ID, PARTNER_ID, CREATED_ON, UPDATED_ON)
             VALUES (?1, ?2, ?3, ?3)",
            params![subscriber.event_id, subscriber.partner_id, now],
        )
        .map_err(StoreError::classify)?;
        Ok(SubscriberId::new(conn.last_insert_rowid()))
    }

    async fn delete_subscriber(&self, id: SubscriberId) -> Result<usize, StoreError> {
        self.mark_deleted(EntityKind::Subscribers, id.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LocalId;
    use crate::impls::sqlite::fixtures;
    use crate::ports::Clock;
    use chrono::Duration;

    fn new_task(event: i64, partner: i64, local: &str) -> Task {
        Task {
            id: TaskId::UNSAVED,
            local_id: LocalId::new(local),
            partner_id: PartnerId::new(partner),
            event_id: EventId::new(event),
            data: format!("{{\"ID\": \"{local}\"}}"),
            state: State::New,
            meta: crate::domain::RowMeta::at(chrono::Utc::now()),
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_reads_back() {
        let registry = fixtures::seeded(fixtures::clock());
        let first = registry.insert_task(&new_task(2, 1, "a")).await.unwrap();
        let second = registry.insert_task(&new_task(2, 1, "b")).await.unwrap();
        assert_eq!(second.get(), first.get() + 1);

        let stored = registry.task(first).await.unwrap().unwrap();
        assert_eq!(stored.local_id, LocalId::new("a"));
        assert_eq!(stored.state, State::New);
        assert_eq!(registry.tasks_in_state(State::New).await.unwrap().len(), 2);
        assert!(registry.task(TaskId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_partner_is_a_storage_error() {
        let registry = fixtures::seeded(fixtures::clock());
        let result = registry.insert_task(&new_task(2, 100, "a")).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn duplicate_candidates_join_the_event_method() {
        let clock = fixtures::clock();
        let registry = fixtures::seeded(clock.clone());
        registry.insert_task(&new_task(1, 1, "238")).await.unwrap();
        registry.insert_task(&new_task(1, 2, "238")).await.unwrap();

        let key = DuplicateKey {
            event_id: EventId::new(1),
            partner_id: PartnerId::new(1),
            local_id: LocalId::new("238"),
        };
        let candidates = registry.duplicate_candidates(&key).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].method, "POST");
        assert_eq!(candidates[0].state, State::New);
        assert_eq!(candidates[0].updated_on, clock.now());
    }

    #[tokio::test]
    async fn spread_fans_out_to_every_subscriber_and_publishes() {
        let registry = fixtures::seeded(fixtures::clock());
        let id = registry.insert_task(&new_task(1, 1, "7")).await.unwrap();

        assert_eq!(registry.spread_task(id).await.unwrap(), 2);

        let task = registry.task(id).await.unwrap().unwrap();
        assert_eq!(task.state, State::Published);
        let steps = registry.steps_of_task(id).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.state == State::New));
        assert_eq!(steps[0].target.endpoint(), "http://127.0.0.1:3030/transactions/orders");
        assert_eq!(steps[1].target.port, 3031);
        assert_eq!(steps[0].target.method, "POST");
        assert_eq!(steps[0].local_id, LocalId::new("7"));
    }

    #[tokio::test]
    async fn spread_skips_deleted_subscribers() {
        let registry = fixtures::seeded(fixtures::clock());
        registry.delete_subscriber(SubscriberId::new(2)).await.unwrap();
        let id = registry.insert_task(&new_task(1, 1, "7")).await.unwrap();
        assert_eq!(registry.spread_task(id).await.unwrap(), 1);
        assert_eq!(registry.subscribers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn spread_without_subscribers_still_publishes() {
        let registry = fixtures::seeded(fixtures::clock());
        let id = registry.insert_task(&new_task(3, 1, "7")).await.unwrap();
        assert_eq!(registry.spread_task(id).await.unwrap(), 0);
        assert_eq!(
            registry.task(id).await.unwrap().unwrap().state,
            State::Published
        );
    }

    #[tokio::test]
    async fn spread_of_unknown_task_changes_nothing() {
        let registry = fixtures::seeded(fixtures::clock());
        let result = registry.spread_task(TaskId::new(42)).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert!(registry.pending_steps().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn spread_rolls_back_when_a_statement_fails() {
        let registry = fixtures::seeded(fixtures::clock());
        let id = registry.insert_task(&new_task(1, 1, "7")).await.unwrap();
        // The update half fails, the insert half must not survive.
        registry
            .execute_batch(
                "CREATE TRIGGER REJECT_PUBLISH BEFORE UPDATE OF STATE ON TASKS
                 BEGIN SELECT RAISE(ABORT, 'publish rejected'); END;",
            )
            .unwrap();

        assert!(matches!(
            registry.spread_task(id).await,
            Err(StoreError::Database(_))
        ));
        assert!(registry.steps_of_task(id).await.unwrap().is_empty());
        assert_eq!(registry.task(id).await.unwrap().unwrap().state, State::New);
    }

    #[tokio::test]
    async fn step_state_updates_stamp_the_clock() {
        let clock = fixtures::clock();
        let registry = fixtures::seeded(clock.clone());
        let id = registry.insert_task(&new_task(2, 1, "7")).await.unwrap();
        registry.spread_task(id).await.unwrap();
        let step = registry.pending_steps().await.unwrap().remove(0);

        clock.advance(Duration::seconds(30));
        let affected = registry
            .update_step_state(step.id, State::Processed)
            .await
            .unwrap();
        assert_eq!(affected, 1);

        assert!(registry.pending_steps().await.unwrap().is_empty());
        let step = registry.steps_of_task(id).await.unwrap().remove(0);
        assert_eq!(step.state, State::Processed);
        assert_eq!(step.meta.updated_on, clock.now());
    }

    #[tokio::test]
    async fn event_lookup_is_method_qualified() {
        let registry = fixtures::seeded(fixtures::clock());
        let put = registry.event_by_route("orders", "put").await.unwrap().unwrap();
        assert_eq!(put.id, EventId::new(2));
        assert!(registry.event_by_route("orders", "DELETE").await.unwrap().is_none());
        assert!(registry.event_by_route("nope", "POST").await.unwrap().is_none());

        let id = registry.insert_event(&Event::new("refunds", "post")).await.unwrap();
        let refunds = registry.event_by_route("refunds", "POST").await.unwrap().unwrap();
        assert_eq!(refunds.id, id);
        assert_eq!(registry.events().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn partners_insert_update_and_lookup() {
        let registry = fixtures::seeded(fixtures::clock());
        let local: IpAddr = "127.0.0.1".parse().unwrap();

        let found = registry.partner_by_address(local, 3030).await.unwrap().unwrap();
        assert_eq!(found.id, PartnerId::new(1));
        assert!(registry.partner_by_address(local, 9).await.unwrap().is_none());

        let mut partner = Partner::new(local, 2);
        partner.description = "CLIENT SERVER".into();
        let created = registry.save_partner(&partner).await.unwrap();
        assert_eq!(created.id, PartnerId::new(3));

        let mut changed = created.clone();
        changed.port = 20;
        let changed = registry.save_partner(&changed).await.unwrap();
        assert_eq!(changed.port, 20);
        assert_eq!(registry.partner(created.id).await.unwrap().unwrap().port, 20);

        let mut ghost = Partner::new(local, 1);
        ghost.id = PartnerId::new(77);
        assert!(matches!(
            registry.save_partner(&ghost).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn subscriber_listing_joins_event_and_partner() {
        let registry = fixtures::seeded(fixtures::clock());
        let id = registry
            .insert_subscriber(&Subscriber {
                id: SubscriberId::UNSAVED,
                event_id: EventId::new(3),
                partner_id: PartnerId::new(2),
            })
            .await
            .unwrap();

        let listed = registry.subscribers().await.unwrap();
        assert_eq!(listed.len(), 4);
        let last = listed.last().unwrap();
        assert_eq!(last.id, id);
        assert_eq!(last.url, "invoices");
        assert_eq!(last.method, "PUT");
        assert_eq!(last.port, 3031);

        assert_eq!(registry.delete_subscriber(id).await.unwrap(), 1);
        assert_eq!(registry.subscribers().await.unwrap().len(), 3);
        assert_eq!(registry.delete_subscriber(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn subscriber_of_unknown_partner_is_rejected_by_constraint() {
        let registry = fixtures::seeded(fixtures::clock());
        let result = registry
            .insert_subscriber(&Subscriber {
                id: SubscriberId::UNSAVED,
                event_id: EventId::new(1),
                partner_id: PartnerId::new(40),
            })
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert_eq!(registry.subscribers().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn deleted_partners_get_no_steps() {
        let registry = fixtures::seeded(fixtures::clock());
        let id = registry.insert_task(&new_task(1, 1, "7")).await.unwrap();
        registry.spread_task(id).await.unwrap();
        registry
            .execute_batch("UPDATE PARTNERS SET DELETED = 1 WHERE ID = 2")
            .unwrap();

        // Already spread steps of partner 2 are no longer delivered.
        let pending = registry.pending_steps().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].partner_id, PartnerId::new(1));

        let next = registry.insert_task(&new_task(1, 1, "8")).await.unwrap();
        assert_eq!(registry.spread_task(next).await.unwrap(), 1);
    }
}
