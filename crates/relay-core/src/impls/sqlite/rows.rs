//! Row decoding, one `Entity` impl per kind.
//!
//! Every `SELECT` aliases its own table as `T` so [`Filter`] can be appended
//! to any of them, including the joined ones.

use rusqlite::Row;
use rusqlite::types::Type;
use std::net::IpAddr;

use crate::domain::{
    DeliveryTarget, EntityKind, Event, LocalId, Partner, ProcessingStep, RowMeta, State,
    SubscriberView, Task,
};

pub(crate) trait Entity: Sized {
    const KIND: EntityKind;

    /// Select list and `FROM` clause, without `WHERE`.
    const SELECT: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Which rows a generic read returns. Soft-deleted rows are always skipped.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Filter {
    All,
    Id(i64),
    States(&'static [State]),
    Column(&'static str, i64),
}

impl Filter {
    pub(crate) fn where_clause(&self) -> String {
        match self {
            Filter::All => "WHERE T.DELETED = 0".to_string(),
            Filter::Id(_) => "WHERE T.ID = ?1 AND T.DELETED = 0".to_string(),
            Filter::States(states) => {
                let placeholders: Vec<String> =
                    (1..=states.len()).map(|i| format!("?{i}")).collect();
                format!(
                    "WHERE T.STATE IN ({}) AND T.DELETED = 0",
                    placeholders.join(", ")
                )
            }
            Filter::Column(column, _) => format!("WHERE T.{column} = ?1 AND T.DELETED = 0"),
        }
    }

    pub(crate) fn params(&self) -> Vec<i64> {
        match self {
            Filter::All => Vec::new(),
            Filter::Id(id) | Filter::Column(_, id) => vec![*id],
            Filter::States(states) => states.iter().map(|s| s.code()).collect(),
        }
    }
}

fn ip_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<IpAddr> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn port_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u16> {
    let port: i64 = row.get(idx)?;
    u16::try_from(port)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn meta_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<RowMeta> {
    Ok(RowMeta {
        created_on: row.get(idx)?,
        updated_on: row.get(idx + 1)?,
        deleted: row.get(idx + 2)?,
    })
}

impl Entity for Event {
    const KIND: EntityKind = EntityKind::Events;
    const SELECT: &'static str = "SELECT T.ID, T.URL, T.METHOD, T.DESCRIPTION FROM EVENTS T";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            method: row.get(2)?,
            description: row.get(3)?,
        })
    }
}

impl Entity for Partner {
    const KIND: EntityKind = EntityKind::Partners;
    const SELECT: &'static str =
        "SELECT T.ID, T.IP_ADDRESS, T.PORT, T.DESCRIPTION FROM PARTNERS T";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ip_address: ip_at(row, 1)?,
            port: port_at(row, 2)?,
            description: row.get(3)?,
        })
    }
}

impl Entity for SubscriberView {
    const KIND: EntityKind = EntityKind::Subscribers;
    const SELECT: &'static str = "SELECT T.ID, T.EVENT_ID, T.PARTNER_ID, E.URL, E.METHOD, \
         P.IP_ADDRESS, P.PORT, P.DESCRIPTION \
         FROM SUBSCRIBERS T \
         JOIN EVENTS E ON E.ID = T.EVENT_ID \
         JOIN PARTNERS P ON P.ID = T.PARTNER_ID";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_id: row.get(1)?,
            partner_id: row.get(2)?,
            url: row.get(3)?,
            method: row.get(4)?,
            ip_address: ip_at(row, 5)?,
            port: port_at(row, 6)?,
            description: row.get(7)?,
        })
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Tasks;
    const SELECT: &'static str = "SELECT T.ID, T.LOCAL_ID, T.PARTNER_ID, T.EVENT_ID, T.DATA, \
         T.STATE, T.CREATED_ON, T.UPDATED_ON, T.DELETED FROM TASKS T";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            local_id: LocalId::new(row.get::<_, String>(1)?),
            partner_id: row.get(2)?,
            event_id: row.get(3)?,
            data: row.get(4)?,
            state: row.get(5)?,
            meta: meta_at(row, 6)?,
        })
    }
}

/// Steps are read with their task, partner and event joined in; that is
/// where the payload and the delivery target come from. Steps of a deleted
/// partner are not returned.
impl Entity for ProcessingStep {
    const KIND: EntityKind = EntityKind::ProcessingSteps;
    const SELECT: &'static str = "SELECT T.ID, T.TASK_ID, T.PARTNER_ID, TA.LOCAL_ID, \
         TA.EVENT_ID, TA.DATA, P.IP_ADDRESS, P.PORT, E.METHOD, E.URL, \
         T.STATE, T.CREATED_ON, T.UPDATED_ON, T.DELETED \
         FROM PROCESSING_STEPS T \
         JOIN TASKS TA ON TA.ID = T.TASK_ID \
         JOIN PARTNERS P ON P.ID = T.PARTNER_ID AND P.DELETED = 0 \
         JOIN EVENTS E ON E.ID = TA.EVENT_ID";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            partner_id: row.get(2)?,
            local_id: LocalId::new(row.get::<_, String>(3)?),
            event_id: row.get(4)?,
            data: row.get(5)?,
            target: DeliveryTarget {
                ip_address: ip_at(row, 6)?,
                port: port_at(row, 7)?,
                method: row.get(8)?,
                url: row.get(9)?,
            },
            state: row.get(10)?,
            meta: meta_at(row, 11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_filter_expands_placeholders() {
        let filter = Filter::States(&[State::New, State::InProgress]);
        assert_eq!(
            filter.where_clause(),
            "WHERE T.STATE IN (?1, ?2) AND T.DELETED = 0"
        );
        assert_eq!(filter.params(), vec![1, 2]);
    }

    #[test]
    fn column_filter_binds_one_value() {
        let filter = Filter::Column("TASK_ID", 9);
        assert_eq!(filter.where_clause(), "WHERE T.TASK_ID = ?1 AND T.DELETED = 0");
        assert_eq!(filter.params(), vec![9]);
    }
}
