//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tablekit::{
    ContentMapper, DirectMapper, EntityMapper, KeyMapper, MapperRegistry, MapperSet,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ticket {
    pub tenant: String,
    pub id: String,
    pub status: String,
    pub priority: i64,
    pub payload: Option<TicketPayload>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TicketPayload {
    pub title: String,
    pub tags: Vec<String>,
}

pub fn ticket_mappers() -> MapperSet<Ticket> {
    MapperSet::builder()
        .with_keys(
            KeyMapper::new(|t: &Ticket| t.tenant.clone(), |t: &Ticket| t.id.clone())
                .with_restore(|t, pk, rk| {
                    t.tenant = pk.to_owned();
                    t.id = rk.to_owned();
                }),
        )
        .with(DirectMapper::new(
            "status",
            "status",
            |t: &Ticket| t.status.clone(),
            |t, v| t.status = v,
        ))
        .with(DirectMapper::new(
            "priority",
            "priority",
            |t: &Ticket| t.priority,
            |t, v| t.priority = v,
        ))
        .with(ContentMapper::json(
            "payload",
            |t: &Ticket| t.payload.clone(),
            |t, v| t.payload = Some(v),
        ))
        .build()
        .expect("ticket mapper set")
}

pub fn ticket_entity_mapper(registry: Arc<MapperRegistry>) -> EntityMapper<Ticket> {
    EntityMapper::new(registry, ticket_mappers())
}

pub fn ticket(tenant: &str, id: &str, status: &str, priority: i64) -> Ticket {
    Ticket {
        tenant: tenant.to_owned(),
        id: id.to_owned(),
        status: status.to_owned(),
        priority,
        payload: Some(TicketPayload {
            title: format!("ticket {id}"),
            tags: vec!["one".to_owned(), "two".to_owned()],
        }),
    }
}
