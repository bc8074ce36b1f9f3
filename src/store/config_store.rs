//! Configuration document store (spec.md §6): `environments`,
//! `component_templates`, `world_systems`, `policies`, `goals`, `events`,
//! `experiments` collections, addressed by stable string ids.

use async_trait::async_trait;
use dashmap::DashMap;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use log::{debug, info};
use serde_json::Value;

diesel::table! {
    documents (collection, id) {
        collection -> Text,
        id -> Text,
        value -> Json,
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Option<Value>;
    async fn put_document(&self, collection: &str, id: &str, value: Value);
    async fn delete_document(&self, collection: &str, id: &str);
    async fn list_collection(&self, collection: &str) -> Vec<Value>;
}

/// In-process store backing local runs and tests; grounded on the same
/// `(collection, id) -> value` shape as the Postgres-backed store, just
/// without the network round trip.
#[derive(Default)]
pub struct InMemoryConfigStore {
    documents: DashMap<(String, String), Value>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        InMemoryConfigStore::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_document(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents.get(&(collection.to_string(), id.to_string())).map(|v| v.clone())
    }

    async fn put_document(&self, collection: &str, id: &str, value: Value) {
        self.documents.insert((collection.to_string(), id.to_string()), value);
    }

    async fn delete_document(&self, collection: &str, id: &str) {
        self.documents.remove(&(collection.to_string(), id.to_string()));
    }

    async fn list_collection(&self, collection: &str) -> Vec<Value> {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

/// Postgres-backed store, built around a single-table document pattern
/// (`schema.rs`, `database/mod.rs`) generalized from one fixed key space
/// to `(collection, id)` pairs so it can back every document collection
/// of spec.md §6.
pub struct PostgresConfigStore {
    pool: Pool<AsyncPgConnection>,
}

impl PostgresConfigStore {
    pub async fn connect(database_url: &str) -> Self {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager).max_size(5).build().expect("failed to build pg pool");
        info!("config_store: connected");
        PostgresConfigStore { pool }
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    async fn get_document(&self, collection: &str, id: &str) -> Option<Value> {
        debug!("config_store: get {collection}/{id}");
        let mut conn = self.pool.get().await.expect("pg pool exhausted");
        documents::table
            .select(documents::value)
            .filter(documents::collection.eq(collection))
            .filter(documents::id.eq(id))
            .first::<Value>(&mut conn)
            .await
            .optional()
            .expect("config_store query failed")
    }

    async fn put_document(&self, collection: &str, id: &str, value: Value) {
        debug!("config_store: put {collection}/{id}");
        let mut conn = self.pool.get().await.expect("pg pool exhausted");
        diesel::insert_into(documents::table)
            .values((
                documents::collection.eq(collection),
                documents::id.eq(id),
                documents::value.eq(value.clone()),
            ))
            .on_conflict((documents::collection, documents::id))
            .do_update()
            .set(documents::value.eq(value))
            .execute(&mut conn)
            .await
            .expect("config_store upsert failed");
    }

    async fn delete_document(&self, collection: &str, id: &str) {
        debug!("config_store: delete {collection}/{id}");
        let mut conn = self.pool.get().await.expect("pg pool exhausted");
        diesel::delete(documents::table)
            .filter(documents::collection.eq(collection))
            .filter(documents::id.eq(id))
            .execute(&mut conn)
            .await
            .expect("config_store delete failed");
    }

    async fn list_collection(&self, collection: &str) -> Vec<Value> {
        let mut conn = self.pool.get().await.expect("pg pool exhausted");
        documents::table
            .select(documents::value)
            .filter(documents::collection.eq(collection))
            .load::<Value>(&mut conn)
            .await
            .expect("config_store list failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryConfigStore::new();
        store.put_document("goals", "g1", serde_json::json!({"weight": 1.0})).await;
        let doc = store.get_document("goals", "g1").await.unwrap();
        assert_eq!(doc["weight"], 1.0);
        assert_eq!(store.list_collection("goals").await.len(), 1);
        assert!(store.get_document("goals", "missing").await.is_none());
    }
}
