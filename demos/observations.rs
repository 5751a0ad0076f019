//! Observation service on top of recordmap.
//!
//! Run with `cargo run --example observations` and a reachable `DATABASE_URL`.
//!
//!   POST /observations          body: { "stationKey": "A", "value": 12.5 }
//!   PUT  /observations/:id      body: fields to change
//!   GET  /observations/:id
//!   POST /observations/search   body: { "value": { "between": [10, 20] } }

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use recordmap::{
    convert, Accessor, AppError, ColumnDescriptor, ColumnType, Conditions, DataMapper, Field, PgStorage, Record,
    SchemaRegistry, StoreConfig,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Observation {
    id: Option<i64>,
    station_key: Option<String>,
    value: Option<f64>,
    verified: Option<bool>,
}

impl Record for Observation {
    fn accessors() -> Vec<Accessor<Self>> {
        vec![
            Accessor::new("id", |r: &Self| json!(r.id), |r: &mut Self, v: &Value| {
                convert::integer(v).map(|x| r.id = x).is_some()
            }),
            Accessor::new("stationKey", |r: &Self| json!(r.station_key), |r: &mut Self, v: &Value| {
                convert::string(v).map(|x| r.station_key = x).is_some()
            }),
            Accessor::new("value", |r: &Self| json!(r.value), |r: &mut Self, v: &Value| {
                convert::number(v).map(|x| r.value = x).is_some()
            }),
            Accessor::new("verified", |r: &Self| json!(r.verified), |r: &mut Self, v: &Value| {
                convert::boolean(v).map(|x| r.verified = x).is_some()
            }),
        ]
    }
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS observations (
    id BIGSERIAL PRIMARY KEY,
    station_key TEXT NOT NULL,
    value DOUBLE PRECISION NOT NULL,
    verified BOOLEAN
)";

async fn create(State(mapper): State<DataMapper>, Json(body): Json<Map<String, Value>>) -> Result<Json<Observation>, AppError> {
    let mut o: Observation = mapper.create_from_object(&body)?;
    mapper.sync(&mut o).await?;
    Ok(Json(o))
}

async fn fetch(State(mapper): State<DataMapper>, Path(id): Path<i64>) -> Result<Json<Option<Observation>>, AppError> {
    Ok(Json(mapper.select_by_key(id).await?))
}

async fn update(
    State(mapper): State<DataMapper>,
    Path(id): Path<i64>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Option<Observation>>, AppError> {
    let Some(current) = mapper.select_by_key::<Observation>(id).await? else {
        return Ok(Json(None));
    };
    let mut merged = match serde_json::to_value(&current) {
        Ok(Value::Object(m)) => m,
        _ => Map::new(),
    };
    merged.extend(body);
    merged.insert("id".into(), json!(id));
    let mut o: Observation = mapper.create_from_object(&merged)?;
    mapper.sync(&mut o).await?;
    Ok(Json(Some(o)))
}

async fn search(State(mapper): State<DataMapper>, Json(body): Json<Value>) -> Result<Json<Vec<Observation>>, AppError> {
    let conditions = Conditions::from_json(&body)?;
    Ok(Json(mapper.select_all(Some(&conditions)).await?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("recordmap=debug,observations=info")),
        )
        .init();

    let config = StoreConfig::from_env();
    let storage = PgStorage::connect(&config).await?;
    sqlx::query(CREATE_TABLE).execute(storage.pool()).await?;

    let mut registry = SchemaRegistry::new();
    registry.register::<Observation>(
        "observations",
        vec![
            Field::new("id", ColumnDescriptor::new("id", ColumnType::Number).primary_key()),
            Field::new("stationKey", ColumnDescriptor::new("station_key", ColumnType::String).required()),
            Field::new("value", ColumnDescriptor::new("value", ColumnType::Number).required()),
            Field::new("verified", ColumnDescriptor::new("verified", ColumnType::Boolean)),
        ],
    )?;
    let mapper = DataMapper::new(registry, Arc::new(storage));

    let app = Router::new()
        .route("/observations", post(create))
        .route("/observations/search", post(search))
        .route("/observations/:id", get(fetch).put(update))
        .with_state(mapper);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("observations listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
