use crate::catalog::{validate_product, CatalogAdmin, CatalogError, CatalogLookup, GateFilter};
use crate::domain::aggregates::{Extension, Gate, Product};
use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
struct GateRow { id: i64, name: String, width: f32, price: f32, image: String, color: String, tolerance: f32 }

#[derive(Debug, sqlx::FromRow)]
struct ExtensionRow { id: i64, name: String, width: f32, price: f32, image: String, color: String }

impl From<GateRow> for Gate {
    fn from(r: GateRow) -> Self {
        Gate::new(Product { id: r.id, name: r.name, width: r.width, price: r.price, image: r.image, color: r.color, quantity: 0 }, r.tolerance)
    }
}

impl From<ExtensionRow> for Extension {
    fn from(r: ExtensionRow) -> Self {
        Extension::new(Product { id: r.id, name: r.name, width: r.width, price: r.price, image: r.image, color: r.color, quantity: 0 })
    }
}

const GATE_COLUMNS: &str = "id, name, width, price, image, color, tolerance";
const EXTENSION_COLUMNS: &str = "e.id, e.name, e.width, e.price, e.image, e.color";

/// Catalog stored in the `gates`, `extensions` and `gate_extensions` tables.
#[derive(Clone)]
pub struct PgCatalog { db: PgPool }

impl PgCatalog {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn gate_by_id(&self, id: i64) -> Result<Gate, CatalogError> {
        sqlx::query_as::<_, GateRow>(&format!("SELECT {GATE_COLUMNS} FROM gates WHERE id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Gate::from).ok_or_else(|| CatalogError::gate_not_found(id))
    }

    async fn extension_by_id(&self, id: i64) -> Result<Extension, CatalogError> {
        sqlx::query_as::<_, ExtensionRow>(&format!("SELECT {EXTENSION_COLUMNS} FROM extensions e WHERE e.id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Extension::from).ok_or_else(|| CatalogError::extension_not_found(id))
    }

    async fn extensions_compatible_with_gate(&self, gate_id: i64) -> Result<Vec<Extension>, CatalogError> {
        let rows = sqlx::query_as::<_, ExtensionRow>(&format!(
            "SELECT {EXTENSION_COLUMNS} FROM extensions e JOIN gate_extensions ge ON ge.extension_id = e.id WHERE ge.gate_id = $1 ORDER BY e.id"
        ))
        .bind(gate_id).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Extension::from).collect())
    }

    async fn list_gates(&self, filter: GateFilter) -> Result<Vec<Gate>, CatalogError> {
        let rows = sqlx::query_as::<_, GateRow>(&format!(
            "SELECT {GATE_COLUMNS} FROM gates WHERE ($1::REAL IS NULL OR width < $1) ORDER BY id"
        ))
        .bind(filter.narrower_than).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Gate::from).collect())
    }
}

#[async_trait]
impl CatalogAdmin for PgCatalog {
    async fn create_gate(&self, gate: Gate) -> Result<Gate, CatalogError> {
        let p = &gate.product;
        validate_product(&p.name, p.width, p.price)?;
        let row = sqlx::query_as::<_, GateRow>(&format!(
            "INSERT INTO gates (name, width, price, image, color, tolerance, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {GATE_COLUMNS}"
        ))
        .bind(&p.name).bind(p.width).bind(p.price).bind(&p.image).bind(&p.color).bind(gate.tolerance)
        .fetch_one(&self.db).await?;
        Ok(row.into())
    }

    async fn create_extension(&self, extension: Extension) -> Result<Extension, CatalogError> {
        let p = &extension.product;
        validate_product(&p.name, p.width, p.price)?;
        let row = sqlx::query_as::<_, ExtensionRow>(
            "INSERT INTO extensions AS e (name, width, price, image, color, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING e.id, e.name, e.width, e.price, e.image, e.color",
        )
        .bind(&p.name).bind(p.width).bind(p.price).bind(&p.image).bind(&p.color)
        .fetch_one(&self.db).await?;
        Ok(row.into())
    }

    async fn link_extension(&self, gate_id: i64, extension_id: i64) -> Result<(), CatalogError> {
        self.gate_by_id(gate_id).await?;
        self.extension_by_id(extension_id).await?;
        sqlx::query("INSERT INTO gate_extensions (gate_id, extension_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(gate_id).bind(extension_id).execute(&self.db).await?;
        Ok(())
    }
}
