use crate::error::AppError;
use crate::pricing::assembler;
use crate::pricing::models::MaterialLine;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A reusable project starting point with typical costs for its kind
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub avg_material_cost: Option<f64>,
    pub avg_hours: Option<f64>,
    pub suggested_price: Option<f64>,
    pub complexity: String,
    pub materials: Option<Vec<MaterialLine>>,
    pub is_public: bool,
    pub created_by: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub avg_material_cost: Option<f64>,
    #[serde(default)]
    pub avg_hours: Option<f64>,
    #[serde(default)]
    pub suggested_price: Option<f64>,
    #[serde(default = "default_complexity")]
    pub complexity: String,
    #[serde(default)]
    pub materials: Option<Vec<MaterialLine>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(skip)]
    pub created_by: Option<String>,
}

fn default_complexity() -> String {
    "simple".to_string()
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: i64,
    name: String,
    description: Option<String>,
    category_id: Option<i64>,
    avg_material_cost: Option<f64>,
    avg_hours: Option<f64>,
    suggested_price: Option<f64>,
    complexity: String,
    materials: Option<String>,
    is_public: i64,
    created_by: Option<String>,
    created_at: i64,
}

impl TryFrom<TemplateRow> for Template {
    type Error = AppError;

    fn try_from(row: TemplateRow) -> Result<Self, AppError> {
        let materials = row
            .materials
            .as_deref()
            .map(assembler::parse_materials)
            .transpose()?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            avg_material_cost: row.avg_material_cost,
            avg_hours: row.avg_hours,
            suggested_price: row.suggested_price,
            complexity: row.complexity,
            materials,
            is_public: row.is_public != 0,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

const TEMPLATE_COLUMNS: &str = r#"
    id, name, description, category_id, avg_material_cost, avg_hours,
    suggested_price, complexity, materials, is_public, created_by, created_at
"#;

pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn create_category(&self, new: NewCategory) -> Result<Category, AppError> {
        if new.name.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Category name must not be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query("INSERT INTO categories (name, description, created_at) VALUES (?, ?, ?)")
            .bind(&new.name)
            .bind(&new.description)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: new.name,
            description: new.description,
            created_at: now,
        })
    }

    /// Insert the starter categories on an empty database
    pub async fn seed_default_categories(&self) -> Result<(), AppError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }

        let defaults = [
            ("Blankets", "Cozy blankets and throws"),
            ("Hats", "Warm hats and beanies"),
            ("Scarves", "Stylish scarves and wraps"),
            ("Bags", "Practical bags and purses"),
        ];

        let now = chrono::Utc::now().timestamp_millis();
        for (name, description) in defaults {
            sqlx::query("INSERT INTO categories (name, description, created_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(description)
                .bind(now)
                .execute(&self.pool)
                .await?;
        }

        tracing::info!("Seeded default project categories");
        Ok(())
    }

    /// Public templates, plus the viewer's own private ones when known
    pub async fn list_templates(&self, viewer: Option<&str>) -> Result<Vec<Template>, AppError> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            SELECT {}
            FROM templates
            WHERE is_public = 1 OR (? IS NOT NULL AND created_by = ?)
            ORDER BY id ASC
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(viewer)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Template::try_from).collect()
    }

    pub async fn get_template(&self, id: i64) -> Result<Option<Template>, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE id = ?",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Template::try_from).transpose()
    }

    pub async fn create_template(&self, new: NewTemplate) -> Result<Template, AppError> {
        if new.name.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Template name must not be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let materials_json = new
            .materials
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO templates (
                name, description, category_id, avg_material_cost, avg_hours,
                suggested_price, complexity, materials, is_public, created_by, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.avg_material_cost)
        .bind(new.avg_hours)
        .bind(new.suggested_price)
        .bind(&new.complexity)
        .bind(&materials_json)
        .bind(if new.is_public { 1 } else { 0 })
        .bind(&new.created_by)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Template {
            id: result.last_insert_rowid(),
            name: new.name,
            description: new.description,
            category_id: new.category_id,
            avg_material_cost: new.avg_material_cost,
            avg_hours: new.avg_hours,
            suggested_price: new.suggested_price,
            complexity: new.complexity,
            materials: new.materials,
            is_public: new.is_public,
            created_by: new.created_by,
            created_at: now,
        })
    }
}
