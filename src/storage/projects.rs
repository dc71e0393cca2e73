use crate::error::AppError;
use crate::pricing::assembler;
use crate::pricing::models::{ExpenseLine, MaterialLine};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Lifecycle state of a saved project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Quoted,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Quoted => "quoted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "quoted" => Some(Self::Quoted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A project record ready to be persisted: pricing input, its computed
/// breakdown, and descriptive metadata, merged by the assembler.
/// Timestamps are assigned by the store at persistence time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub template_id: Option<i64>,

    pub materials: Vec<MaterialLine>,
    pub hourly_rate: f64,
    pub hours_spent: f64,
    pub complexity_factor: f64,
    pub business_expenses: Vec<ExpenseLine>,
    pub profit_margin_percent: f64,
    pub shipping_cost: f64,
    pub tax_rate_percent: f64,

    pub materials_cost: f64,
    pub labor_cost: f64,
    pub business_cost: f64,
    pub base_cost: f64,
    pub profit_amount: f64,
    pub tax_amount: f64,
    pub wholesale_price: f64,
    pub retail_price: f64,

    pub status: ProjectStatus,
}

/// A stored project. Invariant: the breakdown fields are always the
/// engine's output for the input fields as of the last save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub template_id: Option<i64>,

    pub materials: Vec<MaterialLine>,
    pub hourly_rate: f64,
    pub hours_spent: f64,
    pub complexity_factor: f64,
    pub business_expenses: Vec<ExpenseLine>,
    pub profit_margin_percent: f64,
    pub shipping_cost: f64,
    pub tax_rate_percent: f64,

    pub materials_cost: f64,
    pub labor_cost: f64,
    pub business_cost: f64,
    pub base_cost: f64,
    pub profit_amount: f64,
    pub tax_amount: f64,
    pub wholesale_price: f64,
    pub retail_price: f64,

    pub status: ProjectStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    fn from_new(new: NewProject, id: i64, created_at: i64, updated_at: i64) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            category_id: new.category_id,
            template_id: new.template_id,
            materials: new.materials,
            hourly_rate: new.hourly_rate,
            hours_spent: new.hours_spent,
            complexity_factor: new.complexity_factor,
            business_expenses: new.business_expenses,
            profit_margin_percent: new.profit_margin_percent,
            shipping_cost: new.shipping_cost,
            tax_rate_percent: new.tax_rate_percent,
            materials_cost: new.materials_cost,
            labor_cost: new.labor_cost,
            business_cost: new.business_cost,
            base_cost: new.base_cost,
            profit_amount: new.profit_amount,
            tax_amount: new.tax_amount,
            wholesale_price: new.wholesale_price,
            retail_price: new.retail_price,
            status: new.status,
            created_at,
            updated_at,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_new_for_test(new: NewProject, id: i64, now: i64) -> Self {
        Self::from_new(new, id, now, now)
    }
}

/// Raw row as stored; JSON columns decoded on the way out
#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    owner_id: String,
    name: String,
    description: Option<String>,
    category_id: Option<i64>,
    template_id: Option<i64>,
    materials: String,
    hourly_rate: f64,
    hours_spent: f64,
    complexity_factor: f64,
    business_expenses: String,
    profit_margin_percent: f64,
    shipping_cost: f64,
    tax_rate_percent: f64,
    materials_cost: f64,
    labor_cost: f64,
    business_cost: f64,
    base_cost: f64,
    profit_amount: f64,
    tax_amount: f64,
    wholesale_price: f64,
    retail_price: f64,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self, AppError> {
        let materials = assembler::parse_materials(&row.materials)?;
        let business_expenses = assembler::parse_expenses(&row.business_expenses)?;
        let status = ProjectStatus::parse(&row.status).ok_or_else(|| {
            AppError::InvalidProjectRecord(format!(
                "project {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            template_id: row.template_id,
            materials,
            hourly_rate: row.hourly_rate,
            hours_spent: row.hours_spent,
            complexity_factor: row.complexity_factor,
            business_expenses,
            profit_margin_percent: row.profit_margin_percent,
            shipping_cost: row.shipping_cost,
            tax_rate_percent: row.tax_rate_percent,
            materials_cost: row.materials_cost,
            labor_cost: row.labor_cost,
            business_cost: row.business_cost,
            base_cost: row.base_cost,
            profit_amount: row.profit_amount,
            tax_amount: row.tax_amount,
            wholesale_price: row.wholesale_price,
            retail_price: row.retail_price,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Per-user aggregates for the analytics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub total_projects: i64,
    pub total_revenue: f64,
    pub total_hours: f64,
    pub avg_margin: f64,
    pub monthly_projects: i64,
    pub monthly_revenue: f64,
}

const PROJECT_COLUMNS: &str = r#"
    id, owner_id, name, description, category_id, template_id,
    materials, hourly_rate, hours_spent, complexity_factor,
    business_expenses, profit_margin_percent, shipping_cost, tax_rate_percent,
    materials_cost, labor_cost, business_cost, base_cost,
    profit_amount, tax_amount, wholesale_price, retail_price,
    status, created_at, updated_at
"#;

pub struct ProjectStore {
    pool: SqlitePool,
}

impl ProjectStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewProject) -> Result<Project, AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        let materials_json = serde_json::to_string(&new.materials)?;
        let expenses_json = serde_json::to_string(&new.business_expenses)?;

        let result = sqlx::query(
            r#"
            INSERT INTO projects (
                owner_id, name, description, category_id, template_id,
                materials, hourly_rate, hours_spent, complexity_factor,
                business_expenses, profit_margin_percent, shipping_cost, tax_rate_percent,
                materials_cost, labor_cost, business_cost, base_cost,
                profit_amount, tax_amount, wholesale_price, retail_price,
                status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.owner_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.template_id)
        .bind(&materials_json)
        .bind(new.hourly_rate)
        .bind(new.hours_spent)
        .bind(new.complexity_factor)
        .bind(&expenses_json)
        .bind(new.profit_margin_percent)
        .bind(new.shipping_cost)
        .bind(new.tax_rate_percent)
        .bind(new.materials_cost)
        .bind(new.labor_cost)
        .bind(new.business_cost)
        .bind(new.base_cost)
        .bind(new.profit_amount)
        .bind(new.tax_amount)
        .bind(new.wholesale_price)
        .bind(new.retail_price)
        .bind(new.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        Ok(Project::from_new(new, id, now, now))
    }

    /// Full replace of an owner's project; returns the stored record or
    /// `None` when the id does not exist for this owner.
    pub async fn update(
        &self,
        id: i64,
        owner_id: &str,
        new: NewProject,
    ) -> Result<Option<Project>, AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        let materials_json = serde_json::to_string(&new.materials)?;
        let expenses_json = serde_json::to_string(&new.business_expenses)?;

        let result = sqlx::query(
            r#"
            UPDATE projects SET
                name = ?, description = ?, category_id = ?, template_id = ?,
                materials = ?, hourly_rate = ?, hours_spent = ?, complexity_factor = ?,
                business_expenses = ?, profit_margin_percent = ?, shipping_cost = ?, tax_rate_percent = ?,
                materials_cost = ?, labor_cost = ?, business_cost = ?, base_cost = ?,
                profit_amount = ?, tax_amount = ?, wholesale_price = ?, retail_price = ?,
                status = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.template_id)
        .bind(&materials_json)
        .bind(new.hourly_rate)
        .bind(new.hours_spent)
        .bind(new.complexity_factor)
        .bind(&expenses_json)
        .bind(new.profit_margin_percent)
        .bind(new.shipping_cost)
        .bind(new.tax_rate_percent)
        .bind(new.materials_cost)
        .bind(new.labor_cost)
        .bind(new.business_cost)
        .bind(new.base_cost)
        .bind(new.profit_amount)
        .bind(new.tax_amount)
        .bind(new.wholesale_price)
        .bind(new.retail_price)
        .bind(new.status.as_str())
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id, owner_id).await
    }

    pub async fn get(&self, id: i64, owner_id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE id = ? AND owner_id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Project::try_from).transpose()
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE owner_id = ? ORDER BY updated_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Project::try_from).collect()
    }

    /// Returns true when a row was deleted
    pub async fn delete(&self, id: i64, owner_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(&self, owner_id: &str) -> Result<ProjectStats, AppError> {
        let (total_projects, total_revenue, total_hours, avg_margin) =
            sqlx::query_as::<_, (i64, f64, f64, f64)>(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(retail_price), 0.0),
                       COALESCE(SUM(hours_spent), 0.0),
                       COALESCE(AVG(profit_margin_percent), 0.0)
                FROM projects
                WHERE owner_id = ?
                "#,
            )
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        let month_start = start_of_current_month_millis();
        let (monthly_projects, monthly_revenue) = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(retail_price), 0.0)
            FROM projects
            WHERE owner_id = ? AND created_at >= ?
            "#,
        )
        .bind(owner_id)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProjectStats {
            total_projects,
            total_revenue,
            total_hours,
            avg_margin,
            monthly_projects,
            monthly_revenue,
        })
    }
}

fn start_of_current_month_millis() -> i64 {
    use chrono::{Datelike, TimeZone, Utc};

    let now = Utc::now();
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}
