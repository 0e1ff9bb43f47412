use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::schema::{
    Category, Donation, Mission, PHASE_ACTIVE, PROJECT_PUBLISHED, PROJECT_REJECTED,
    PaymentStatus, Project, ProjectInput, REWARD_COMPLETED, REWARD_FAILED, REWARD_IN_PROGRESS,
    REWARD_NONE, TX_STATUS_PAID, TX_STATUS_PENDING, TX_WITHDRAW, User, WalletTransaction,
};

pub struct Database {
    pool: SqlitePool,
}

/// Optional profile fields; `None` keeps the stored value (COALESCE).
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DonationListItem {
    pub id: i64,
    pub project_title: String,
    pub amount: i64,
    pub payment_status: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SupportedProject {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    pub organization_name: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DonorStats {
    pub total_donation: i64,
    pub total_projects: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MissionStats {
    pub missions_done: i64,
    pub missions_active: i64,
    pub total_hours: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MissionWithProject {
    pub project_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub organization_name: String,
    pub status: String,
    pub verification_status: String,
    pub hours: i64,
    pub joined_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct VolunteerRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub project_name: String,
    pub hours: i64,
    pub status: String,
    pub joined_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct VerificationRow {
    pub title: String,
    pub start_date: Option<String>,
    pub verification_status: String,
    pub completed_at: Option<NaiveDateTime>,
    pub joined_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProjectFinancial {
    pub id: i64,
    pub title: String,
    pub target_amount: i64,
    pub current_amount: i64,
    pub status: String,
    pub claim_status: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NgoSummary {
    pub total_projects: i64,
    pub funds_raised: i64,
    pub active_volunteers: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PendingWithdrawal {
    pub id: i64,
    pub amount: i64,
    pub status: String,
    pub created_at: Option<NaiveDateTime>,
    pub user_name: String,
    pub description: Option<String>,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory database, used by the CLI dry runs and
    /// the test suites. A pool of one keeps every query on the same
    /// `:memory:` database.
    pub async fn new_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to create SQLite connect options")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    // ---- users ----

    pub async fn save_user(&self, user: &User) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, phone, role, wallet_address, level, xp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.role)
        .bind(&user.wallet_address)
        .bind(user.level)
        .bind(user.xp)
        .execute(&self.pool)
        .await
        .context("Failed to save user to database")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get user with email {}", email))?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get user with id {}", user_id))?;
        Ok(user)
    }

    pub async fn get_user_with_role(
        &self,
        user_id: i64,
        role: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND role = ?")
            .bind(user_id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get {} with id {}", role, user_id))?;
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                birth_date = COALESCE(?, birth_date),
                address = COALESCE(?, address),
                city = COALESCE(?, city),
                province = COALESCE(?, province),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.birth_date)
        .bind(&update.address)
        .bind(&update.city)
        .bind(&update.province)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update profile for user {}", user_id))?;
        Ok(())
    }

    // ---- categories ----

    pub async fn save_category(&self, name: &str, icon: Option<&str>) -> anyhow::Result<i64> {
        let result = sqlx::query("INSERT OR IGNORE INTO categories (name, icon) VALUES (?, ?)")
            .bind(name)
            .bind(icon)
            .execute(&self.pool)
            .await
            .context("Failed to save category")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_categories(&self) -> anyhow::Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await
                .context("Failed to get categories")?;
        Ok(categories)
    }

    // ---- projects ----

    pub async fn save_project(
        &self,
        organization_id: i64,
        slug: &str,
        status: &str,
        input: &ProjectInput,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO projects (
                title, slug, organization_id, category_id, description, location,
                duration_months, target_amount, thumbnail, banner_image,
                start_date, end_date, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(organization_id)
        .bind(input.category_id)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.duration_months)
        .bind(input.target_amount)
        .bind(&input.thumbnail)
        .bind(&input.banner_image)
        .bind(&input.start_date)
        .bind(&input.end_date)
        .bind(status)
        .execute(&self.pool)
        .await
        .context("Failed to save project")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_project(&self, project_id: i64) -> anyhow::Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get project with id {}", project_id))?;
        Ok(project)
    }

    pub async fn get_published_projects(&self) -> anyhow::Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(PROJECT_PUBLISHED)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get published projects")?;
        Ok(projects)
    }

    pub async fn get_projects_by_category(&self, category_id: i64) -> anyhow::Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE status = ? AND category_id = ? ORDER BY created_at DESC",
        )
        .bind(PROJECT_PUBLISHED)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get projects for category {}",
            category_id
        ))?;
        Ok(projects)
    }

    pub async fn get_projects_by_organization(
        &self,
        organization_id: i64,
    ) -> anyhow::Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE organization_id = ? ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get projects for organization {}",
            organization_id
        ))?;
        Ok(projects)
    }

    pub async fn get_projects_by_status(&self, status: &str) -> anyhow::Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE status = ? ORDER BY created_at ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get projects by status")?;
        Ok(projects)
    }

    pub async fn update_project(
        &self,
        project_id: i64,
        organization_id: i64,
        slug: &str,
        input: &ProjectInput,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET title = ?, slug = ?, category_id = ?, description = ?, location = ?,
                duration_months = ?, target_amount = ?, thumbnail = ?, banner_image = ?,
                start_date = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND organization_id = ?
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(input.category_id)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.duration_months)
        .bind(input.target_amount)
        .bind(&input.thumbnail)
        .bind(&input.banner_image)
        .bind(&input.start_date)
        .bind(&input.end_date)
        .bind(project_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update project {}", project_id))?;
        Ok(result.rows_affected())
    }

    pub async fn delete_project(
        &self,
        project_id: i64,
        organization_id: i64,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND organization_id = ?")
            .bind(project_id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete project {}", project_id))?;
        Ok(result.rows_affected())
    }

    /// Admin review of a submitted project: approve publishes it (with an
    /// optional volunteer token reward) and opens the active phase, reject
    /// parks it in `rejected`.
    pub async fn review_project(
        &self,
        project_id: i64,
        approve: bool,
        token_reward: Option<i64>,
    ) -> anyhow::Result<u64> {
        let result = if approve {
            sqlx::query(
                r#"
                UPDATE projects
                SET status = ?, phase = ?, token_reward = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ? AND status = 'submitted'
                "#,
            )
            .bind(PROJECT_PUBLISHED)
            .bind(PHASE_ACTIVE)
            .bind(token_reward)
            .bind(project_id)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE projects
                SET status = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ? AND status = 'submitted'
                "#,
            )
            .bind(PROJECT_REJECTED)
            .bind(project_id)
            .execute(&self.pool)
            .await
        }
        .context(format!("Failed to review project {}", project_id))?;
        Ok(result.rows_affected())
    }

    // ---- donations ----

    pub async fn save_donation(&self, donation: &Donation) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO donations (
                order_id, user_id, project_id, amount, payment_method,
                payment_status, mint_tx_hash, reward_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&donation.order_id)
        .bind(donation.user_id)
        .bind(donation.project_id)
        .bind(donation.amount)
        .bind(&donation.payment_method)
        .bind(&donation.payment_status)
        .bind(&donation.mint_tx_hash)
        .bind(&donation.reward_status)
        .execute(&self.pool)
        .await
        .context("Failed to save donation")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_donation_by_order(&self, order_id: &str) -> anyhow::Result<Option<Donation>> {
        let donation = sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get donation for order {}", order_id))?;
        Ok(donation)
    }

    /// Re-asserts a non-terminal notification: only the timestamp moves.
    pub async fn touch_donation(&self, order_id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE donations SET updated_at = CURRENT_TIMESTAMP WHERE order_id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to touch donation for order {}", order_id))?;
        Ok(())
    }

    /// Moves a pending donation into a terminal payment status. Terminal
    /// states are sticky: a donation that is already `paid` or `failed` is
    /// left untouched and `false` is returned.
    ///
    /// The first transition to `paid` also folds the amount into the
    /// project's running total, inside the same transaction.
    pub async fn settle_donation(
        &self,
        order_id: &str,
        status: PaymentStatus,
    ) -> anyhow::Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin settlement transaction")?;

        let result = sqlx::query(
            r#"
            UPDATE donations
            SET payment_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = ? AND payment_status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .context(format!("Failed to settle donation for order {}", order_id))?;

        let first_transition = result.rows_affected() == 1;

        if first_transition && status == PaymentStatus::Paid {
            sqlx::query(
                r#"
                UPDATE projects
                SET current_amount = current_amount + (
                        SELECT amount FROM donations WHERE order_id = ?
                    ),
                    donor_count = donor_count + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = (SELECT project_id FROM donations WHERE order_id = ?)
                "#,
            )
            .bind(order_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .context(format!(
                "Failed to update project totals for order {}",
                order_id
            ))?;
        }

        tx.commit()
            .await
            .context("Failed to commit settlement transaction")?;

        Ok(first_transition)
    }

    /// Claims the mint for an order: `none`/`failed -> in_progress`.
    ///
    /// The compare-and-swap serializes concurrent callback deliveries; only
    /// the caller that observes one affected row may talk to the minter.
    pub async fn claim_reward(&self, order_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE donations
            SET reward_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = ? AND payment_status = 'paid' AND reward_status IN (?, ?)
            "#,
        )
        .bind(REWARD_IN_PROGRESS)
        .bind(order_id)
        .bind(REWARD_NONE)
        .bind(REWARD_FAILED)
        .execute(&self.pool)
        .await
        .context(format!("Failed to claim reward for order {}", order_id))?;
        Ok(result.rows_affected() == 1)
    }

    /// Gives the claim back untouched (`in_progress -> none`), e.g. when the
    /// donor has no wallet yet; a later redelivery may try again.
    pub async fn release_reward_claim(&self, order_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE donations SET reward_status = ?, updated_at = CURRENT_TIMESTAMP WHERE order_id = ? AND reward_status = ?",
        )
        .bind(REWARD_NONE)
        .bind(order_id)
        .bind(REWARD_IN_PROGRESS)
        .execute(&self.pool)
        .await
        .context(format!("Failed to release reward claim for order {}", order_id))?;
        Ok(())
    }

    /// Marks a mint attempt as failed (`in_progress -> failed`); a
    /// redelivered callback will re-claim and retry.
    pub async fn fail_reward_claim(&self, order_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE donations SET reward_status = ?, updated_at = CURRENT_TIMESTAMP WHERE order_id = ? AND reward_status = ?",
        )
        .bind(REWARD_FAILED)
        .bind(order_id)
        .bind(REWARD_IN_PROGRESS)
        .execute(&self.pool)
        .await
        .context(format!("Failed to mark reward failed for order {}", order_id))?;
        Ok(())
    }

    /// Closes the gate without minting, for donations that carry a mint hash
    /// from an earlier run or whose reward rounds down to zero tokens.
    pub async fn mark_reward_completed(&self, order_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE donations SET reward_status = ?, updated_at = CURRENT_TIMESTAMP WHERE order_id = ?",
        )
        .bind(REWARD_COMPLETED)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .context(format!(
            "Failed to mark reward completed for order {}",
            order_id
        ))?;
        Ok(())
    }

    /// Closes the reward gate after a successful mint: stores the mint hash,
    /// advances `reward_status` to `completed` and appends the single
    /// `reward` ledger row, all in one transaction. The partial unique index
    /// on reward rows backstops the state machine.
    pub async fn complete_reward(
        &self,
        order_id: &str,
        mint_tx_hash: &str,
        user_id: i64,
        reward_amount: i64,
    ) -> anyhow::Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reward transaction")?;

        sqlx::query(
            r#"
            UPDATE donations
            SET mint_tx_hash = ?, reward_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = ?
            "#,
        )
        .bind(mint_tx_hash)
        .bind(REWARD_COMPLETED)
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .context(format!("Failed to store mint hash for order {}", order_id))?;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (user_id, tx_code, tx_type, amount, description, status)
            VALUES (?, ?, 'reward', ?, 'Donation reward', ?)
            "#,
        )
        .bind(user_id)
        .bind(order_id)
        .bind(reward_amount)
        .bind(TX_STATUS_PAID)
        .execute(&mut *tx)
        .await
        .context(format!("Failed to append reward row for order {}", order_id))?;

        tx.commit()
            .await
            .context("Failed to commit reward transaction")?;
        Ok(())
    }

    /// The donation together with its owner's wallet address, re-read right
    /// before minting. Two lookups; the claim CAS has already serialized the
    /// caller, so they cannot race another mint.
    pub async fn get_donation_with_wallet(
        &self,
        order_id: &str,
    ) -> anyhow::Result<Option<(Donation, Option<String>)>> {
        let row = sqlx::query_as::<_, Donation>(
            r#"
            SELECT d.* FROM donations d WHERE d.order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get donation for order {}", order_id))?;

        let Some(donation) = row else {
            return Ok(None);
        };

        let wallet: Option<(Option<String>,)> =
            sqlx::query_as("SELECT wallet_address FROM users WHERE id = ?")
                .bind(donation.user_id)
                .fetch_optional(&self.pool)
                .await
                .context(format!(
                    "Failed to get wallet for user {}",
                    donation.user_id
                ))?;

        Ok(Some((donation, wallet.and_then(|(w,)| w))))
    }

    pub async fn get_donations_by_user(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<DonationListItem>> {
        let rows = sqlx::query_as::<_, DonationListItem>(
            r#"
            SELECT d.id, p.title AS project_title, d.amount, d.payment_status, d.created_at
            FROM donations d
            JOIN projects p ON d.project_id = p.id
            WHERE d.user_id = ?
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!("Failed to get donations for user {}", user_id))?;
        Ok(rows)
    }

    pub async fn get_donor_stats(&self, user_id: i64) -> anyhow::Result<DonorStats> {
        let stats = sqlx::query_as::<_, DonorStats>(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total_donation,
                   COALESCE(COUNT(DISTINCT project_id), 0) AS total_projects
            FROM donations
            WHERE user_id = ? AND payment_status = 'paid'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to get donor stats for user {}", user_id))?;
        Ok(stats)
    }

    pub async fn get_supported_projects(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<SupportedProject>> {
        let rows = sqlx::query_as::<_, SupportedProject>(
            r#"
            SELECT p.id, p.title, p.location, o.name AS organization_name, p.thumbnail
            FROM donations d
            JOIN projects p ON d.project_id = p.id
            JOIN users o ON p.organization_id = o.id
            WHERE d.user_id = ? AND d.payment_status = 'paid'
            GROUP BY p.id, p.title, p.location, o.name, p.thumbnail
            ORDER BY MAX(d.created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get supported projects for user {}",
            user_id
        ))?;
        Ok(rows)
    }

    // ---- wallet ledger ----

    pub async fn save_withdrawal(
        &self,
        user_id: i64,
        tx_code: &str,
        amount: i64,
        description: &str,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO wallet_transactions (user_id, tx_code, tx_type, amount, description, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(tx_code)
        .bind(TX_WITHDRAW)
        .bind(amount)
        .bind(description)
        .bind(TX_STATUS_PENDING)
        .execute(&self.pool)
        .await
        .context("Failed to save withdrawal")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_wallet_transactions(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get wallet transactions for user {}",
            user_id
        ))?;
        Ok(rows)
    }

    pub async fn get_reward_total(&self, user_id: i64) -> anyhow::Result<i64> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM wallet_transactions
            WHERE user_id = ? AND tx_type = 'reward' AND status = 'paid'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to get reward total for user {}", user_id))?;
        Ok(total)
    }

    pub async fn get_wallet_total(&self, user_id: i64) -> anyhow::Result<i64> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM wallet_transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to get wallet total for user {}", user_id))?;
        Ok(total)
    }

    pub async fn get_pending_withdrawals(&self) -> anyhow::Result<Vec<PendingWithdrawal>> {
        let rows = sqlx::query_as::<_, PendingWithdrawal>(
            r#"
            SELECT wt.id, wt.amount, wt.status, wt.created_at,
                   u.name AS user_name, wt.description
            FROM wallet_transactions wt
            JOIN users u ON wt.user_id = u.id
            WHERE wt.tx_type = 'withdraw' AND wt.status = 'pending'
            ORDER BY wt.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get pending withdrawals")?;
        Ok(rows)
    }

    pub async fn approve_withdrawal(&self, withdrawal_id: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET status = 'paid'
            WHERE id = ? AND tx_type = 'withdraw' AND status = 'pending'
            "#,
        )
        .bind(withdrawal_id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to approve withdrawal {}", withdrawal_id))?;
        Ok(result.rows_affected())
    }

    // ---- missions ----

    pub async fn get_mission(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> anyhow::Result<Option<Mission>> {
        let mission = sqlx::query_as::<_, Mission>(
            "SELECT * FROM user_projects WHERE user_id = ? AND project_id = ?",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .context(format!(
            "Failed to get mission for user {} project {}",
            user_id, project_id
        ))?;
        Ok(mission)
    }

    pub async fn save_mission(
        &self,
        user_id: i64,
        project_id: i64,
        motivation: &str,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_projects (user_id, project_id, motivation, status, hours, verification_status)
            VALUES (?, ?, ?, 'active', 0, 'pending')
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(motivation)
        .execute(&self.pool)
        .await
        .context("Failed to save mission")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_missions_by_user(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<MissionWithProject>> {
        let rows = sqlx::query_as::<_, MissionWithProject>(
            r#"
            SELECT p.id AS project_id, p.title, p.location, o.name AS organization_name,
                   up.status, up.verification_status, up.hours, up.joined_at, up.completed_at
            FROM user_projects up
            JOIN projects p ON up.project_id = p.id
            JOIN users o ON p.organization_id = o.id
            WHERE up.user_id = ?
            ORDER BY up.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!("Failed to get missions for user {}", user_id))?;
        Ok(rows)
    }

    pub async fn get_mission_stats(&self, user_id: i64) -> anyhow::Result<MissionStats> {
        let stats = sqlx::query_as::<_, MissionStats>(
            r#"
            SELECT COALESCE(COUNT(CASE WHEN status = 'completed' THEN 1 END), 0) AS missions_done,
                   COALESCE(COUNT(CASE WHEN status = 'active' THEN 1 END), 0) AS missions_active,
                   COALESCE(SUM(hours), 0) AS total_hours
            FROM user_projects
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to get mission stats for user {}", user_id))?;
        Ok(stats)
    }

    /// A volunteer's mission history with per-project verification status,
    /// most recently finished first.
    pub async fn get_verification_status(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<VerificationRow>> {
        let rows = sqlx::query_as::<_, VerificationRow>(
            r#"
            SELECT p.title, p.start_date, up.verification_status, up.completed_at, up.joined_at
            FROM user_projects up
            JOIN projects p ON up.project_id = p.id
            WHERE up.user_id = ?
            ORDER BY up.completed_at DESC, up.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get verification status for user {}",
            user_id
        ))?;
        Ok(rows)
    }

    /// Per-project funding view for an NGO: a project with settled donations
    /// is claimable, one without has nothing to withdraw yet.
    pub async fn get_project_financials(
        &self,
        organization_id: i64,
    ) -> anyhow::Result<Vec<ProjectFinancial>> {
        let rows = sqlx::query_as::<_, ProjectFinancial>(
            r#"
            SELECT id, title, target_amount, current_amount, status,
                   CASE WHEN current_amount > 0 THEN 'claimable' ELSE 'no_funds' END
                       AS claim_status
            FROM projects
            WHERE organization_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get financials for organization {}",
            organization_id
        ))?;
        Ok(rows)
    }

    pub async fn get_volunteers_by_organization(
        &self,
        organization_id: i64,
    ) -> anyhow::Result<Vec<VolunteerRow>> {
        let rows = sqlx::query_as::<_, VolunteerRow>(
            r#"
            SELECT u.id, u.name, u.email, u.phone, u.city,
                   p.title AS project_name, up.hours, up.status, up.joined_at
            FROM user_projects up
            JOIN users u ON up.user_id = u.id
            JOIN projects p ON up.project_id = p.id
            WHERE p.organization_id = ?
            ORDER BY up.joined_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get volunteers for organization {}",
            organization_id
        ))?;
        Ok(rows)
    }

    pub async fn get_ngo_summary(&self, organization_id: i64) -> anyhow::Result<NgoSummary> {
        let summary = sqlx::query_as::<_, NgoSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?) AS total_projects,
                (SELECT COALESCE(SUM(d.amount), 0)
                 FROM donations d
                 JOIN projects p ON d.project_id = p.id
                 WHERE p.organization_id = ? AND d.payment_status = 'paid') AS funds_raised,
                (SELECT COUNT(DISTINCT up.user_id)
                 FROM user_projects up
                 JOIN projects p ON up.project_id = p.id
                 WHERE p.organization_id = ? AND up.status = 'active') AS active_volunteers
            "#,
        )
        .bind(organization_id)
        .bind(organization_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .context(format!(
            "Failed to get summary for organization {}",
            organization_id
        ))?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PROJECT_SUBMITTED, ROLE_NGO, ROLE_VOLUNTEER};
    use crate::{User, generate_wallet_address, slugify};

    async fn seed_org_with_project(db: &Database) -> (i64, i64, i64) {
        let ngo = User::new(
            "Green Earth Foundation",
            "ngo@gmail.com",
            "Password123",
            None,
            ROLE_NGO,
            None,
        )
        .unwrap();
        let ngo_id = db.save_user(&ngo).await.unwrap();

        let volunteer = User::new(
            "Wiliiam Xavierus",
            "wilxav@gmail.com",
            "Password123",
            None,
            ROLE_VOLUNTEER,
            Some(generate_wallet_address()),
        )
        .unwrap();
        let volunteer_id = db.save_user(&volunteer).await.unwrap();

        db.save_category("Lingkungan", None).await.unwrap();

        let input = ProjectInput {
            title: "Air Bersih untuk Desa".to_string(),
            category_id: 1,
            description: "Akses air bersih".to_string(),
            location: None,
            duration_months: None,
            target_amount: 50_000_000,
            thumbnail: None,
            banner_image: None,
            start_date: None,
            end_date: None,
        };
        let project_id = db
            .save_project(ngo_id, &slugify(&input.title), PROJECT_SUBMITTED, &input)
            .await
            .unwrap();
        db.review_project(project_id, true, Some(50)).await.unwrap();

        (ngo_id, volunteer_id, project_id)
    }

    #[tokio::test]
    async fn mission_membership_is_unique_per_project() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, volunteer_id, project_id) = seed_org_with_project(&db).await;

        db.save_mission(volunteer_id, project_id, "Ingin membantu")
            .await
            .unwrap();
        assert!(db.get_mission(volunteer_id, project_id).await.unwrap().is_some());

        // Second join hits the UNIQUE(user_id, project_id) constraint.
        assert!(
            db.save_mission(volunteer_id, project_id, "Lagi")
                .await
                .is_err()
        );

        let stats = db.get_mission_stats(volunteer_id).await.unwrap();
        assert_eq!(stats.missions_active, 1);
        assert_eq!(stats.missions_done, 0);
    }

    #[tokio::test]
    async fn withdrawal_approval_is_single_shot() {
        let db = Database::new_in_memory().await.unwrap();
        let (ngo_id, _, _) = seed_org_with_project(&db).await;

        let withdrawal_id = db
            .save_withdrawal(ngo_id, "WD-test-0001", 250_000, "Fund withdrawal")
            .await
            .unwrap();

        let pending = db.get_pending_withdrawals().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, 250_000);

        assert_eq!(db.approve_withdrawal(withdrawal_id).await.unwrap(), 1);
        // Already paid, nothing left to approve.
        assert_eq!(db.approve_withdrawal(withdrawal_id).await.unwrap(), 0);
        assert!(db.get_pending_withdrawals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn review_only_touches_submitted_projects() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, _, project_id) = seed_org_with_project(&db).await;

        // Seeded project is already published.
        assert_eq!(db.review_project(project_id, false, None).await.unwrap(), 0);

        let project = db.get_project(project_id).await.unwrap().unwrap();
        assert!(project.is_published());
        assert_eq!(project.token_reward, Some(50));
    }

    #[tokio::test]
    async fn verification_listing_follows_missions() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, volunteer_id, project_id) = seed_org_with_project(&db).await;

        assert!(db.get_verification_status(volunteer_id).await.unwrap().is_empty());

        db.save_mission(volunteer_id, project_id, "Ingin membantu")
            .await
            .unwrap();

        let rows = db.get_verification_status(volunteer_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Air Bersih untuk Desa");
        assert_eq!(rows[0].verification_status, "pending");
        assert!(rows[0].completed_at.is_none());
    }

    #[tokio::test]
    async fn financial_view_reflects_settled_funds() {
        let db = Database::new_in_memory().await.unwrap();
        let (ngo_id, volunteer_id, project_id) = seed_org_with_project(&db).await;

        let rows = db.get_project_financials(ngo_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].claim_status, "no_funds");

        db.save_donation(&Donation::new(
            "ORDER-fin-0001".to_string(),
            volunteer_id,
            project_id,
            25_000,
        ))
        .await
        .unwrap();
        assert!(
            db.settle_donation("ORDER-fin-0001", PaymentStatus::Paid)
                .await
                .unwrap()
        );

        let rows = db.get_project_financials(ngo_id).await.unwrap();
        assert_eq!(rows[0].current_amount, 25_000);
        assert_eq!(rows[0].claim_status, "claimable");
    }

    #[tokio::test]
    async fn profile_update_keeps_unset_fields() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, volunteer_id, _) = seed_org_with_project(&db).await;

        db.update_profile(
            volunteer_id,
            &ProfileUpdate {
                phone: Some("0833333333".to_string()),
                city: Some("Surabaya".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();

        let user = db.get_user(volunteer_id).await.unwrap().unwrap();
        assert_eq!(user.name, "Wiliiam Xavierus");
        assert_eq!(user.phone.as_deref(), Some("0833333333"));
        assert_eq!(user.city.as_deref(), Some("Surabaya"));
        assert!(user.address.is_none());
    }

    #[tokio::test]
    async fn reward_total_counts_only_paid_reward_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, volunteer_id, _) = seed_org_with_project(&db).await;

        db.save_withdrawal(volunteer_id, "WD-test-0002", 300, "Fund withdrawal")
            .await
            .unwrap();
        assert_eq!(db.get_reward_total(volunteer_id).await.unwrap(), 0);
        assert_eq!(db.get_wallet_total(volunteer_id).await.unwrap(), 300);
    }
}
