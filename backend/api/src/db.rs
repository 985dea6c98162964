//! Database layer: migrations, account store, fundraiser store and the
//! donation ledger.
//!
//! Every mutation of a fundraiser is a single conditional statement or a
//! single transaction; no handler writes back a record it read earlier.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

use fundraiser_core::ledger::{
    ensure_accepting, DashboardStats, RecentDonation, StatusCounts, RECENT_DONATIONS_LIMIT,
};
use fundraiser_core::search::SearchQuery;
use fundraiser_core::{
    AccountDetails, BasicDetails, Donation, Fundraiser, FundraiserStatus, Money, Role, Transition,
};

use crate::errors::{ApiError, Result};
use crate::models::{from_millis, DonationRow, FundraiserRow, RecentDonationRow, User, UserRow};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Each connection to `:memory:` is a separate database.
    let in_memory = url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory {
        1
    } else {
        max_connections
    });
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ─────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Insert a new account. A taken email yields [`ApiError::Conflict`].
pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(to_millis(user.created_at))
    .execute(pool)
    .await
    .map_err(|e| {
        if unique_violation(&e) {
            ApiError::Conflict("User already exists".to_string())
        } else {
            e.into()
        }
    })?;
    Ok(())
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

pub async fn find_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

/// Every account except `exclude_id`, oldest first.
pub async fn list_users_except(pool: &SqlitePool, exclude_id: &str) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id != ?1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(User::try_from).collect()
}

/// Returns `false` when no such user exists.
pub async fn update_user_role(pool: &SqlitePool, id: &str, role: Role) -> Result<bool> {
    let affected = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
        .bind(role.as_str())
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn update_user_profile(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    email: &str,
) -> Result<()> {
    sqlx::query("UPDATE users SET name = ?1, email = ?2 WHERE id = ?3")
        .bind(name)
        .bind(email)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                ApiError::Conflict("Email already in use".to_string())
            } else {
                e.into()
            }
        })?;
    Ok(())
}

pub async fn update_password_hash(pool: &SqlitePool, id: &str, hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Fundraiser writes
// ─────────────────────────────────────────────────────────

/// Persist a freshly created fundraiser: pending, nothing raised.
pub async fn insert_fundraiser(
    pool: &SqlitePool,
    id: &str,
    creator_id: &str,
    details: &BasicDetails,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO fundraisers
            (id, creator_id, title, description, category, target_cents,
             status, proofs, amount_raised_cents, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', 0, ?8, ?8)
        "#,
    )
    .bind(id)
    .bind(creator_id)
    .bind(&details.title)
    .bind(&details.description)
    .bind(&details.category)
    .bind(details.target.cents())
    .bind(FundraiserStatus::Pending.as_str())
    .bind(to_millis(now))
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace the proof list while the fundraiser is still pending.
/// Returns `false` if the fundraiser left `pending` in the meantime.
pub async fn replace_proofs(
    pool: &SqlitePool,
    id: &str,
    proofs: &[String],
    now: DateTime<Utc>,
) -> Result<bool> {
    let affected = sqlx::query(
        "UPDATE fundraisers SET proofs = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
    )
    .bind(serde_json::to_string(proofs)?)
    .bind(to_millis(now))
    .bind(id)
    .bind(FundraiserStatus::Pending.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

/// Record payout details and re-affirm `pending`.
/// Returns `false` if the fundraiser left `pending` in the meantime.
pub async fn set_account_details(
    pool: &SqlitePool,
    id: &str,
    details: &AccountDetails,
    now: DateTime<Utc>,
) -> Result<bool> {
    let pending = FundraiserStatus::Pending.as_str();
    let affected = sqlx::query(
        r#"
        UPDATE fundraisers
        SET    bank_name = ?1, account_number = ?2, routing_code = ?3,
               status = ?4, updated_at = ?5
        WHERE  id = ?6 AND status = ?4
        "#,
    )
    .bind(&details.bank_name)
    .bind(&details.account_number)
    .bind(&details.routing_code)
    .bind(pending)
    .bind(to_millis(now))
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

/// Apply a review transition with a conditional update on the expected
/// current status.
///
/// Unknown ids yield [`ApiError::NotFound`]; a fundraiser in any other
/// status yields [`ApiError::Conflict`] and is left untouched.
pub async fn apply_transition(
    pool: &SqlitePool,
    id: &str,
    transition: Transition,
    reviewer: &str,
    now: DateTime<Utc>,
) -> Result<Fundraiser> {
    let affected = sqlx::query(
        r#"
        UPDATE fundraisers
        SET    status = ?1,
               verified_by = CASE WHEN ?2 THEN ?3 ELSE verified_by END,
               updated_at = ?4
        WHERE  id = ?5 AND status = ?6
        "#,
    )
    .bind(transition.to_status().as_str())
    .bind(transition.records_reviewer())
    .bind(reviewer)
    .bind(to_millis(now))
    .bind(id)
    .bind(transition.from_status().as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        let current = fundraiser_status(pool, id).await?.ok_or_else(|| not_found(id))?;
        // Only reachable with a status the transition cannot start from.
        current.apply(transition)?;
    }

    get_fundraiser(pool, id).await?.ok_or_else(|| not_found(id))
}

/// Append a donation and bump the running total in one transaction.
///
/// The total is incremented in place (`amount_raised + ?`), never written
/// from a previously read value. A donation that would carry the total
/// past `i64::MAX` cents is refused with [`ApiError::Conflict`] and
/// nothing is written.
pub async fn record_donation(
    pool: &SqlitePool,
    fundraiser_id: &str,
    donation: &Donation,
) -> Result<Fundraiser> {
    let amount = donation.amount.cents();
    if amount <= 0 {
        return Err(ApiError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let affected = sqlx::query(
        r#"
        UPDATE fundraisers
        SET    amount_raised_cents = amount_raised_cents + ?1, updated_at = ?2
        WHERE  id = ?3 AND status = ?4 AND amount_raised_cents <= ?5
        "#,
    )
    .bind(amount)
    .bind(to_millis(donation.donated_at))
    .bind(fundraiser_id)
    .bind(FundraiserStatus::Published.as_str())
    .bind(i64::MAX - amount)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if affected == 0 {
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM fundraisers WHERE id = ?1")
                .bind(fundraiser_id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or_else(|| not_found(fundraiser_id))?;
        ensure_accepting(status.0.parse()?)?;
        warn!(fundraiser_id, amount, "Donation refused: running total would overflow");
        return Err(ApiError::Conflict(
            "Donation would exceed the maximum amount a fundraiser can hold".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO donations (fundraiser_id, amount_cents, donor_name, donor_email, donated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(fundraiser_id)
    .bind(donation.amount.cents())
    .bind(&donation.donor_name)
    .bind(&donation.donor_email)
    .bind(to_millis(donation.donated_at))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_fundraiser(pool, fundraiser_id)
        .await?
        .ok_or_else(|| not_found(fundraiser_id))
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Fundraiser {id} not found"))
}

// ─────────────────────────────────────────────────────────
// Fundraiser reads
// ─────────────────────────────────────────────────────────

const FUNDRAISER_SELECT: &str = r#"
    SELECT f.id, f.creator_id, u.name AS creator_name, u.email AS creator_email,
           f.title, f.description, f.category, f.target_cents, f.status, f.proofs,
           f.bank_name, f.account_number, f.routing_code, f.verified_by,
           f.amount_raised_cents, f.created_at, f.updated_at
    FROM   fundraisers f
    JOIN   users u ON u.id = f.creator_id
"#;

pub async fn fundraiser_status(pool: &SqlitePool, id: &str) -> Result<Option<FundraiserStatus>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT status FROM fundraisers WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(s,)| s.parse::<FundraiserStatus>()).transpose()?)
}

/// Fetch one fundraiser with its full ledger.
pub async fn get_fundraiser(pool: &SqlitePool, id: &str) -> Result<Option<Fundraiser>> {
    let row = sqlx::query_as::<_, FundraiserRow>(&format!("{FUNDRAISER_SELECT} WHERE f.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(with_donations(pool, vec![row]).await?.remove(0))),
        None => Ok(None),
    }
}

/// All fundraisers in `status`, oldest first.
pub async fn list_by_status(
    pool: &SqlitePool,
    status: FundraiserStatus,
) -> Result<Vec<Fundraiser>> {
    let rows = sqlx::query_as::<_, FundraiserRow>(&format!(
        "{FUNDRAISER_SELECT} WHERE f.status = ?1 ORDER BY f.created_at ASC, f.id ASC"
    ))
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;
    with_donations(pool, rows).await
}

/// All fundraisers created by `creator_id`, newest first.
pub async fn list_by_creator(pool: &SqlitePool, creator_id: &str) -> Result<Vec<Fundraiser>> {
    let rows = sqlx::query_as::<_, FundraiserRow>(&format!(
        "{FUNDRAISER_SELECT} WHERE f.creator_id = ?1 ORDER BY f.created_at DESC, f.id ASC"
    ))
    .bind(creator_id)
    .fetch_all(pool)
    .await?;
    with_donations(pool, rows).await
}

/// Published fundraisers whose title or category contains the term,
/// case-insensitively. Matching runs in Rust since SQLite `LIKE` only
/// folds ASCII.
pub async fn search_published(pool: &SqlitePool, query: &SearchQuery) -> Result<Vec<Fundraiser>> {
    let rows = sqlx::query_as::<_, FundraiserRow>(&format!(
        "{FUNDRAISER_SELECT} WHERE f.status = ?1 ORDER BY f.created_at ASC, f.id ASC"
    ))
    .bind(FundraiserStatus::Published.as_str())
    .fetch_all(pool)
    .await?
    .into_iter()
    .filter(|row| query.matches(&[row.title.as_str(), row.category.as_str()]))
    .collect();
    with_donations(pool, rows).await
}

/// Attach each row's ledger, in insertion order.
async fn with_donations(pool: &SqlitePool, rows: Vec<FundraiserRow>) -> Result<Vec<Fundraiser>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT fundraiser_id, amount_cents, donor_name, donor_email, donated_at \
         FROM donations WHERE fundraiser_id IN (",
    );
    let mut ids = qb.separated(", ");
    for row in &rows {
        ids.push_bind(row.id.clone());
    }
    qb.push(") ORDER BY id ASC");

    let mut ledgers: HashMap<String, Vec<Donation>> = HashMap::new();
    for d in qb.build_query_as::<DonationRow>().fetch_all(pool).await? {
        ledgers
            .entry(d.fundraiser_id.clone())
            .or_default()
            .push(Donation::try_from(d)?);
    }

    rows.into_iter()
        .map(|row| {
            let donations = ledgers.remove(&row.id).unwrap_or_default();
            row.into_fundraiser(donations)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────

/// Dashboard figures: counts per status, grand total donated, account
/// counts and the most recent donations system-wide.
pub async fn dashboard_stats(pool: &SqlitePool) -> Result<DashboardStats> {
    let per_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM fundraisers GROUP BY status")
            .fetch_all(pool)
            .await?;
    let pairs = per_status
        .into_iter()
        .map(|(s, n)| Ok((s.parse::<FundraiserStatus>()?, n)))
        .collect::<Result<Vec<_>>>()?;

    // Each fundraiser's sum fits in i64; the grand total saturates.
    let per_fundraiser: Vec<(i64,)> =
        sqlx::query_as("SELECT SUM(amount_cents) FROM donations GROUP BY fundraiser_id")
            .fetch_all(pool)
            .await?;
    let total_donations = per_fundraiser
        .into_iter()
        .fold(Money::ZERO, |acc, (cents,)| {
            acc.saturating_add(Money::from_cents(cents))
        });

    let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let (total_admins,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?1")
        .bind(Role::Admin.as_str())
        .fetch_one(pool)
        .await?;

    let recent = sqlx::query_as::<_, RecentDonationRow>(
        r#"
        SELECT d.fundraiser_id, f.title AS fundraiser_title, d.amount_cents,
               d.donor_name, d.donated_at
        FROM   donations d
        JOIN   fundraisers f ON f.id = d.fundraiser_id
        ORDER  BY d.donated_at DESC, d.id DESC
        LIMIT  ?1
        "#,
    )
    .bind(RECENT_DONATIONS_LIMIT)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| {
        Ok(RecentDonation {
            fundraiser_id: r.fundraiser_id,
            fundraiser_title: r.fundraiser_title,
            amount: Money::from_cents(r.amount_cents),
            donor_name: r.donor_name,
            donated_at: from_millis(r.donated_at)?,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    Ok(DashboardStats {
        fundraisers: StatusCounts::from_pairs(pairs),
        total_donations,
        total_users,
        total_admins,
        recent_donations: recent,
    })
}
