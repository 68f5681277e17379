use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, SqlitePool};

use crate::db::Db;
use crate::error::{translate_db_error, ApiError, ApiResult};
use crate::pricing;
use crate::util;
use crate::workshop::Workshop;

const COLUMNS: &str = "id, name, email, phone, age, experience, songs, selected_songs, \
     price, status, workshop, transaction_id, payment_method, paid_at, notes, registered_at";

/// Lifecycle state of a registration. Stored upper-case, exposed lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Status {
    Pending,
    Paid,
    Cancelled,
}

impl Status {
    /// Case-insensitive parse for admin requests, which have historically sent
    /// either casing.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Status::Pending),
            "paid" => Some(Status::Paid),
            "cancelled" => Some(Status::Cancelled),
            _ => None,
        }
    }
}

/// Self-reported dance experience. Stored upper-case, exposed lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Experience {
    Beginner,
    Intermediate,
    Advanced,
}

/// One participant's registration for one workshop run.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub name: String,
    /// Lower-cased; unique per workshop.
    pub email: String,
    /// Unique per workshop.
    pub phone: String,
    pub age: i64,
    pub experience: Experience,
    /// Package size: 1, 2, or 3.
    pub songs: i64,
    pub selected_songs: Json<Vec<String>>,
    /// Rupees, computed once at creation from the run's policy and never
    /// recomputed afterward.
    pub price: i64,
    pub status: Status,
    pub workshop: String,
    pub transaction_id: Option<String>,
    #[serde(serialize_with = "crate::models::lowercase_opt")]
    pub payment_method: Option<String>,
    #[serde(serialize_with = "crate::models::rfc3339_millis_opt")]
    pub paid_at: Option<i64>,
    pub notes: Option<String>,
    #[serde(serialize_with = "crate::models::rfc3339_millis")]
    pub registered_at: i64,
}

/// The safe subset returned to the public registration form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRegistration {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub songs: i64,
    pub price: i64,
    pub status: Status,
    pub workshop: String,
}

impl From<&Registration> for CreatedRegistration {
    fn from(registration: &Registration) -> Self {
        CreatedRegistration {
            id: registration.id,
            name: registration.name.clone(),
            email: registration.email.clone(),
            songs: registration.songs,
            price: registration.price,
            status: registration.status,
            workshop: registration.workshop.clone(),
        }
    }
}

/// A public submission, before validation. Everything is optional so that a
/// missing field is our 400, not a deserializer rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub experience: Option<Experience>,
    pub songs: Option<i64>,
    #[serde(default)]
    pub selected_songs: Vec<String>,
    pub workshop: Option<String>,
}

/// A submission that passed validation and normalization.
#[derive(Debug)]
struct ValidRegistration {
    name: String,
    email: String,
    phone: String,
    age: i64,
    experience: Experience,
    songs: i64,
    selected_songs: Vec<String>,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"))
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9\s-]{10,15}$").expect("invalid phone regex"))
}

fn required_text(value: Option<String>) -> ApiResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingFields)
}

impl NewRegistration {
    fn validate(self, workshop: &Workshop) -> ApiResult<ValidRegistration> {
        let name = required_text(self.name)?;
        let email = required_text(self.email)?.to_lowercase();
        let phone = required_text(self.phone)?;
        let age = self.age.ok_or(ApiError::MissingFields)?;
        let songs = self.songs.ok_or(ApiError::MissingFields)?;

        if songs < 3 && self.selected_songs.len() as i64 != songs {
            return Err(ApiError::SongSelectionMismatch {
                expected: songs,
                got: self.selected_songs.len(),
            });
        }
        if !(1..=3).contains(&songs) {
            return Err(ApiError::InvalidPackageSize(songs));
        }

        if !email_regex().is_match(&email) {
            return Err(ApiError::BadRequest(
                "Please enter a valid email address".into(),
            ));
        }
        if !phone_regex().is_match(&phone) {
            return Err(ApiError::BadRequest(
                "Please enter a valid phone number".into(),
            ));
        }
        if !(5..=80).contains(&age) {
            return Err(ApiError::BadRequest("Age must be between 5 and 80".into()));
        }

        // The 3-song package always means the full program; for the smaller
        // packages the selection must name distinct songs from this run.
        let selected_songs = if songs == 3 {
            workshop.song_ids()
        } else {
            workshop.check_selection(&self.selected_songs)?;
            self.selected_songs
        };

        Ok(ValidRegistration {
            name,
            email,
            phone,
            age,
            experience: self.experience.unwrap_or(Experience::Beginner),
            songs,
            selected_songs,
        })
    }
}

/// An admin status-change request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    /// `None` = leave stored notes alone; `Some(...)` (even empty) overwrites.
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub notes: Option<Option<String>>,
}

/// Admin dashboard filters. `"all"`, empty, or unparseable values mean
/// "no filter" on the read path.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationFilters {
    pub status: Option<String>,
    pub songs: Option<String>,
    pub workshop: Option<String>,
}

impl RegistrationFilters {
    fn status_filter(&self) -> Option<String> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
            .map(str::to_uppercase)
    }

    fn songs_filter(&self) -> Option<i64> {
        self.songs
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.eq_ignore_ascii_case("all"))
            .and_then(|value| value.parse().ok())
    }

    fn workshop_filter(&self) -> Option<&str> {
        self.workshop
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
    }
}

/// Workshop-scoped dashboard totals. Deliberately independent of the status
/// and song-count filters, so the headline numbers don't change as the admin
/// narrows the list below them.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct Stats {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
    /// Sum of `price` over paid registrations, in rupees.
    pub revenue: i64,
}

/// What `ListRegistrations` returns: the filtered rows plus the
/// workshop-scoped stats.
#[derive(Debug, Serialize)]
pub struct RegistrationList {
    pub registrations: Vec<Registration>,
    pub stats: Stats,
}

impl RegistrationList {
    /// The degraded dashboard payload served when the store is unreachable.
    pub fn empty() -> Self {
        RegistrationList {
            registrations: Vec::new(),
            stats: Stats::default(),
        }
    }
}

impl Registration {
    pub async fn with_id_opt(id: i64, pool: &SqlitePool) -> ApiResult<Option<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM registration WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::Storage)
    }

    pub async fn with_id(id: i64, pool: &SqlitePool) -> ApiResult<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound(id))
    }

    pub async fn count_for_workshop(workshop: &str, pool: &SqlitePool) -> ApiResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM registration WHERE workshop = ?")
            .bind(workshop)
            .fetch_one(pool)
            .await
            .map_err(ApiError::Storage)
    }

    async fn duplicate_exists(
        email: &str,
        phone: &str,
        workshop: &str,
        pool: &SqlitePool,
    ) -> ApiResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM registration
             WHERE (email = ? OR phone = ?) AND workshop = ?
             LIMIT 1",
        )
        .bind(email)
        .bind(phone)
        .bind(workshop)
        .fetch_optional(pool)
        .await?;

        Ok(existing.is_some())
    }

    /// Validates and persists a public submission. The whole
    /// check-count-price-insert sequence runs under the store's create guard,
    /// so two submissions racing the early-bird boundary serialize; the
    /// unique indexes back up the duplicate check regardless.
    pub async fn create(input: NewRegistration, workshop: &Workshop, db: &Db) -> ApiResult<Self> {
        let valid = input.validate(workshop)?;

        let _guard = db.create_guard().await;
        let pool = db.pool();

        if Self::duplicate_exists(&valid.email, &valid.phone, &workshop.id, pool).await? {
            return Err(ApiError::DuplicateRegistration);
        }

        let prior_registrations = Self::count_for_workshop(&workshop.id, pool).await?;
        let price = pricing::quote(
            &workshop.pricing,
            valid.songs,
            &valid.selected_songs,
            prior_registrations,
        )?;
        let registered_at = util::now_millis();

        let result = sqlx::query(
            "INSERT INTO registration
                (name, email, phone, age, experience, songs, selected_songs,
                 price, status, workshop, registered_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&valid.name)
        .bind(&valid.email)
        .bind(&valid.phone)
        .bind(valid.age)
        .bind(valid.experience)
        .bind(valid.songs)
        .bind(Json(&valid.selected_songs))
        .bind(price)
        .bind(Status::Pending)
        .bind(&workshop.id)
        .bind(registered_at)
        .execute(pool)
        .await
        .map_err(translate_db_error)?;

        Ok(Registration {
            id: result.last_insert_rowid(),
            name: valid.name,
            email: valid.email,
            phone: valid.phone,
            age: valid.age,
            experience: valid.experience,
            songs: valid.songs,
            selected_songs: Json(valid.selected_songs),
            price,
            status: Status::Pending,
            workshop: workshop.id.clone(),
            transaction_id: None,
            payment_method: None,
            paid_at: None,
            notes: None,
            registered_at,
        })
    }

    /// The filtered list plus workshop-scoped stats, newest first.
    pub async fn page(filters: &RegistrationFilters, pool: &SqlitePool) -> ApiResult<RegistrationList> {
        let registrations = Self::list(filters, pool).await?;
        let stats = Self::stats(filters.workshop_filter(), pool).await?;

        Ok(RegistrationList {
            registrations,
            stats,
        })
    }

    pub async fn list(filters: &RegistrationFilters, pool: &SqlitePool) -> ApiResult<Vec<Self>> {
        let mut query =
            QueryBuilder::new(format!("SELECT {} FROM registration WHERE 1 = 1", COLUMNS));

        if let Some(status) = filters.status_filter() {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(songs) = filters.songs_filter() {
            query.push(" AND songs = ").push_bind(songs);
        }
        if let Some(workshop) = filters.workshop_filter() {
            query.push(" AND workshop = ").push_bind(workshop.to_string());
        }

        // Newest first is a product requirement, not an accident of row order.
        query.push(" ORDER BY registered_at DESC, id DESC");

        query
            .build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(ApiError::Storage)
    }

    pub async fn stats(workshop: Option<&str>, pool: &SqlitePool) -> ApiResult<Stats> {
        let mut query = QueryBuilder::new(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(status = 'PAID'), 0) AS paid,
                    COALESCE(SUM(status = 'PENDING'), 0) AS pending,
                    COALESCE(SUM(CASE WHEN status = 'PAID' THEN price ELSE 0 END), 0) AS revenue
             FROM registration",
        );

        if let Some(workshop) = workshop {
            query.push(" WHERE workshop = ").push_bind(workshop.to_string());
        }

        query
            .build_query_as::<Stats>()
            .fetch_one(pool)
            .await
            .map_err(ApiError::Storage)
    }

    /// Applies an admin status change. Transitions are deliberately
    /// unrestricted: un-marking a payment is a supported correction, and
    /// doing so clears `paid_at` again.
    pub async fn update_status(
        update: StatusUpdate,
        default_payment_method: &str,
        pool: &SqlitePool,
    ) -> ApiResult<Self> {
        let id = update.id.ok_or(ApiError::MissingFields)?;
        let requested = update.status.ok_or(ApiError::MissingFields)?;
        let status = Status::parse(&requested)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", requested)))?;

        let existing = Self::with_id(id, pool).await?;

        let now = util::now_millis();
        let transaction_id = update
            .transaction_id
            .filter(|value| !value.trim().is_empty())
            .or(existing.transaction_id)
            .unwrap_or_else(|| util::transaction_id(now));
        let payment_method = update
            .payment_method
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_payment_method.to_string())
            .to_uppercase();
        let paid_at = (status == Status::Paid).then_some(now);
        let notes = match update.notes {
            Some(notes) => notes,
            None => existing.notes,
        };

        sqlx::query(
            "UPDATE registration
             SET status = ?, transaction_id = ?, payment_method = ?, paid_at = ?, notes = ?
             WHERE id = ?",
        )
        .bind(status)
        .bind(&transaction_id)
        .bind(&payment_method)
        .bind(paid_at)
        .bind(&notes)
        .bind(id)
        .execute(pool)
        .await?;

        Self::with_id(id, pool).await
    }

    /// Hard delete. Nothing references the registration table today, but a
    /// foreign-key violation still surfaces as its own conflict for when
    /// something does.
    pub async fn delete(id: i64, pool: &SqlitePool) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM registration WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(translate_db_error)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(id));
        }

        Ok(())
    }
}
