#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use stepup::db::{self, Db};
use stepup::models::registration::{Experience, NewRegistration, Registration};
use stepup::routes::AppState;
use stepup::workshop::{Workshop, WorkshopDirectory};

/// A fresh in-memory database with the schema applied. A single pinned
/// connection, since every `sqlite::memory:` connection is its own database.
pub async fn memory_db() -> Db {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    db::migrate(&pool).await.unwrap();
    Db::new(pool)
}

pub fn directory() -> WorkshopDirectory {
    WorkshopDirectory::builtin()
}

pub fn default_workshop() -> Workshop {
    let directory = directory();
    directory.resolve(None).unwrap().clone()
}

pub async fn app_state() -> AppState {
    AppState {
        db: Arc::new(memory_db().await),
        workshops: Arc::new(directory()),
        default_payment_method: "UPI".to_string(),
    }
}

pub fn submission(email: &str, phone: &str, songs: i64, selected: &[&str]) -> NewRegistration {
    NewRegistration {
        name: Some("Asha Rout".to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        age: Some(24),
        experience: Some(Experience::Beginner),
        songs: Some(songs),
        selected_songs: selected.iter().map(|id| id.to_string()).collect(),
        workshop: None,
    }
}

/// Registers `count` distinct participants for the given run, to move the
/// early-bird counter.
pub async fn seed_registrations(count: usize, workshop: &Workshop, db: &Db) {
    let first_song = workshop.songs[0].id.as_str();

    for i in 0..count {
        let input = submission(
            &format!("seed{}@example.com", i),
            &format!("98765{:05}", i),
            1,
            &[first_song],
        );
        Registration::create(input, workshop, db).await.unwrap();
    }
}
