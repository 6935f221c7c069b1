use chrono::NaiveDate;
use entity::users;
use migration::{Migrator, MigratorTrait};
use platform_authz::Role;
use platform_db::DbPool;
use sea_orm::{ActiveModelTrait, Database, Set};

/// Fresh in-memory database with every migration applied.
pub async fn setup_db() -> DbPool {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Inserts an account directly; the password hash is irrelevant here.
pub async fn insert_user(db: &DbPool, username: &str, role: Role) -> users::Model {
    let now = crate::now();
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.test")),
        password_hash: Set("not-a-hash".to_string()),
        role: Set(role.as_str().to_string()),
        enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
