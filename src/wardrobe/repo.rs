use anyhow::Context;
use sqlx::SqlitePool;

pub use super::repo_types::WardrobeItem;
use super::category::Category;

const COLUMNS: &str = "id, filename, category, color, material, style, width, height, user_id";

pub async fn insert_item(
    db: &SqlitePool,
    filename: &str,
    category: Category,
    user_id: i64,
) -> anyhow::Result<WardrobeItem> {
    let item = sqlx::query_as::<_, WardrobeItem>(&format!(
        r#"
        INSERT INTO wardrobe (filename, category, user_id)
        VALUES (?, ?, ?)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(filename)
    .bind(category.label())
    .bind(user_id)
    .fetch_one(db)
    .await
    .with_context(|| format!("insert wardrobe item {}", filename))?;
    Ok(item)
}

pub async fn list_by_user(
    db: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<WardrobeItem>> {
    let rows = sqlx::query_as::<_, WardrobeItem>(&format!(
        r#"
        SELECT {COLUMNS}
          FROM wardrobe
         WHERE user_id = ?
         ORDER BY id ASC
         LIMIT ? OFFSET ?
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list wardrobe by user")?;
    Ok(rows)
}

#[cfg(test)]
pub async fn find_by_filename(db: &SqlitePool, filename: &str) -> anyhow::Result<Option<WardrobeItem>> {
    let row = sqlx::query_as::<_, WardrobeItem>(&format!(
        "SELECT {COLUMNS} FROM wardrobe WHERE filename = ?"
    ))
    .bind(filename)
    .fetch_optional(db)
    .await
    .context("find wardrobe item by filename")?;
    Ok(row)
}

#[cfg(test)]
pub async fn count_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wardrobe WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count wardrobe by user")?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo::User, state::test_support::memory_pool};

    #[tokio::test]
    async fn insert_and_list_in_order() {
        let db = memory_pool().await;
        let alice = User::create(&db, "alice", "a@example.com", "h").await.unwrap();
        let bob = User::create(&db, "bob", "b@example.com", "h").await.unwrap();

        insert_item(&db, "1_processed.png", Category::Top, alice.id).await.unwrap();
        insert_item(&db, "2_processed.png", Category::Special, alice.id).await.unwrap();
        insert_item(&db, "3_processed.png", Category::Hat, bob.id).await.unwrap();

        let items = list_by_user(&db, alice.id, 20, 0).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "1_processed.png");
        assert_eq!(items[0].category, "上衣");
        assert_eq!(items[1].category, "特殊");
        assert!(items[0].color.is_none());

        let page = list_by_user(&db, alice.id, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].filename, "2_processed.png");

        assert_eq!(count_by_user(&db, bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn filename_is_unique() {
        let db = memory_pool().await;
        let alice = User::create(&db, "alice", "a@example.com", "h").await.unwrap();
        insert_item(&db, "same.png", Category::Top, alice.id).await.unwrap();
        assert!(insert_item(&db, "same.png", Category::Bag, alice.id).await.is_err());
        let found = find_by_filename(&db, "same.png").await.unwrap().unwrap();
        assert_eq!(found.category, "上衣");
    }

    #[tokio::test]
    async fn owner_must_exist() {
        let db = memory_pool().await;
        assert!(insert_item(&db, "orphan.png", Category::Top, 42).await.is_err());
    }
}
