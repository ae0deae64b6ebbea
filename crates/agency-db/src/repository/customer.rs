//! # Customer Repository

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use agency_core::filter::{like_pattern, CustomerFilter};
use agency_core::{Customer, CustomerInput, PageRequest, Paged};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, input: CustomerInput) -> DbResult<Customer> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;
        let customer = insert(&mut conn, &input).await?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn update(&self, id: &str, input: CustomerInput) -> DbResult<Customer> {
        let input = input.validated()?;
        let mut conn = self.pool.acquire().await?;
        let customer = update(&mut conn, id, &input)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        info!(customer_id = %id, "Customer updated");
        Ok(customer)
    }

    /// Deletes a customer together with their sales.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(customer_id = %id, "Customer deleted");
        }
        Ok(deleted)
    }

    pub async fn list(&self, filter: &CustomerFilter, page: PageRequest) -> DbResult<Paged<Customer>> {
        debug!(?filter, ?page, "Listing customers");

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM customers");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {CUSTOMER_COLUMNS} FROM customers"));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paged::new(items, page, total))
    }

    pub async fn all(&self, filter: &CustomerFilter) -> DbResult<Vec<Customer>> {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {CUSTOMER_COLUMNS} FROM customers"));
        push_filters(&mut query, filter);
        query.push(" ORDER BY name, id");

        let items = query
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &CustomerFilter) {
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query
            .push(" WHERE (name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR phone LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

// =============================================================================
// Connection-level helpers (shared with imports and seeding)
// =============================================================================

pub(crate) async fn insert(conn: &mut SqliteConnection, input: &CustomerInput) -> DbResult<Customer> {
    let now = Utc::now();
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        INSERT INTO customers (id, name, email, phone, address, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(new_id())
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(customer)
}

pub(crate) async fn update(
    conn: &mut SqliteConnection,
    id: &str,
    input: &CustomerInput,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        UPDATE customers SET name = ?2, email = ?3, phone = ?4, address = ?5, updated_at = ?6
        WHERE id = ?1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Case-insensitive lookup used to match imported rows.
pub(crate) async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE lower(email) = lower(?1) ORDER BY created_at LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    fn input(name: &str, email: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: "0612345678".to_string(),
            address: "12 rue des Lilas, Lyon".to_string(),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = testing::db().await;

        let customer = db
            .customers()
            .create(input("Jean Dupont", "jean@example.com"))
            .await
            .unwrap();
        assert_eq!(customer.email, "jean@example.com");

        let updated = db
            .customers()
            .update(&customer.id, input("Jean Dupont", "j.dupont@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.email, "j.dupont@example.com");

        assert!(db.customers().delete(&customer.id).await.unwrap());
        assert!(db.customers().get(&customer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = testing::db().await;
        let err = db
            .customers()
            .create(input("Jean Dupont", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_search_and_order() {
        let db = testing::db().await;
        db.customers().create(input("Sophie Martin", "sophie@example.com")).await.unwrap();
        db.customers().create(input("Ahmed Benali", "ahmed@example.com")).await.unwrap();
        db.customers().create(input("Claire Petit", "claire@atelier.fr")).await.unwrap();

        let all = db
            .customers()
            .list(&CustomerFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].name, "Ahmed Benali");

        let atelier = db
            .customers()
            .list(
                &CustomerFilter {
                    search: Some("atelier".to_string()),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(atelier.total, 1);
        assert_eq!(atelier.items[0].name, "Claire Petit");
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let db = testing::db().await;
        let customer = db
            .customers()
            .create(input("Jean Dupont", "jean@example.com"))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = find_by_email(&mut conn, "JEAN@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, customer.id);
    }
}
