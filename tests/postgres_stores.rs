mod common;

use bookstore::{
    auth::{
        Authenticator, BcryptHasher, CreateUserOutcome, CredentialStore, PasswordHasher,
        PgCredentialStore, Rejection, Role,
    },
    catalog::{BookStore, NewBook, PgBookStore},
};
use common::PostgresContainer;
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::sync::Arc;

fn new_book(title: &str, cents: i64) -> NewBook {
    NewBook {
        title: title.to_string(),
        price: Decimal::new(cents, 2),
    }
}

#[tokio::test]
async fn book_store_crud() {
    if !common::container_runtime_available() {
        eprintln!("skipping: no container runtime");
        return;
    }
    let postgres = PostgresContainer::start().await.unwrap();
    let store = PgBookStore::new(postgres.pool_with_schema().await.unwrap());

    store.ping().await.unwrap();
    assert!(store.find_all().await.unwrap().is_empty());

    let first = store.insert(new_book("Dune", 1999)).await.unwrap();
    let second = store.insert(new_book("Emma", 750)).await.unwrap();
    assert!(second.id > first.id);
    assert_eq!(second.price.to_string(), "7.50");

    let titles: Vec<String> = store
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(titles, ["Dune", "Emma"]);

    assert!(store.update(first.id, new_book("Dune Messiah", 2500)).await.unwrap());
    let updated = store.find_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.price, Decimal::new(2500, 2));

    assert!(!store.update(9999, new_book("Ghost", 100)).await.unwrap());
    assert!(store.find_by_id(9999).await.unwrap().is_none());

    assert!(store.delete_by_id(first.id).await.unwrap());
    assert!(!store.delete_by_id(first.id).await.unwrap());
    assert_eq!(store.find_all().await.unwrap().len(), 1);

    // Deleted ids are not handed out again.
    let third = store.insert(new_book("Persuasion", 600)).await.unwrap();
    assert!(third.id > second.id);
}

#[tokio::test]
async fn credential_store_roundtrip() {
    if !common::container_runtime_available() {
        eprintln!("skipping: no container runtime");
        return;
    }
    let postgres = PostgresContainer::start().await.unwrap();
    let pool = postgres.pool_with_schema().await.unwrap();
    let store = PgCredentialStore::new(pool.clone());

    assert_eq!(
        store.create_user("pedro", "$2b$04$hash", "ADMIN").await.unwrap(),
        CreateUserOutcome::Created
    );
    assert_eq!(
        store.create_user("pedro", "$2b$04$other", "STUDENT").await.unwrap(),
        CreateUserOutcome::Conflict
    );
    // A second user reuses the existing role row.
    assert_eq!(
        store.create_user("maria", "$2b$04$hash", "ADMIN").await.unwrap(),
        CreateUserOutcome::Created
    );
    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(roles, 1);

    let record = store.find_by_identity("pedro").await.unwrap().unwrap();
    assert_eq!(record.identity, "pedro");
    assert_eq!(record.password_hash, "$2b$04$hash");
    assert_eq!(record.role.as_deref(), Some("ADMIN"));

    assert!(store.find_by_identity("Pedro").await.unwrap().is_none());
    assert!(store.find_by_identity("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn authenticator_over_postgres() {
    if !common::container_runtime_available() {
        eprintln!("skipping: no container runtime");
        return;
    }
    let postgres = PostgresContainer::start().await.unwrap();
    let pool = postgres.pool_with_schema().await.unwrap();
    let store = PgCredentialStore::new(pool);
    let hasher = BcryptHasher::new(4);

    for (identity, password, role) in common::USERS {
        let hash = hasher.hash(&SecretString::from(password.to_string())).unwrap();
        store.create_user(identity, &hash, role).await.unwrap();
    }
    let hash = hasher.hash(&SecretString::from("x".to_string())).unwrap();
    store.create_user("mallory", &hash, "SUPERUSER").await.unwrap();

    let authenticator = Authenticator::new(Arc::new(store), Arc::new(hasher)).unwrap();

    let principal = authenticator
        .authenticate("pedro", &SecretString::from("abc".to_string()))
        .await
        .unwrap();
    assert_eq!(principal.identity(), "pedro");
    assert_eq!(principal.role(), Role::Admin);

    let principal = authenticator
        .authenticate("David", &SecretString::from("12345".to_string()))
        .await
        .unwrap();
    assert_eq!(principal.role(), Role::Student);

    let wrong = authenticator
        .verify("pedro", &SecretString::from("abcd".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(wrong, Rejection::WrongPassword));

    let unknown = authenticator
        .verify("nobody", &SecretString::from("abc".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(unknown, Rejection::NotFound));

    let misconfigured = authenticator
        .verify("mallory", &SecretString::from("x".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(misconfigured, Rejection::Configuration(_)));
}
