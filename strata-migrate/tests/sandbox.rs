//! Sandbox lifecycle and live-schema capture.

mod common;

use common::FakeDb;
use pretty_assertions::assert_eq;
use strata_migrate::snapshot::{schema_equal_with, show_create_table};
use strata_migrate::{
    HISTORY_TABLE, MigrateError, Module, Sandbox, SandboxState, Script, Snapshot,
    reverse_ddl_with_snapshot,
};
use strata_sql::{Schema, parse_script};

const SHOP: &str = "
CREATE TABLE orders (
    id BIGINT NOT NULL,
    user_id BIGINT NOT NULL,
    PRIMARY KEY (id),
    CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id)
);
CREATE TABLE users (id BIGINT NOT NULL, PRIMARY KEY (id));
";

fn module() -> Module {
    Module::new("shop")
}

/// Snapshots capture every table except the ignored ones
#[tokio::test]
async fn test_snapshot_from_database() {
    let mut db = FakeDb::new();
    db.seed(SHOP);
    db.state().history_exists = true;

    let snapshot = Snapshot::from(&mut db, &[HISTORY_TABLE]).await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.table("orders").is_some());
    assert_eq!(snapshot.install_order(), vec!["users", "orders"]);
}

/// SHOW CREATE TABLE on a missing table is not an error
#[tokio::test]
async fn test_show_create_missing_table() {
    let mut db = FakeDb::new();
    assert!(show_create_table(&mut db, "ghost").await.unwrap().is_none());
}

/// Live tables compare equal to the scripts that created them
#[tokio::test]
async fn test_schema_equal_with_live() {
    let mut db = FakeDb::new();
    db.seed(SHOP);

    let nodes = parse_script(SHOP).unwrap();
    let schema: Schema = nodes.iter().map(|n| &n.statement).collect();
    assert!(schema_equal_with(&schema, &mut db).await.unwrap().is_equal());

    let nodes = parse_script("CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));").unwrap();
    let schema: Schema = nodes.iter().map(|n| &n.statement).collect();
    assert!(!schema_equal_with(&schema, &mut db).await.unwrap().is_equal());
}

/// Reset, recover, apply, finish
#[tokio::test]
async fn test_sandbox_lifecycle() {
    let mut live = FakeDb::new();
    live.seed(SHOP);
    let snapshot = Snapshot::from(&mut live, &[]).await.unwrap();

    let server = FakeDb::new();
    server.seed("CREATE TABLE leftover (id INT);");
    let mut sandbox = Sandbox::new(Box::new(server.clone()), "shop_sandbox");
    assert_eq!(sandbox.state(), SandboxState::Failed);

    sandbox.reset().await.unwrap();
    assert_eq!(sandbox.state(), SandboxState::Fresh);
    assert!(server.table_names().is_empty());

    sandbox.recover(&snapshot).await.unwrap();
    assert_eq!(sandbox.state(), SandboxState::Recovered);
    assert_eq!(server.table_names(), vec!["users", "orders"]);

    let script = Script::sql(
        "20240101-coupons.sql",
        "CREATE TABLE coupons (id INT);\nINSERT INTO coupons VALUES (1);",
    )
    .unwrap();
    sandbox.apply(&module(), &script).await.unwrap();
    sandbox.finish().unwrap();

    assert_eq!(sandbox.state(), SandboxState::Migrated);
    assert_eq!(sandbox.applied(), ["shop/20240101-coupons.sql"]);
    assert_eq!(server.rows("coupons"), 1);
}

/// Steps out of order are refused
#[tokio::test]
async fn test_sandbox_requires_reset() {
    let server = FakeDb::new();
    let mut sandbox = Sandbox::new(Box::new(server), "shop_sandbox");
    let script = Script::sql("20240101-a.sql", "CREATE TABLE a (id INT);").unwrap();

    let err = sandbox.apply(&module(), &script).await.unwrap_err();
    assert!(matches!(err, MigrateError::Sandbox(_)));
    assert!(err.to_string().contains("expected Recovered"));

    let err = sandbox.recover(&Snapshot::default()).await.unwrap_err();
    assert!(err.to_string().contains("expected Fresh"));
}

/// A failing script leaves the sandbox unusable until the next reset
#[tokio::test]
async fn test_sandbox_apply_failure() {
    let server = FakeDb::new();
    let mut sandbox = Sandbox::new(Box::new(server.clone()), "shop_sandbox");
    sandbox.reset().await.unwrap();
    sandbox.recover(&Snapshot::default()).await.unwrap();

    let script = Script::sql("20240101-bad.sql", "INSERT INTO nope VALUES (1);").unwrap();
    let err = sandbox.apply(&module(), &script).await.unwrap_err();
    assert!(err.to_string().contains("shop/20240101-bad.sql"));
    assert_eq!(sandbox.state(), SandboxState::Failed);
    assert!(server.log().iter().any(|sql| sql == "ROLLBACK"));

    sandbox.reset().await.unwrap();
    assert_eq!(sandbox.state(), SandboxState::Fresh);
    assert!(sandbox.applied().is_empty());
}

/// Reversing SQL for ALTER TABLE is built from the live definition
#[tokio::test]
async fn test_reverse_alter_from_live_table() {
    let mut db = FakeDb::new();
    db.seed("CREATE TABLE t (id BIGINT NOT NULL, status VARCHAR(16) NOT NULL DEFAULT 'new');");

    let nodes = parse_script("ALTER TABLE t MODIFY COLUMN status VARCHAR(64) NOT NULL;").unwrap();
    let reverse = reverse_ddl_with_snapshot(&mut db, &nodes[0])
        .await
        .unwrap()
        .expect("MODIFY COLUMN has a reverse");
    assert!(reverse.starts_with("ALTER TABLE `t` CHANGE COLUMN `status` `status` VARCHAR(16)"));
    assert!(reverse.contains("DEFAULT 'new'"));

    let nodes = parse_script("ALTER TABLE ghost ADD COLUMN c INT;").unwrap();
    let err = reverse_ddl_with_snapshot(&mut db, &nodes[0]).await.unwrap_err();
    match err {
        MigrateError::Reverse { sql, message } => {
            assert_eq!(sql, nodes[0].text);
            assert!(message.contains("table not found"));
        }
        other => panic!("expected a reverse error, got {other:?}"),
    }
}
