//! End-to-end runs of the migrator against the in-memory server.

mod common;

use common::{FakeConnector, config};
use pretty_assertions::assert_eq;
use strata_migrate::{
    InstallingType, LintConfig, MigrateError, Migrator, MigratorConfig, Module, Phase,
    SandboxState, Script, ScriptStatus, Scripts, default_rules,
};

const INIT: &str = "CREATE TABLE t (id bigint);\nINSERT INTO t VALUES (1);\n";
const ADD_NAME: &str = "ALTER TABLE t ADD COLUMN name VARCHAR(32) NOT NULL DEFAULT '';\n";

fn sql(name: &str, text: &str) -> Script {
    Script::sql(name, text).expect("script should parse")
}

fn orders(scripts: Vec<Script>) -> Scripts {
    let module = scripts
        .into_iter()
        .fold(Module::new("orders"), |module, script| module.script(script));
    Scripts::new(vec![module])
}

fn migrator(connector: &FakeConnector, config: MigratorConfig, scripts: Scripts) -> Migrator {
    Migrator::new(config, scripts, Vec::new(), Box::new(connector.clone()))
}

/// Install `INIT` on a fresh database.
async fn installed() -> FakeConnector {
    let connector = FakeConnector::new();
    migrator(&connector, config(), orders(vec![sql("20240101-init.sql", INIT)]))
        .run()
        .await
        .expect("first install should succeed");
    connector.live.clear_log();
    connector
}

/// A fresh database gets the script applied once and a history row
#[tokio::test]
async fn test_first_time_install() {
    let connector = FakeConnector::new();
    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![sql("20240101-init.sql", INIT)]),
    );

    let report = migrator.run().await.expect("migration should succeed");

    assert_eq!(report.installing_type, InstallingType::FirstTimeInstall);
    assert_eq!(
        report.applied,
        vec![("orders".to_string(), "20240101-init.sql".to_string())]
    );
    assert!(report.skipped.is_empty());
    assert_eq!(connector.live.rows("t"), 1);

    let history = connector.live.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].0, "orders");
    assert_eq!(history[0].1, "20240101-init.sql");
    assert!(history[0].2.contains("DROP TABLE IF EXISTS t;"));
}

/// Pre-migrate changes are undone before the real run
#[tokio::test]
async fn test_pre_migrate_is_reverted() {
    let connector = FakeConnector::new();
    migrator(&connector, config(), orders(vec![sql("20240101-init.sql", INIT)]))
        .run()
        .await
        .unwrap();

    let log = connector.live.log();
    let creates: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, sql)| sql.starts_with("CREATE TABLE t"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(creates.len(), 2, "dry run and install both create t");

    let drop = log
        .iter()
        .position(|sql| sql.starts_with("DROP TABLE IF EXISTS t;"))
        .expect("pre-migrate replays the reversing SQL");
    assert!(creates[0] < drop && drop < creates[1]);
}

/// The sandbox sees every pending script before the live database does
#[tokio::test]
async fn test_sandbox_runs_first() {
    let connector = FakeConnector::new();
    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![sql("20240101-init.sql", INIT)]),
    );
    migrator.run().await.unwrap();

    let sandbox = migrator.sandbox().expect("sandbox should be connected");
    assert_eq!(sandbox.state(), SandboxState::Migrated);
    assert_eq!(sandbox.database(), "app_sandbox");
    assert_eq!(sandbox.applied(), ["orders/20240101-init.sql"]);
    assert_eq!(connector.sandbox.rows("t"), 1);

    let log = connector.sandbox.log();
    assert_eq!(log[0], "DROP DATABASE IF EXISTS `app_sandbox`");
    assert_eq!(log[2], "USE `app_sandbox`");
}

/// Scripts already installed are skipped on the next run
#[tokio::test]
async fn test_normal_update() {
    let connector = installed().await;
    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql("20240201-name.sql", ADD_NAME),
        ]),
    );

    let report = migrator.run().await.expect("update should succeed");

    assert_eq!(report.installing_type, InstallingType::NormalUpdate);
    assert_eq!(
        report.applied,
        vec![("orders".to_string(), "20240201-name.sql".to_string())]
    );
    assert_eq!(connector.live.column_names("t"), vec!["id", "name"]);
    assert_eq!(connector.live.rows("t"), 1, "init must not run again");

    let history = connector.live.history();
    assert_eq!(history.len(), 2);
    assert!(history[1].2.contains("DROP COLUMN `name`"));

    // The sandbox starts from the live schema.
    assert_eq!(connector.sandbox.column_names("t"), vec!["id", "name"]);
}

/// A second run with nothing pending changes nothing
#[tokio::test]
async fn test_rerun_is_noop() {
    let connector = installed().await;
    let report = migrator(&connector, config(), orders(vec![sql("20240101-init.sql", INIT)]))
        .run()
        .await
        .unwrap();

    assert_eq!(report.installing_type, InstallingType::NormalUpdate);
    assert!(!report.has_changes());
    assert_eq!(connector.live.history().len(), 1);
    assert_eq!(connector.live.rows("t"), 1);
}

/// Destructive statements skip pre-migrate but still install
#[tokio::test]
async fn test_destructive_skips_pre_migrate() {
    let connector = installed().await;
    let report = migrator(
        &connector,
        config(),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql(
                "20240301-scratch.sql",
                "CREATE TABLE scratch (id INT);\nDROP TABLE scratch;\n",
            ),
        ]),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.skipped, vec![Phase::PreMigrate]);
    assert_eq!(report.applied.len(), 1);
    assert!(!connector.live.has_table("scratch"));

    let creates = connector
        .live
        .log()
        .iter()
        .filter(|sql| sql.starts_with("CREATE TABLE scratch"))
        .count();
    assert_eq!(creates, 1, "no dry run against the live database");
}

/// A failing statement rolls the script back and replays its reversing SQL
#[tokio::test]
async fn test_failed_script_is_reversed() {
    let connector = FakeConnector::new();
    let result = migrator(
        &connector,
        config().skip_sandbox(true).skip_pre_migrate(true),
        orders(vec![sql(
            "20240101-init.sql",
            "CREATE TABLE a (id INT);\nINSERT INTO missing VALUES (1);\n",
        )]),
    )
    .run()
    .await;

    match result {
        Err(MigrateError::Execution {
            module, filename, ..
        }) => {
            assert_eq!(module, "orders");
            assert_eq!(filename, "20240101-init.sql");
        }
        other => panic!("expected an execution error, got {other:?}"),
    }
    assert!(!connector.live.has_table("a"));
    assert!(connector.live.history().is_empty());
    assert!(
        connector
            .live
            .log()
            .iter()
            .any(|sql| sql == "DROP TABLE IF EXISTS a;\n")
    );
}

/// A rename that committed before the failure is renamed back
#[tokio::test]
async fn test_failed_rename_is_reversed() {
    let connector = installed().await;
    let err = migrator(
        &connector,
        config().skip_sandbox(true).skip_pre_migrate(true),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql(
                "20240201-rename.sql",
                "RENAME TABLE t TO t_old;\nINSERT INTO missing VALUES (1);\n",
            ),
        ]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::Execution { .. }));
    assert!(connector.live.has_table("t"));
    assert!(!connector.live.has_table("t_old"));
    assert_eq!(connector.live.rows("t"), 1);
    assert_eq!(connector.live.history().len(), 1);

    let log = connector.live.log();
    let renamed = log
        .iter()
        .position(|sql| sql.starts_with("RENAME TABLE t TO t_old"))
        .expect("the rename reached the database");
    let restored = log
        .iter()
        .position(|sql| sql == "RENAME TABLE t_old TO t;\n")
        .expect("the rename was replayed backwards");
    assert!(renamed < restored);
}

/// The dry run against the live database also undoes a rename
#[tokio::test]
async fn test_pre_migrate_failure_restores_rename() {
    let connector = installed().await;
    let err = migrator(
        &connector,
        config().skip_sandbox(true),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql(
                "20240201-rename.sql",
                "RENAME TABLE t TO t_old;\nINSERT INTO missing VALUES (1);\n",
            ),
        ]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::Execution { .. }));
    assert_eq!(connector.live.table_names(), vec!["t"]);
    let renames = connector
        .live
        .log()
        .iter()
        .filter(|sql| sql.starts_with("RENAME TABLE"))
        .count();
    assert_eq!(renames, 2, "one dry-run rename and its reversal");
}

/// MODIFY and CHANGE record the previous column definition as their reverse
#[tokio::test]
async fn test_column_changes_are_recorded_reversibly() {
    let connector = installed().await;
    let scripts = || {
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql(
                "20240201-status.sql",
                "ALTER TABLE t ADD COLUMN status VARCHAR(16) NOT NULL DEFAULT 'new';\n",
            ),
            sql(
                "20240301-widen.sql",
                "ALTER TABLE t MODIFY COLUMN status VARCHAR(64) NOT NULL DEFAULT 'new';\n\
                 ALTER TABLE t CHANGE COLUMN status state VARCHAR(64) NOT NULL DEFAULT 'new';\n",
            ),
        ])
    };

    let mut migrator = migrator(&connector, config(), scripts());
    let report = migrator.run().await.expect("column changes should install");
    assert_eq!(report.applied.len(), 2);
    assert_eq!(connector.live.column_names("t"), vec!["id", "state"]);

    let record = migrator
        .recorded_reversing("orders", "20240301-widen.sql")
        .await
        .unwrap()
        .expect("script should be recorded");
    let reversing = record.reversing();
    assert_eq!(reversing.len(), 2);
    assert!(
        reversing[0].starts_with("ALTER TABLE `t` CHANGE COLUMN `status` `status` VARCHAR(16)"),
        "{reversing:?}"
    );
    assert!(
        reversing[1].starts_with("ALTER TABLE `t` CHANGE COLUMN `state` `status` VARCHAR(64)"),
        "{reversing:?}"
    );
}

/// A failing CHANGE COLUMN script puts the old column back
#[tokio::test]
async fn test_failed_change_column_is_reversed() {
    let connector = installed().await;
    let err = migrator(
        &connector,
        config().skip_sandbox(true).skip_pre_migrate(true),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql(
                "20240201-rename-id.sql",
                "ALTER TABLE t CHANGE COLUMN id order_id BIGINT;\nINSERT INTO missing VALUES (1);\n",
            ),
        ]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::Execution { .. }));
    assert_eq!(connector.live.column_names("t"), vec!["id"]);
    assert!(
        connector
            .live
            .log()
            .iter()
            .any(|sql| sql.starts_with("ALTER TABLE `t` CHANGE COLUMN `order_id` `id`"))
    );
}

/// Later scripts do not run once one fails
#[tokio::test]
async fn test_stops_at_first_failure() {
    let connector = FakeConnector::new();
    let mut migrator = migrator(
        &connector,
        config().skip_sandbox(true).skip_pre_migrate(true),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql("20240102-bad.sql", "INSERT INTO missing VALUES (1);\n"),
            sql("20240103-later.sql", "CREATE TABLE later (id INT);\n"),
        ]),
    );

    assert!(migrator.run().await.is_err());
    assert!(connector.live.has_table("t"));
    assert!(!connector.live.has_table("later"));
    assert_eq!(connector.live.history().len(), 1);
    assert_eq!(migrator.scripts().pending_count(), 2);
}

/// A history write failure undoes the script
#[tokio::test]
async fn test_history_failure_rolls_back() {
    let connector = FakeConnector::new();
    connector.live.fail_on("INSERT INTO schema_migration_history");

    let err = migrator(
        &connector,
        config().skip_sandbox(true).skip_pre_migrate(true),
        orders(vec![sql("20240101-init.sql", "CREATE TABLE a (id INT);\n")]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::History { .. }));
    assert!(err.to_string().contains("all migrations will be rolled back"));
    assert!(!connector.live.has_table("a"));
}

/// A script that fails in the sandbox never reaches the live database
#[tokio::test]
async fn test_sandbox_failure_protects_live() {
    let connector = FakeConnector::new();
    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![sql(
            "20240101-init.sql",
            "CREATE TABLE a (id INT);\nINSERT INTO nope VALUES (1);\n",
        )]),
    );

    let err = migrator.run().await.unwrap_err();
    assert!(matches!(err, MigrateError::Sandbox(_)));
    assert!(err.to_string().contains("orders/20240101-init.sql"));
    assert_eq!(
        migrator.sandbox().map(|s| s.state()),
        Some(SandboxState::Failed)
    );
    assert!(!connector.live.has_table("a"));
    assert!(connector.live.history().is_empty());
}

/// Skipping migrate leaves the live database as it was
#[tokio::test]
async fn test_skip_migrate() {
    let connector = FakeConnector::new();
    let report = migrator(
        &connector,
        config().skip_migrate(true),
        orders(vec![sql("20240101-init.sql", INIT)]),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.skipped, vec![Phase::Migrate]);
    assert!(report.applied.is_empty());
    assert!(!connector.live.has_table("t"));
    assert!(connector.live.history().is_empty());
}

/// Lint violations stop the run before any script executes
#[tokio::test]
async fn test_lint_failure() {
    let connector = FakeConnector::new();
    let err = Migrator::new(
        config(),
        orders(vec![sql("20240101-init.sql", INIT)]),
        default_rules(&LintConfig::default()),
        Box::new(connector.clone()),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::Lint(_)));
    assert!(err.is_lint());
    assert!(!connector.live.has_table("t"));
    assert!(connector.sandbox.log().is_empty());
}

/// Editing an installed script is refused
#[tokio::test]
async fn test_installed_script_changed() {
    let connector = installed().await;
    let err = migrator(
        &connector,
        config(),
        orders(vec![sql(
            "20240101-init.sql",
            "CREATE TABLE t (id bigint);\nINSERT INTO t VALUES (2);\n",
        )]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::InstalledChanges(_)));
    assert_eq!(connector.live.history().len(), 1);
}

/// Scripts may not share a file name across modules
#[tokio::test]
async fn test_same_name_across_modules() {
    let connector = FakeConnector::new();
    let scripts = Scripts::new(vec![
        Module::new("billing").script(sql("20240101-init.sql", "CREATE TABLE b (id INT);")),
        Module::new("orders").script(sql("20240101-init.sql", "CREATE TABLE o (id INT);")),
    ]);

    let err = migrator(&connector, config(), scripts)
        .run()
        .await
        .unwrap_err();
    match err {
        MigrateError::SameName(message) => {
            assert!(message.contains("20240101-init.sql appears in modules billing, orders"));
        }
        other => panic!("expected a same name error, got {other:?}"),
    }
}

/// A module may only alter its own tables
#[tokio::test]
async fn test_alter_foreign_table() {
    let connector = FakeConnector::new();
    let scripts = Scripts::new(vec![
        Module::new("billing").script(sql("20240101-b.sql", "CREATE TABLE invoices (id INT);")),
        Module::new("orders").script(sql(
            "20240102-o.sql",
            "ALTER TABLE invoices ADD COLUMN order_id INT;",
        )),
    ]);

    let err = migrator(&connector, config(), scripts)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::AlterPermission(_)));
    assert!(err.to_string().contains("alters table invoices"));
}

/// Existing tables with no history are checked against the baseline
#[tokio::test]
async fn test_first_time_update() {
    let connector = FakeConnector::new();
    connector
        .live
        .seed("CREATE TABLE t (id BIGINT NOT NULL, PRIMARY KEY (id));");

    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![
            sql(
                "20230101-base.sql",
                "-- MIGRATION_BASE\nCREATE TABLE t (id BIGINT NOT NULL, PRIMARY KEY (id));\n",
            ),
            sql("20240201-name.sql", ADD_NAME),
        ]),
    );
    let report = migrator.run().await.expect("first update should succeed");

    assert_eq!(report.installing_type, InstallingType::FirstTimeUpdate);
    assert_eq!(
        report.baselined,
        vec![("orders".to_string(), "20230101-base.sql".to_string())]
    );
    assert_eq!(
        report.applied,
        vec![("orders".to_string(), "20240201-name.sql".to_string())]
    );
    assert_eq!(connector.live.column_names("t"), vec!["id", "name"]);

    let history = connector.live.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].1, "20230101-base.sql");
    assert_eq!(history[0].2, r#"["DROP TABLE IF EXISTS t;\n"]"#);
}

/// A baseline that does not describe the live schema stops the run
#[tokio::test]
async fn test_first_time_update_mismatch() {
    let connector = FakeConnector::new();
    connector
        .live
        .seed("CREATE TABLE t (id BIGINT NOT NULL, extra INT);");

    let err = migrator(
        &connector,
        config(),
        orders(vec![sql(
            "20230101-base.sql",
            "-- MIGRATION_BASE\nCREATE TABLE t (id BIGINT NOT NULL);\n",
        )]),
    )
    .run()
    .await
    .unwrap_err();

    match &err {
        MigrateError::BaselineMismatch { module, .. } => assert_eq!(module, "orders"),
        other => panic!("expected a baseline mismatch, got {other:?}"),
    }
    assert!(err.is_lint());
    assert!(!connector.live.state().history_exists);
}

/// Status reports each script without touching the schema
#[tokio::test]
async fn test_status() {
    let connector = installed().await;
    let mut migrator = migrator(
        &connector,
        config(),
        orders(vec![
            sql("20240101-init.sql", INIT),
            sql("20240201-name.sql", ADD_NAME),
        ]),
    );

    let states = migrator.status().await.unwrap();
    let statuses: Vec<_> = states.iter().map(|s| (s.filename.as_str(), s.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("20240101-init.sql", ScriptStatus::Installed),
            ("20240201-name.sql", ScriptStatus::Pending),
        ]
    );
    assert_eq!(connector.live.column_names("t"), vec!["id"]);
}

/// Status flags edited scripts
#[tokio::test]
async fn test_status_checksum_changed() {
    let connector = installed().await;
    let states = migrator(
        &connector,
        config(),
        orders(vec![sql("20240101-init.sql", "CREATE TABLE t (id int);\n")]),
    )
    .status()
    .await
    .unwrap();

    assert_eq!(states[0].status, ScriptStatus::ChecksumChanged);
}

/// The recorded reversing SQL can be read back
#[tokio::test]
async fn test_recorded_reversing() {
    let connector = installed().await;
    let mut migrator = migrator(&connector, config(), orders(vec![sql("20240101-init.sql", INIT)]));

    let record = migrator
        .recorded_reversing("orders", "20240101-init.sql")
        .await
        .unwrap()
        .expect("script should be recorded");
    assert_eq!(record.reversing(), vec!["DROP TABLE IF EXISTS t;"]);
    assert_eq!(record.installed_by, "tests");

    assert!(
        migrator
            .recorded_reversing("orders", "20990101-none.sql")
            .await
            .unwrap()
            .is_none()
    );
}

const EDITED_INIT: &str =
    "CREATE TABLE t (id bigint, note VARCHAR(8));\nINSERT INTO t VALUES (1);\n";

/// A patch brings an edited, installed script's changes to the database
#[tokio::test]
async fn test_patch_repairs_installed_script() {
    let connector = installed().await;
    let edited = sql("20240101-init.sql", EDITED_INIT);
    let checksum = edited.checksum().to_string();
    let scripts = || {
        Scripts::new(vec![
            Module::new("orders")
                .script(sql("20240101-init.sql", EDITED_INIT))
                .patch(sql(
                    "patch-20240101-init.sql",
                    "ALTER TABLE t ADD COLUMN note VARCHAR(8);\n",
                )),
        ])
    };

    let report = migrator(&connector, config(), scripts())
        .run()
        .await
        .expect("patched run should pass the installed-changes lint");

    assert_eq!(
        report.patched,
        vec![("orders".to_string(), "patch-20240101-init.sql".to_string())]
    );
    assert!(report.applied.is_empty());
    assert!(report.has_changes());
    assert_eq!(connector.live.column_names("t"), vec!["id", "note"]);
    assert_eq!(
        connector.live.checksums(),
        vec![("20240101-init.sql".to_string(), checksum)]
    );
    // The sandbox starts from the patched schema.
    assert_eq!(connector.sandbox.column_names("t"), vec!["id", "note"]);

    let report = migrator(&connector, config(), scripts()).run().await.unwrap();
    assert!(report.patched.is_empty(), "the checksum already matches");
    assert_eq!(connector.live.column_names("t"), vec!["id", "note"]);
}

/// A patch whose script is still pending is left alone
#[tokio::test]
async fn test_patch_waits_for_target() {
    let connector = installed().await;
    let report = migrator(
        &connector,
        config(),
        Scripts::new(vec![
            Module::new("orders")
                .script(sql("20240101-init.sql", INIT))
                .script(sql("20240201-name.sql", ADD_NAME))
                .patch(sql(
                    "patch-20240201-name.sql",
                    "ALTER TABLE t ADD COLUMN extra INT;\n",
                )),
        ]),
    )
    .run()
    .await
    .unwrap();

    assert!(report.patched.is_empty());
    assert_eq!(
        report.applied,
        vec![("orders".to_string(), "20240201-name.sql".to_string())]
    );
    assert_eq!(connector.live.column_names("t"), vec!["id", "name"]);
}

/// A failing patch is undone and leaves the recorded checksum alone
#[tokio::test]
async fn test_failed_patch_is_reversed() {
    let connector = installed().await;
    let original = sql("20240101-init.sql", INIT).checksum().to_string();

    let err = migrator(
        &connector,
        config(),
        Scripts::new(vec![
            Module::new("orders")
                .script(sql("20240101-init.sql", EDITED_INIT))
                .patch(sql(
                    "patch-20240101-init.sql",
                    "ALTER TABLE t ADD COLUMN note VARCHAR(8);\nINSERT INTO missing VALUES (1);\n",
                )),
        ]),
    )
    .run()
    .await
    .unwrap_err();

    match err {
        MigrateError::Execution { filename, .. } => {
            assert_eq!(filename, "patch-20240101-init.sql")
        }
        other => panic!("expected an execution error, got {other:?}"),
    }
    assert_eq!(connector.live.column_names("t"), vec!["id"]);
    assert_eq!(
        connector.live.checksums(),
        vec![("20240101-init.sql".to_string(), original)]
    );
}

/// Installed SQL lands in the collector file, once per statement
#[tokio::test]
async fn test_collects_installed_sql() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new();
    let mut migrator = migrator(
        &connector,
        config().sql_collector_dir(dir.path()),
        orders(vec![sql("20240101-init.sql", INIT)]),
    );
    migrator.run().await.unwrap();

    let path = migrator
        .collector()
        .expect("collector is configured")
        .path()
        .to_path_buf();
    assert!(path.starts_with(dir.path()));
    let collected = std::fs::read_to_string(&path).unwrap();
    assert!(collected.starts_with("-- orders/20240101-init.sql\n"), "{collected}");
    assert_eq!(
        collected.matches("CREATE TABLE t").count(),
        1,
        "sandbox and pre-migrate runs are not collected"
    );
    assert!(collected.contains("INSERT INTO t VALUES (1);\n"));
}

/// Without a collector directory nothing is written
#[tokio::test]
async fn test_no_collector_by_default() {
    let connector = FakeConnector::new();
    let mut migrator = migrator(&connector, config(), orders(vec![sql("20240101-init.sql", INIT)]));
    migrator.run().await.unwrap();
    assert!(migrator.collector().is_none());
}
