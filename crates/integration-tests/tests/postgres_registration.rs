//! Postgres Registration Tests
//!
//! Real subprocess adapter against a scripted `piccolo`, in-memory server
//! and engine factory.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cogdb_core::application::{DatabaseRegistrar, RegisterOptions, RegistrarTimeouts};
use cogdb_core::domain::{ConfigError, ConnectionConfig, PluginIdentity};
use cogdb_core::error::AppError;
use cogdb_core::port::database_admin::mocks::MockDatabaseAdmin;
use cogdb_core::port::engine::mocks::{MockEngineFactory, MockFactoryBehavior};
use cogdb_core::port::{BoundTable, Engine, TableBinding};
use cogdb_infra_system::PiccoloCli;

const NO_OP: &str = "echo 'No migrations need to be run'";
const BROKEN: &str = "echo 'Traceback (most recent call last):'; echo 'boom' >&2; exit 1";

/// Scratch plugin named `Economy` plus a fake `piccolo` that logs each call
struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    log: PathBuf,
    tool: PathBuf,
}

impl Fixture {
    fn new(forwards: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("Economy");
        std::fs::create_dir(&root).unwrap();
        let root = root.canonicalize().unwrap();
        let log = tmp.path().join("calls.log");

        let tool = tmp.path().join("piccolo");
        let body = format!(
            r#"#!/bin/sh
echo "$(pwd -P)|$APP_NAME|$PICCOLO_CONF|$POSTGRES_DATABASE|$POSTGRES_HOST|$*" >> "{log}"
case "$1 $2" in
  "migrations forwards") {forwards} ;;
  "migrations check") echo 'check: all consistent' ;;
  "--diagnose ") echo 'diagnosis: missing table' ;;
  *) echo "unexpected: $*" ;;
esac
"#,
            log = log.display(),
            forwards = forwards,
        );
        std::fs::write(&tool, body).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            _tmp: tmp,
            root,
            log,
            tool,
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        read_calls(&self.log)
    }
}

fn read_calls(log: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(|line| line.split('|').map(str::to_string).collect())
        .collect()
}

fn config() -> ConnectionConfig {
    ConnectionConfig::new()
        .set("host", "x")
        .set("user", "y")
        .set("password", "z")
}

/// Test 1: Fresh plugin gets its database, migrations and a running pool
#[tokio::test]
async fn test_register_end_to_end() {
    let fixture = Fixture::new(NO_OP);
    let admin = MockDatabaseAdmin::new(&["postgres", "template1"]);
    let engines = Arc::new(MockEngineFactory::new_success());
    let registrar = DatabaseRegistrar::new(
        Arc::new(admin.clone()),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        engines.clone(),
    );

    let accounts = BoundTable::new("accounts");
    let tables: Vec<Arc<dyn TableBinding>> = vec![accounts.clone() as Arc<dyn TableBinding>];
    let config = config();

    let engine = registrar
        .register(
            &PluginIdentity::from_path(&fixture.root),
            &tables,
            &config,
            RegisterOptions::default(),
        )
        .await
        .unwrap();

    // Provisioning
    assert_eq!(
        admin.statements(),
        vec![
            "SELECT datname FROM pg_database;".to_string(),
            "CREATE DATABASE \"economy\";".to_string(),
        ]
    );
    assert_eq!(admin.close_count(), 1);
    assert_eq!(admin.last_config().unwrap(), config);

    // Migration tool saw the plugin environment, in the plugin root
    let calls = fixture.calls();
    assert_eq!(calls.len(), 1, "only forwards should run: {:?}", calls);
    let call = &calls[0];
    assert_eq!(PathBuf::from(&call[0]), fixture.root);
    assert_eq!(call[1], "Economy");
    assert_eq!(call[2], "db.piccolo_conf");
    assert_eq!(call[3], "economy");
    assert_eq!(call[4], "x");
    assert_eq!(call[5], "migrations forwards Economy");

    // Engine built against the plugin database with default extensions
    let (engine_config, extensions) = engines.calls().remove(0);
    assert_eq!(engine_config.database(), Some("economy"));
    assert_eq!(engine_config.get("host"), Some("x"));
    assert_eq!(extensions, vec!["uuid-ossp".to_string()]);

    assert!(engine.is_pool_started());
    assert_eq!(accounts.engine().unwrap().database(), "economy");

    // Caller's config untouched
    assert_eq!(config.database(), None);

    println!("✅ End-to-end: database provisioned, migrated, pool started, tables bound");
}

/// Test 2: Second registration is idempotent for provisioning
#[tokio::test]
async fn test_register_twice_creates_once() {
    let fixture = Fixture::new(NO_OP);
    let admin = MockDatabaseAdmin::new(&["postgres"]);
    let registrar = DatabaseRegistrar::new(
        Arc::new(admin.clone()),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        Arc::new(MockEngineFactory::new_success()),
    );
    let identity = PluginIdentity::from_path(&fixture.root);

    for _ in 0..2 {
        registrar
            .register(&identity, &[], &config(), RegisterOptions::default())
            .await
            .unwrap();
    }

    let creates = admin
        .statements()
        .iter()
        .filter(|s| s.starts_with("CREATE DATABASE"))
        .count();
    assert_eq!(creates, 1);
    assert_eq!(admin.close_count(), 2);

    println!("✅ Idempotent provisioning");
}

/// Test 3: Broken migration triggers diagnostics but registration completes
#[tokio::test]
async fn test_failed_migration_runs_diagnostics() {
    let fixture = Fixture::new(BROKEN);
    let registrar = DatabaseRegistrar::new(
        Arc::new(MockDatabaseAdmin::new(&["economy"])),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        Arc::new(MockEngineFactory::new_success()),
    );

    let engine = registrar
        .register(
            &PluginIdentity::from_path(&fixture.root),
            &[],
            &config(),
            RegisterOptions::default(),
        )
        .await
        .unwrap();
    assert!(engine.is_pool_started());

    let args: Vec<String> = fixture.calls().into_iter().map(|c| c[5].clone()).collect();
    assert_eq!(
        args,
        vec![
            "migrations forwards Economy".to_string(),
            "--diagnose".to_string(),
            "migrations check".to_string(),
        ]
    );

    println!("✅ Failed migration: diagnosed, registration continued");
}

/// Test 4: Diagnose output joins both tool runs
#[tokio::test]
async fn test_diagnose_issues_joins_output() {
    let fixture = Fixture::new(NO_OP);
    let registrar = DatabaseRegistrar::new(
        Arc::new(MockDatabaseAdmin::new(&[])),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        Arc::new(MockEngineFactory::new_success()),
    );

    let report = registrar
        .diagnose_issues(&PluginIdentity::from_path(&fixture.root), &config())
        .await
        .unwrap();

    assert_eq!(report, "diagnosis: missing table\n\ncheck: all consistent\n");

    println!("✅ Diagnose: both outputs joined");
}

/// Test 5: skip_migrations never spawns the tool
#[tokio::test]
async fn test_skip_migrations_never_spawns() {
    let fixture = Fixture::new(NO_OP);
    let registrar = DatabaseRegistrar::new(
        Arc::new(MockDatabaseAdmin::new(&[])),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        Arc::new(MockEngineFactory::new_success()),
    );

    let options = RegisterOptions {
        skip_migrations: true,
        ..RegisterOptions::default()
    };
    registrar
        .register(&PluginIdentity::from_path(&fixture.root), &[], &config(), options)
        .await
        .unwrap();

    assert!(fixture.calls().is_empty());

    println!("✅ skip_migrations: tool never invoked");
}

/// Test 6: Missing executable aborts before an engine is built
#[tokio::test]
async fn test_missing_executable_aborts() {
    let fixture = Fixture::new(NO_OP);
    let engines = Arc::new(MockEngineFactory::new_success());
    let registrar = DatabaseRegistrar::new(
        Arc::new(MockDatabaseAdmin::new(&[])),
        Arc::new(PiccoloCli::with_executable(fixture.root.join("no-such-piccolo"))),
        engines.clone(),
    );

    let err = registrar
        .register(
            &PluginIdentity::from_path(&fixture.root),
            &[],
            &config(),
            RegisterOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Execution(_)), "got {:?}", err);
    assert!(engines.calls().is_empty());

    println!("✅ Missing executable: registration aborted");
}

/// Test 7: Stalled engine construction times out with no pool started
#[tokio::test]
async fn test_engine_construction_timeout() {
    let fixture = Fixture::new(NO_OP);
    let engines = Arc::new(MockEngineFactory::new(MockFactoryBehavior::Slow(
        Duration::from_millis(500),
    )));
    let registrar = DatabaseRegistrar::new(
        Arc::new(MockDatabaseAdmin::new(&[])),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        engines.clone(),
    )
    .with_timeouts(RegistrarTimeouts {
        admin_connect: Duration::from_secs(5),
        engine_construct: Duration::from_millis(50),
    });

    let err = registrar
        .register(
            &PluginIdentity::from_path(&fixture.root),
            &[],
            &config(),
            RegisterOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {:?}", err);

    // Let the blocking construction finish, then confirm nothing was started
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(engines.engines().iter().all(|e| !e.is_pool_started()));

    println!("✅ Engine timeout: ConnectionTimeout, no pool");
}

/// Test 8: Files instead of directories are rejected before provisioning
#[tokio::test]
async fn test_file_root_rejected() {
    let fixture = Fixture::new(NO_OP);
    let admin = MockDatabaseAdmin::new(&[]);
    let registrar = DatabaseRegistrar::new(
        Arc::new(admin.clone()),
        Arc::new(PiccoloCli::with_executable(&fixture.tool)),
        Arc::new(MockEngineFactory::new_success()),
    );

    let err = registrar
        .register(
            &PluginIdentity::from_path(&fixture.tool),
            &[],
            &config(),
            RegisterOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Config(ConfigError::InvalidDirectory(_))
    ));
    assert_eq!(admin.connect_count(), 0);
    assert!(fixture.calls().is_empty());

    println!("✅ Non-directory root rejected");
}
