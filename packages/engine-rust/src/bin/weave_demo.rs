//! # Weave demo
//!
//! Wraps a small in-memory user service in policies and runs a scripted
//! sequence of calls against it, logging each outcome.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use dashmap::DashMap;
use weave_engine::adapters::RuleValidator;
use weave_engine::logging::{init_logging, resolve_filter, LogFormat};
use weave_engine::traits::{TransactionProvider, TransactionScope};
use weave_engine::{
    Capabilities, Completion, EngineConfig, OperationError, OperationId, PolicyDescriptor,
    PolicyRegistry, PolicyTable, Value, Weaver,
};

const COMPONENT: &str = "UserService";

#[derive(Parser, Debug)]
#[command(name = "weave-demo")]
#[command(about = "Runs a sample service through the Weave interception engine", long_about = None)]
struct Args {
    /// JSON policy table; the built-in declarations are used when omitted
    #[arg(short, long, env = "WEAVE_POLICIES")]
    policies: Option<PathBuf>,

    /// JSON engine config; defaults apply when omitted
    #[arg(short, long, env = "WEAVE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// `EnvFilter` directives (override `RUST_LOG` and the config file)
    #[arg(long)]
    log_filter: Option<String>,

    /// How many times each read is repeated
    #[arg(short, long, default_value_t = 2)]
    repeat: u32,

    /// Default cache duration in minutes (overrides the config file)
    #[arg(long)]
    cache_minutes: Option<u32>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Provider whose scopes only log what would happen.
struct LoggedTransactions {
    next_id: AtomicI64,
}

struct LoggedScope {
    id: i64,
}

#[async_trait]
impl TransactionProvider for LoggedTransactions {
    async fn open(&self) -> anyhow::Result<Box<dyn TransactionScope>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::info!(scope = id, "begin");
        Ok(Box::new(LoggedScope { id }))
    }
}

#[async_trait]
impl TransactionScope for LoggedScope {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        tracing::info!(scope = self.id, "commit");
        Ok(())
    }

    async fn dispose(self: Box<Self>) {
        tracing::info!(scope = self.id, "rollback");
    }
}

// ---------------------------------------------------------------------------
// UserService
// ---------------------------------------------------------------------------

struct UserService {
    weaver: Weaver,
    users: Arc<DashMap<i64, Value>>,
    next_id: Arc<AtomicI64>,
}

impl UserService {
    fn op(name: &str) -> OperationId {
        OperationId::new(COMPONENT, name)
    }

    async fn get_by_id(&self, id: i64) -> Result<Value, OperationError> {
        let users = Arc::clone(&self.users);
        self.weaver
            .invoke(&Self::op("get_by_id"), vec![Value::Int(id)], move || {
                match users.get(&id) {
                    Some(user) => Completion::ready(user.clone()),
                    None => Completion::failed(anyhow::anyhow!("user {id} not found")),
                }
            })
            .await
    }

    async fn get_all(&self) -> Result<Value, OperationError> {
        let users = Arc::clone(&self.users);
        self.weaver
            .invoke(&Self::op("get_all"), Vec::new(), move || {
                let mut all: Vec<(i64, Value)> =
                    users.iter().map(|e| (*e.key(), e.value().clone())).collect();
                all.sort_by_key(|(id, _)| *id);
                Completion::ready(Value::Array(all.into_iter().map(|(_, u)| u).collect()))
            })
            .await
    }

    /// Simulates a slow write on a spawned task.
    async fn create(&self, dto: Value) -> Result<Value, OperationError> {
        let users = Arc::clone(&self.users);
        let next_id = Arc::clone(&self.next_id);
        let payload = dto.clone();
        self.weaver
            .invoke(&Self::op("create"), vec![dto], move || {
                Completion::Spawned(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let id = next_id.fetch_add(1, Ordering::SeqCst);
                    users.insert(id, payload);
                    Ok(Value::Int(id))
                }))
            })
            .await
    }
}

fn user_dto(name: &str, email: &str) -> Value {
    Value::record(
        "CreateUserDto",
        [("name", Value::from(name)), ("email", Value::from(email))],
    )
}

fn built_in_registry() -> PolicyRegistry {
    let get_by_id = UserService::op("get_by_id");
    let get_all = UserService::op("get_all");
    let create = UserService::op("create");

    let mut registry = PolicyRegistry::new();
    registry
        .component(COMPONENT, PolicyDescriptor::performance_timer(1).with_priority(100))
        .operation(get_by_id.clone(), PolicyDescriptor::identifier_check().with_priority(1))
        .operation(get_by_id, PolicyDescriptor::cache(5).with_priority(2))
        .operation(get_all, PolicyDescriptor::cache(5).with_priority(2))
        .operation(create.clone(), PolicyDescriptor::null_argument_check().with_priority(1))
        .operation(create.clone(), PolicyDescriptor::validate("CreateUserValidator").with_priority(2))
        .operation(create.clone(), PolicyDescriptor::transactional_scope().with_priority(3))
        .operation(
            create,
            PolicyDescriptor::cache_invalidate(format!("{COMPONENT}.get_all()")).with_priority(4),
        );
    registry
}

fn report(label: &str, result: &Result<Value, OperationError>) {
    match result {
        Ok(value) => tracing::info!(call = label, %value, "ok"),
        Err(error) => tracing::warn!(call = label, %error, "failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(minutes) = args.cache_minutes {
        config.default_cache_minutes = minutes;
    }
    init_logging(
        args.log_format,
        resolve_filter(args.log_filter.as_deref(), &config.log_filter)?,
    )?;

    let registry = match &args.policies {
        Some(path) => PolicyRegistry::from_table(&PolicyTable::load(path)?)?,
        None => built_in_registry(),
    };
    let capabilities = Capabilities::default()
        .with_validator(
            "CreateUserValidator",
            Arc::new(
                RuleValidator::new("CreateUserDto")
                    .required("name", "Name is required")
                    .max_length("name", 40, "Name must be at most 40 characters")
                    .required("email", "Email is required")
                    .must(
                        "email",
                        |v| v.as_str().map_or(true, |s| s.contains('@')),
                        "Email is invalid",
                    ),
            ),
        )
        .with_transactions(Arc::new(LoggedTransactions {
            next_id: AtomicI64::new(1),
        }));

    let weaver = Weaver::from_registry(&registry, &capabilities, &config)?;
    tracing::info!(declarations = registry.len(), "policies registered");
    for name in ["get_by_id", "get_all", "create"] {
        let kinds: Vec<String> = weaver
            .resolve_policies(COMPONENT, name)
            .iter()
            .map(|d| format!("{}@{}", d.kind(), d.priority))
            .collect();
        tracing::info!(operation = name, policies = ?kinds, "chain");
    }

    let service = UserService {
        weaver,
        users: Arc::new(DashMap::new()),
        next_id: Arc::new(AtomicI64::new(1)),
    };

    report("create(ada)", &service.create(user_dto("Ada", "ada@example.com")).await);
    report("create(invalid)", &service.create(user_dto("", "nope")).await);
    report("create(null)", &service.create(Value::Null).await);

    for _ in 0..args.repeat {
        report("get_by_id(1)", &service.get_by_id(1).await);
        report("get_all()", &service.get_all().await);
    }
    report("get_by_id(0)", &service.get_by_id(0).await);
    report("get_by_id(42)", &service.get_by_id(42).await);

    report("create(grace)", &service.create(user_dto("Grace", "grace@example.com")).await);
    report("get_all()", &service.get_all().await);

    Ok(())
}
