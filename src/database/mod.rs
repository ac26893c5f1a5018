mod result;

pub use result::{ExecError, ExecResult, ExecStatus};

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::compute::{CommandName, Compute, Query};
use crate::context::Context;
use crate::storage::{Engine, Storage, StorageError};

/// The storage operations the dispatcher relies on.
pub trait QueryStorage: Send + Sync {
    fn set(&self, ctx: &Context, key: Bytes, value: Bytes) -> Result<(), StorageError>;
    fn get(&self, ctx: &Context, key: &[u8]) -> Result<Bytes, StorageError>;
    fn del(&self, ctx: &Context, key: &[u8]) -> Result<(), StorageError>;
}

impl<E: Engine> QueryStorage for Storage<E> {
    fn set(&self, ctx: &Context, key: Bytes, value: Bytes) -> Result<(), StorageError> {
        Storage::set(self, ctx, key, value)
    }

    fn get(&self, ctx: &Context, key: &[u8]) -> Result<Bytes, StorageError> {
        Storage::get(self, ctx, key)
    }

    fn del(&self, ctx: &Context, key: &[u8]) -> Result<(), StorageError> {
        Storage::del(self, ctx, key)
    }
}

/// Binds the parser to the storage: every raw command line goes in through [`Database::exec`]
/// and comes out as exactly one [`ExecResult`].
#[derive(Clone, Debug)]
pub struct Database<S = Storage> {
    compute: Compute,
    storage: S,
    read_only: bool,
}

impl<S: QueryStorage> Database<S> {
    pub fn new(compute: Compute, storage: S) -> Database<S> {
        Database {
            compute,
            storage,
            read_only: false,
        }
    }

    /// In read-only mode SET and DEL queries are answered with [`ExecResult::Unsupported`]
    /// without reaching the storage.
    pub fn read_only(mut self, read_only: bool) -> Database<S> {
        self.read_only = read_only;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Parses and executes one raw command. A done context is reported before anything else
    /// happens, so a cancelled call never parses its input or touches the storage.
    #[instrument(name = "exec", skip_all, fields(query_id))]
    pub fn exec(&self, ctx: &Context, raw: impl Into<Bytes>) -> ExecResult {
        tracing::Span::current().record("query_id", Uuid::new_v4().to_string());

        if let Err(e) = ctx.err() {
            warn!(error = %e, "context error");
            return ExecResult::Err(e.into());
        }

        let raw = raw.into();
        debug!(raw = ?raw, "parsing query");
        let query = match self.compute.parse(&raw) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "failed to parse query");
                return ExecResult::Err(ExecError::Parse(e));
            }
        };

        if self.read_only && query.command() != CommandName::Get {
            warn!(command = %query.command(), "query rejected in read-only mode");
            return ExecResult::Unsupported(ExecError::ReadOnly(query.command()));
        }

        match query {
            Query::Set(q) => {
                debug!(key = ?q.key(), value = ?q.value(), "executing SET query");
                if let Err(e) = self.storage.set(ctx, q.key().clone(), q.value().clone()) {
                    error!(key = ?q.key(), error = %e, "failed to execute SET");
                    return ExecResult::Err(ExecError::Set(e));
                }

                info!(key = ?q.key(), "SET query executed successfully");
                ExecResult::OkNoData
            }
            Query::Get(q) => {
                debug!(key = ?q.key(), "executing GET query");
                match self.storage.get(ctx, q.key()) {
                    Ok(value) => {
                        info!(key = ?q.key(), value = ?value, "GET query executed successfully");
                        ExecResult::Ok(value)
                    }
                    Err(StorageError::NotFound) => {
                        info!(key = ?q.key(), "GET query: key not found");
                        ExecResult::NotFound
                    }
                    Err(e) => {
                        error!(key = ?q.key(), error = %e, "failed to execute GET");
                        ExecResult::Err(ExecError::Get(e))
                    }
                }
            }
            Query::Del(q) => {
                debug!(key = ?q.key(), "executing DEL query");
                if let Err(e) = self.storage.del(ctx, q.key()) {
                    error!(key = ?q.key(), error = %e, "failed to execute DEL");
                    return ExecResult::Err(ExecError::Del(e));
                }

                info!(key = ?q.key(), "DEL query executed successfully");
                ExecResult::OkNoData
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn database() -> Database {
        Database::new(Compute::default(), Storage::new())
    }

    /// Storage backend whose every operation fails, counting how often it was reached.
    #[derive(Default)]
    struct FailingStorage {
        calls: AtomicUsize,
    }

    impl FailingStorage {
        fn fail(&self) -> StorageError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StorageError::Backend("backend unavailable".into())
        }
    }

    impl QueryStorage for FailingStorage {
        fn set(&self, _ctx: &Context, _key: Bytes, _value: Bytes) -> Result<(), StorageError> {
            Err(self.fail())
        }

        fn get(&self, _ctx: &Context, _key: &[u8]) -> Result<Bytes, StorageError> {
            Err(self.fail())
        }

        fn del(&self, _ctx: &Context, _key: &[u8]) -> Result<(), StorageError> {
            Err(self.fail())
        }
    }

    #[test]
    fn set_get_del() {
        let db = database();
        let ctx = Context::background();

        assert!(matches!(db.exec(&ctx, "SET a 1"), ExecResult::OkNoData));

        let res = db.exec(&ctx, "GET a");
        assert_eq!(res.status(), ExecStatus::Ok);
        assert_eq!(res.data(), Some(&Bytes::from("1")));

        assert!(matches!(db.exec(&ctx, "DEL a"), ExecResult::OkNoData));
        assert!(matches!(db.exec(&ctx, "GET a"), ExecResult::NotFound));
    }

    #[test]
    fn overwrite() {
        let db = database();
        let ctx = Context::background();

        db.exec(&ctx, "SET a first");
        db.exec(&ctx, "set a second");

        assert_eq!(db.exec(&ctx, "GET a").data(), Some(&Bytes::from("second")));
    }

    #[test]
    fn del_missing_key() {
        let db = database();

        let res = db.exec(&Context::background(), "DEL missing");

        assert!(matches!(res, ExecResult::OkNoData));
    }

    #[test]
    fn parse_error() {
        let db = database();

        let res = db.exec(&Context::background(), "PING x");

        assert!(matches!(res, ExecResult::Err(ExecError::Parse(_))));
        assert_eq!(
            res.err().unwrap().to_string(),
            r#"parse query: unknown command: "PING""#
        );
    }

    #[test]
    fn cancelled_context_never_mutates() {
        let db = database();
        let ctx = Context::background();
        db.exec(&ctx, "SET a 1");

        let cancelled = Context::background();
        cancelled.cancel();

        let res = db.exec(&cancelled, "SET a 2");
        assert!(matches!(
            res,
            ExecResult::Err(ExecError::Context(ContextError::Cancelled))
        ));

        let res = db.exec(&cancelled, "DEL a");
        assert!(matches!(
            res,
            ExecResult::Err(ExecError::Context(ContextError::Cancelled))
        ));

        assert_eq!(db.exec(&ctx, "GET a").data(), Some(&Bytes::from("1")));
    }

    #[test]
    fn cancelled_context_wins_over_parse_error() {
        let db = database();
        let ctx = Context::background();
        ctx.cancel();

        let res = db.exec(&ctx, "");

        assert!(matches!(
            res,
            ExecResult::Err(ExecError::Context(ContextError::Cancelled))
        ));
    }

    #[test]
    fn cancelled_context_never_reaches_storage() {
        let db = Database::new(Compute::default(), FailingStorage::default());
        let ctx = Context::background();
        ctx.cancel();

        db.exec(&ctx, "SET a 1");
        db.exec(&ctx, "GET a");

        assert_eq!(db.storage().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn storage_errors_name_the_query() {
        let db = Database::new(Compute::default(), FailingStorage::default());
        let ctx = Context::background();

        let res = db.exec(&ctx, "SET a 1");
        assert!(matches!(res, ExecResult::Err(ExecError::Set(_))));
        assert_eq!(
            res.err().unwrap().to_string(),
            "set query: storage: backend unavailable"
        );

        let res = db.exec(&ctx, "GET a");
        assert!(matches!(res, ExecResult::Err(ExecError::Get(_))));
        assert_eq!(
            res.err().unwrap().to_string(),
            "get query: storage: backend unavailable"
        );

        let res = db.exec(&ctx, "DEL a");
        assert!(matches!(res, ExecResult::Err(ExecError::Del(_))));
        assert_eq!(
            res.err().unwrap().to_string(),
            "del query: storage: backend unavailable"
        );

        assert_eq!(db.storage().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn read_only() {
        let db = database().read_only(true);
        let ctx = Context::background();

        let res = db.exec(&ctx, "SET a 1");
        assert!(matches!(
            res,
            ExecResult::Unsupported(ExecError::ReadOnly(CommandName::Set))
        ));

        let res = db.exec(&ctx, "DEL a");
        assert!(matches!(
            res,
            ExecResult::Unsupported(ExecError::ReadOnly(CommandName::Del))
        ));

        assert!(matches!(db.exec(&ctx, "GET a"), ExecResult::NotFound));
        assert!(db.storage().engine().is_empty());
    }

    #[test]
    fn shared_between_threads() {
        let db = database();
        let ctx = Context::background();

        std::thread::scope(|s| {
            for i in 0..100 {
                let (db, ctx) = (&db, &ctx);
                s.spawn(move || {
                    let res = db.exec(ctx, format!("SET key{i} value{i}"));
                    assert!(matches!(res, ExecResult::OkNoData));
                });
            }
        });

        std::thread::scope(|s| {
            for i in 0..100 {
                let (db, ctx) = (&db, &ctx);
                s.spawn(move || {
                    let res = db.exec(ctx, format!("GET key{i}"));
                    assert_eq!(res.data(), Some(&Bytes::from(format!("value{i}"))));
                });
            }
        });
    }
}
