//! Onion pipeline
//!
//! Handlers are composed right to left: each receives the input, the
//! pipeline context and a `next` continuation. A handler may transform the
//! input before calling `next`, transform the value `next` returns,
//! or return without calling `next` at all. The innermost continuation is
//! the terminal (identity unless one is supplied).

use std::sync::Arc;

use uuid::Uuid;

use crate::error::EngineResult;

/// Continuation passed to a handler
pub type Next<'a, T> = &'a dyn Fn(T) -> EngineResult<T>;

/// A pipeline stage
pub type Handler<T> =
    Arc<dyn Fn(T, &PipelineContext, Next<'_, T>) -> EngineResult<T> + Send + Sync>;

/// Wraps a closure as a [`Handler`]
pub fn handler<T, F>(f: F) -> Handler<T>
where
    F: Fn(T, &PipelineContext, Next<'_, T>) -> EngineResult<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Extra arguments every handler sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub request_id: Uuid,
    pub namespace: String,
    pub type_name: String,
    /// Operation name for execution stages (`create`, `promote`, ...)
    pub operation: Option<String>,
}

impl PipelineContext {
    pub fn new(request_id: Uuid, namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            request_id,
            namespace: namespace.into(),
            type_name: type_name.into(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// Runs handler chains
pub struct Pipeline;

impl Pipeline {
    /// Runs `handlers` around the identity terminal
    pub fn run<T>(handlers: &[Handler<T>], input: T, ctx: &PipelineContext) -> EngineResult<T> {
        Self::run_with(handlers, input, ctx, &|value| Ok(value))
    }

    /// Runs `handlers` around `terminal`
    pub fn run_with<T>(
        handlers: &[Handler<T>],
        input: T,
        ctx: &PipelineContext,
        terminal: Next<'_, T>,
    ) -> EngineResult<T> {
        match handlers.split_first() {
            Some((first, rest)) => {
                let next = |value: T| Self::run_with(rest, value, ctx, terminal);
                first(input, ctx, &next)
            }
            // End of the chain
            None => terminal(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::Mutex;

    fn ctx() -> PipelineContext {
        PipelineContext::new(Uuid::new_v4(), "default", "Empleado")
    }

    fn tracer(name: &'static str, trace: Arc<Mutex<Vec<String>>>) -> Handler<i64> {
        handler(move |input: i64, _ctx: &PipelineContext, next: Next<'_, i64>| {
            trace.lock().unwrap().push(format!("{}:in", name));
            let out = next(input + 1)?;
            trace.lock().unwrap().push(format!("{}:out", name));
            Ok(out * 10)
        })
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        assert_eq!(Pipeline::run::<i64>(&[], 7, &ctx()).unwrap(), 7);
    }

    #[test]
    fn test_onion_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let handlers = vec![tracer("outer", trace.clone()), tracer("inner", trace.clone())];

        // ((1 + 1) + 1) then * 10 inner, * 10 outer
        assert_eq!(Pipeline::run(&handlers, 1, &ctx()).unwrap(), 300);
        assert_eq!(
            *trace.lock().unwrap(),
            vec!["outer:in", "inner:in", "inner:out", "outer:out"]
        );
    }

    #[test]
    fn test_terminal_runs_innermost() {
        let handlers = vec![handler(|input: i64, _: &PipelineContext, next: Next<'_, i64>| next(input * 2))];
        let out = Pipeline::run_with(&handlers, 5, &ctx(), &|v| Ok(v + 1)).unwrap();
        assert_eq!(out, 11);
    }

    #[test]
    fn test_short_circuit_skips_terminal() {
        let handlers: Vec<Handler<i64>> = vec![handler(|_, _, _| Err(EngineError::authorization("blocked")))];
        let reached = Mutex::new(false);
        let result = Pipeline::run_with(&handlers, 1, &ctx(), &|v| {
            *reached.lock().unwrap() = true;
            Ok(v)
        });
        assert!(result.is_err());
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_handlers_see_context() {
        let handlers = vec![handler(|input: i64, ctx: &PipelineContext, next: Next<'_, i64>| {
            assert_eq!(ctx.operation.as_deref(), Some("create"));
            next(input)
        })];
        Pipeline::run(&handlers, 0, &ctx().with_operation("create")).unwrap();
    }
}
