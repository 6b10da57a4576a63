//! # Closure-backed action (`ActionFn`)
//!
//! [`ActionFn`] wraps `F: Fn(ActionContext, Value) -> Fut` and produces a
//! fresh future per invocation. Validation, formatting and code generation
//! are optional and attached with builder methods.
//!
//! ## Example
//! ```rust
//! use taskpilot::{ActionContext, ActionFn, ActionOutcome, ActionRef, ParamKind, ParamSchema};
//!
//! let go: ActionRef = ActionFn::new("go_to_url", |_ctx: ActionContext, params: serde_json::Value| async move {
//!     ActionOutcome::ok(format!("navigated to {}", params["url"]))
//! })
//! .describe("Navigate to a URL")
//! .with_schema(ParamSchema::object().required("url", ParamKind::String))
//! .with_formatter(|p| format!("go to {}", p["url"]))
//! .into_ref();
//!
//! assert_eq!(go.kind(), "go_to_url");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::actions::{Action, ActionContext, ActionOutcome, ActionRef, ParamSchema};
use crate::error::ActionError;

type Render = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Function-backed action.
pub struct ActionFn<F> {
    kind: Cow<'static, str>,
    description: Cow<'static, str>,
    schema: ParamSchema,
    formatter: Option<Render>,
    codegen: Option<Render>,
    f: F,
}

impl<F> ActionFn<F> {
    pub fn new(kind: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            kind: kind.into(),
            description: Cow::Borrowed(""),
            schema: ParamSchema::object(),
            formatter: None,
            codegen: None,
            f,
        }
    }

    pub fn describe(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_schema(mut self, schema: ParamSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_formatter(mut self, f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.formatter = Some(Arc::new(f));
        self
    }

    pub fn with_codegen(mut self, f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.codegen = Some(Arc::new(f));
        self
    }

    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }
}

impl<F, Fut> ActionFn<F>
where
    F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionOutcome> + Send + 'static,
{
    /// Wraps the action into a shared [`ActionRef`].
    pub fn into_ref(self) -> ActionRef {
        Arc::new(self)
    }
}

#[async_trait]
impl<F, Fut> Action for ActionFn<F>
where
    F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionOutcome> + Send + 'static,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(&self, params: &Value) -> Result<(), ActionError> {
        self.schema.validate(params)
    }

    async fn run(&self, ctx: ActionContext, params: Value) -> ActionOutcome {
        if let Err(e) = self.schema.validate(&params) {
            return ActionOutcome::fail(format!("invalid parameters for {}: {e}", self.kind));
        }
        (self.f)(ctx, params).await
    }

    fn format(&self, params: &Value) -> Option<String> {
        self.formatter.as_ref().map(|f| f(params))
    }

    fn generate_code(&self, params: &Value) -> Option<String> {
        self.codegen.as_ref().map(|f| f(params))
    }
}
