use indexmap::IndexMap;
use mova_core::{
    ActionKind, ActionNode, Context, DelayPayload, EngineError, HttpPayload, InvokePayload,
    LogPayload, Plan, Result, SetPayload, SwitchPayload, TryPayload,
};
use serde_json::{json, Map, Value};
use tokio::task::JoinSet;

use crate::condition;
use crate::handlers::{self, HandlerOutcome};
use crate::interpolate::{interpolate, resolve_path, stringify};
use crate::loader::PlanLoader;
use crate::validate::validate_parameters;

/// Threaded through every recursive action-list call and checked after each
/// step: `flow:return` unwinds the whole invocation as an ordinary value,
/// not a sentinel error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Return(Value),
}

impl From<Flow> for HandlerOutcome {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Continue => HandlerOutcome::Success,
            Flow::Return(value) => HandlerOutcome::Return(value),
        }
    }
}

const MAX_INVOKE_DEPTH: usize = 32;
const DEFAULT_LOOP_VARIABLE: &str = "item";
const DEFAULT_INVOKE_RESULT: &str = "invoke_result";

/// Executes plan documents against an owned context. One engine holds one
/// reqwest client, reused across `http:request` actions; clones share it.
#[derive(Debug, Clone)]
pub struct Engine {
    loader: PlanLoader,
    http: reqwest::Client,
    dry_run: bool,
}

impl Engine {
    pub fn new(loader: PlanLoader) -> Self {
        Self {
            loader,
            http: reqwest::Client::new(),
            dry_run: false,
        }
    }

    /// In dry-run mode `http:request` does not touch the network and
    /// `flow:delay` does not sleep.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs a root plan: validates `params` against the plan's declared
    /// schema, seeds a fresh context, and walks the root action list. The
    /// result is an explicit `flow:return` value if one was produced
    /// anywhere, otherwise the final context as a JSON object.
    pub async fn execute(&self, plan: &Plan, params: Map<String, Value>) -> Result<Value> {
        self.run_invocation(plan, params, 0).await
    }

    async fn run_invocation(
        &self,
        plan: &Plan,
        params: Map<String, Value>,
        depth: usize,
    ) -> Result<Value> {
        if let Some(schema) = &plan.parameters {
            validate_parameters(schema, &Value::Object(params.clone()))?;
        }

        let mut ctx = Context::from_map(params);
        match self.run_actions(&plan.actions, &mut ctx, depth).await? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(ctx.into_value()),
        }
    }

    #[async_recursion::async_recursion]
    async fn run_actions(
        &self,
        actions: &[ActionNode],
        ctx: &mut Context,
        depth: usize,
    ) -> Result<Flow> {
        for action in actions {
            if let Flow::Return(value) = self.run_node(action, ctx, depth).await? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    async fn run_node(&self, node: &ActionNode, ctx: &mut Context, depth: usize) -> Result<Flow> {
        let Some(for_each) = &node.for_each else {
            if let Some(guard) = &node.condition {
                if !condition::evaluate(guard, ctx) {
                    return Ok(Flow::Continue);
                }
            }
            return self.dispatch(node, ctx, depth).await;
        };

        // `for_each` is a context path; the braced placeholder form is
        // accepted too.
        let path = for_each.trim();
        let path = path
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            .unwrap_or(path);

        let items = match resolve_path(path, ctx) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                tracing::warn!(path, invoke = %node.invoke, "for_each target is not an array, skipping");
                return Ok(Flow::Continue);
            }
            None => {
                tracing::warn!(path, invoke = %node.invoke, "for_each path not found, skipping");
                return Ok(Flow::Continue);
            }
        };

        let variable = node.loop_variable.as_deref().unwrap_or(DEFAULT_LOOP_VARIABLE);
        for item in items {
            ctx.set_path(variable, item);
            if let Some(guard) = &node.condition {
                if !condition::evaluate(guard, ctx) {
                    ctx.remove_path(variable);
                    continue;
                }
            }
            let result = self.dispatch(node, ctx, depth).await;
            ctx.remove_path(variable);
            if let Flow::Return(value) = result? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    async fn dispatch(&self, node: &ActionNode, ctx: &mut Context, depth: usize) -> Result<Flow> {
        let kind = ActionKind::parse(&node.invoke);
        tracing::debug!(invoke = kind.as_str(), "dispatching action");

        let outcome = match &kind {
            ActionKind::Unknown(name) => {
                tracing::warn!(invoke = %name, "no handler for invoke key, skipping action");
                return Ok(Flow::Continue);
            }
            ActionKind::ContextSet => {
                let payload: SetPayload = self.leaf_payload(node, ctx)?;
                handlers::context::set(payload, ctx)
            }
            ActionKind::ConsoleLog => {
                let payload: LogPayload = self.leaf_payload(node, ctx)?;
                handlers::console::log(payload).await
            }
            ActionKind::HttpRequest => {
                let payload: HttpPayload = self.leaf_payload(node, ctx)?;
                handlers::http::request(&self.http, payload, self.dry_run, ctx).await?
            }
            ActionKind::FlowDelay => {
                let payload: DelayPayload = self.leaf_payload(node, ctx)?;
                if self.dry_run {
                    tracing::info!(ms = payload.ms, "dry-run: skipping delay");
                } else {
                    tokio::time::sleep(std::time::Duration::from_millis(payload.ms)).await;
                }
                HandlerOutcome::Success
            }
            ActionKind::FlowReturn => HandlerOutcome::Return(interpolate(&node.payload, ctx)),
            ActionKind::FlowSwitch => {
                let payload: SwitchPayload = raw_payload(node)?;
                self.run_switch(payload, ctx, depth).await?
            }
            ActionKind::FlowParallel => {
                let branches: IndexMap<String, Vec<ActionNode>> = raw_payload(node)?;
                self.run_parallel(branches, ctx, depth).await?
            }
            ActionKind::FlowTry => {
                let payload: TryPayload = raw_payload(node)?;
                self.run_try(payload, ctx, depth).await?
            }
            ActionKind::FlowInvoke => {
                let payload: InvokePayload = raw_payload(node)?;
                self.run_invoke(payload, ctx, depth).await?
            }
        };

        match outcome {
            HandlerOutcome::Return(value) => Ok(Flow::Return(value)),
            HandlerOutcome::Success => match &node.on_success {
                Some(list) => self.run_actions(list, ctx, depth).await,
                None => Ok(Flow::Continue),
            },
            HandlerOutcome::Failure => match &node.on_error {
                Some(list) => self.run_actions(list, ctx, depth).await,
                None => Ok(Flow::Continue),
            },
        }
    }

    /// Leaf payloads are interpolated wholesale before typed
    /// deserialization. Control-flow payloads go through `raw_payload`
    /// instead: their nested action lists interpolate per-action when they
    /// actually execute, under whatever bindings are live at that point.
    fn leaf_payload<T: serde::de::DeserializeOwned>(
        &self,
        node: &ActionNode,
        ctx: &Context,
    ) -> Result<T> {
        let interpolated = interpolate(&node.payload, ctx);
        serde_json::from_value(interpolated).map_err(|e| EngineError::Payload {
            kind: node.invoke.clone(),
            message: e.to_string(),
        })
    }

    async fn run_switch(
        &self,
        payload: SwitchPayload,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<HandlerOutcome> {
        let selector = interpolate(&payload.value, ctx);
        let key = stringify(&selector);

        let flow = if let Some(actions) = payload.cases.get(&key) {
            self.run_actions(actions, ctx, depth).await?
        } else if let Some(actions) = &payload.default {
            self.run_actions(actions, ctx, depth).await?
        } else {
            tracing::debug!(%key, "no switch case matched and no default");
            Flow::Continue
        };
        Ok(flow.into())
    }

    async fn run_parallel(
        &self,
        branches: IndexMap<String, Vec<ActionNode>>,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<HandlerOutcome> {
        if branches.is_empty() {
            return Ok(HandlerOutcome::Success);
        }

        let base = ctx.snapshot();
        let total = branches.len();
        let mut join_set = JoinSet::new();

        for (idx, (name, actions)) in branches.into_iter().enumerate() {
            let engine = self.clone();
            let mut branch_ctx = ctx.clone();
            join_set.spawn(async move {
                let flow = engine.run_actions(&actions, &mut branch_ctx, depth).await;
                (idx, name, branch_ctx, flow)
            });
        }

        let mut outcomes: Vec<Option<(String, Context, Result<Flow>)>> = Vec::new();
        outcomes.resize_with(total, || None);

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, name, branch_ctx, flow)) => {
                    outcomes[idx] = Some((name, branch_ctx, flow));
                }
                Err(join_error) => {
                    return Err(EngineError::Handler {
                        kind: "flow:parallel".to_string(),
                        message: format!("branch task panicked: {join_error}"),
                    });
                }
            }
        }

        // Join point. Branch writes are folded back in declaration order so
        // conflicting paths resolve deterministically (later branch wins);
        // a failed branch's writes are discarded. The first error in
        // declaration order wins over the first return.
        let mut first_error: Option<EngineError> = None;
        let mut first_return: Option<Value> = None;

        for (name, branch_ctx, flow) in outcomes.into_iter().flatten() {
            match flow {
                Ok(flow) => {
                    ctx.merge_branch(&base, branch_ctx.into_map());
                    if let (Flow::Return(value), None) = (flow, &first_return) {
                        first_return = Some(value);
                    }
                }
                Err(error) => {
                    tracing::warn!(branch = %name, %error, "parallel branch failed");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }
        Ok(match first_return {
            Some(value) => HandlerOutcome::Return(value),
            None => HandlerOutcome::Success,
        })
    }

    async fn run_try(
        &self,
        payload: TryPayload,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<HandlerOutcome> {
        let tried = self.run_actions(&payload.try_actions, ctx, depth).await;

        let settled: Result<Flow> = match tried {
            Err(error) => match &payload.catch {
                Some(catch) => {
                    let variable = catch.bind_as.as_deref().unwrap_or("error");
                    let shadowed = ctx.get_path(variable).cloned();
                    ctx.set_path(variable, json!({ "message": error.to_string() }));

                    let caught = self.run_actions(&catch.actions, ctx, depth).await;

                    // error binding is scoped to the catch list
                    match shadowed {
                        Some(previous) => ctx.set_path(variable, previous),
                        None => {
                            ctx.remove_path(variable);
                        }
                    }
                    caught
                }
                None => Err(error),
            },
            ok => ok,
        };

        if let Some(finally) = &payload.finally {
            if let Flow::Return(value) = self.run_actions(&finally.actions, ctx, depth).await? {
                return Ok(HandlerOutcome::Return(value));
            }
        }

        Ok(settled?.into())
    }

    async fn run_invoke(
        &self,
        payload: InvokePayload,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<HandlerOutcome> {
        if depth >= MAX_INVOKE_DEPTH {
            return Err(EngineError::Handler {
                kind: "flow:invoke".to_string(),
                message: format!("sub-plan recursion exceeds {MAX_INVOKE_DEPTH} levels"),
            });
        }

        let Some(path) = self.loader.resolve(&payload.plan_ref).await? else {
            tracing::warn!(plan_ref = %payload.plan_ref, "sub-plan reference not found in manifest");
            return Ok(HandlerOutcome::Failure);
        };

        let parameters = match interpolate(&payload.parameters, ctx) {
            Value::Object(map) => map,
            _ => {
                return Err(EngineError::Payload {
                    kind: "flow:invoke".to_string(),
                    message: "parameters must be an object".to_string(),
                })
            }
        };

        let plan = self.loader.load_plan(&path).await?;
        let result = self.run_invocation(&plan, parameters, depth + 1).await?;

        let target = payload.result_in.as_deref().unwrap_or(DEFAULT_INVOKE_RESULT);
        ctx.set_path(target, result);
        Ok(HandlerOutcome::Success)
    }
}

fn raw_payload<T: serde::de::DeserializeOwned>(node: &ActionNode) -> Result<T> {
    serde_json::from_value(node.payload.clone()).map_err(|e| EngineError::Payload {
        kind: node.invoke.clone(),
        message: e.to_string(),
    })
}
