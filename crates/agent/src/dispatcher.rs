use checkin_core::Clock;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::handlers::AgentHandler;
use crate::types::{AgentContext, DispatchResult, HandlerOutput};

/// **Agent Dispatcher**：把同一个输入扇出给所有愿意处理的处理器
///
/// 1. 按注册顺序询问 `can_handle`
/// 2. 并发执行接受的处理器 (join)
/// 3. 按注册顺序拼接输出，补齐缺失的消息 ID 与时间戳
pub struct AgentDispatcher<I> {
    prefix: String,
    handlers: Vec<Arc<dyn AgentHandler<I>>>,
    counter: AtomicU64,
}

impl<I> AgentDispatcher<I>
where
    I: Send + Sync,
{
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            handlers: Vec::new(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn register(&mut self, handler: impl AgentHandler<I> + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub async fn dispatch(&self, input: &I, ctx: &AgentContext) -> DispatchResult {
        let mut logs = Vec::new();
        let mut accepted = Vec::new();

        // 1. 筛选
        for handler in &self.handlers {
            match handler.can_handle(input, ctx) {
                Ok(true) => {
                    logs.push(format!("[orchestrator] dispatch → {}", handler.role()));
                    accepted.push(handler.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("[DISPATCHER] {} failed to decide: {:#}", handler.role(), e);
                    logs.push(format!("[orchestrator] error deciding for {}: {}", handler.role(), e));
                }
            }
        }

        // 2. 并发执行
        let results = join_all(accepted.iter().map(|h| h.handle(input, ctx))).await;

        // 3. 汇总
        let mut outbound = Vec::new();
        for (handler, result) in accepted.iter().zip(results) {
            match result {
                Ok(HandlerOutput { outbound: messages, logs: handler_logs }) => {
                    outbound.extend(messages);
                    logs.extend(handler_logs);
                }
                Err(e) => {
                    tracing::warn!("[DISPATCHER] {} failed: {:#}", handler.role(), e);
                    logs.push(format!("[orchestrator] {} failed: {}", handler.role(), e));
                }
            }
        }

        for message in &mut outbound {
            if message.id.is_none() {
                message.id = Some(self.next_id());
            }
            if message.timestamp.is_none() {
                message.timestamp = Some(Clock::now());
            }
        }

        tracing::debug!(
            "[DISPATCHER] trace {} produced {} messages",
            ctx.trace_id,
            outbound.len()
        );
        DispatchResult { outbound, logs }
    }

    fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
