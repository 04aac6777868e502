//! Relay 处理器集成测试
//!
//! 用脚本化的 Provider、内存中的线程历史和记录调用的 sink 驱动完整流程。

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use threadcast_lib::config::{ProviderConfig, RelayConfig, SlackConfig};
use threadcast_lib::models::openai::{ChatCompletionRequest, Role};
use threadcast_lib::providers::ProviderError;
use threadcast_lib::slack::{SlackError, SlackEventData, ThreadHistory, ThreadMessage};
use threadcast_lib::streaming::{
    MessageRef, MessageSink, SinkError, StreamError, StreamResponse, StreamingProvider,
};
use threadcast_lib::{RelayError, RelayHandler, RelayOutcome};

// ============================================================================
// 测试替身
// ============================================================================

/// 一段延迟后到达的响应片段
type Step = (Duration, Result<&'static str, &'static str>);

struct ScriptedProvider {
    steps: Mutex<Option<Vec<Step>>>,
    failure: Option<ProviderError>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedProvider {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(Some(steps)),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn immediate(parts: &[&'static str]) -> Self {
        Self::new(parts.iter().map(|p| (Duration::ZERO, Ok(*p))).collect())
    }

    fn failing(err: ProviderError) -> Self {
        Self {
            steps: Mutex::new(None),
            failure: Some(err),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamingProvider for ScriptedProvider {
    async fn call_api_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<StreamResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let steps: VecDeque<Step> = self
            .steps
            .lock()
            .unwrap()
            .take()
            .unwrap_or_default()
            .into();
        let stream = stream::unfold(steps, |mut steps| async move {
            let (delay, item) = steps.pop_front()?;
            tokio::time::sleep(delay).await;
            let item = item
                .map(|text| Bytes::from_static(text.as_bytes()))
                .map_err(StreamError::read);
            Some((item, steps))
        });
        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "ScriptedProvider"
    }
}

#[derive(Default)]
struct StaticHistory {
    messages: Vec<ThreadMessage>,
    fail: bool,
    lookups: Mutex<Vec<(String, String)>>,
}

impl StaticHistory {
    fn with_messages(messages: Vec<ThreadMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadHistory for StaticHistory {
    async fn replies(&self, channel: &str, ts: &str) -> Result<Vec<ThreadMessage>, SlackError> {
        self.lookups
            .lock()
            .unwrap()
            .push((channel.to_string(), ts.to_string()));
        if self.fail {
            return Err(SlackError::Api("channel_not_found".to_string()));
        }
        Ok(self.messages.clone())
    }
}

#[derive(Default)]
struct MemorySink {
    posts: Mutex<Vec<(String, String, String)>>,
    updates: Mutex<Vec<(String, Option<String>)>>,
}

impl MemorySink {
    fn posts(&self) -> Vec<(String, String, String)> {
        self.posts.lock().unwrap().clone()
    }

    fn updates(&self) -> Vec<(String, Option<String>)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn post(
        &self,
        channel: &str,
        placeholder: &str,
        thread_ts: &str,
    ) -> Result<MessageRef, SinkError> {
        self.posts.lock().unwrap().push((
            channel.to_string(),
            placeholder.to_string(),
            thread_ts.to_string(),
        ));
        Ok(MessageRef::new(channel, "1700000000.000900"))
    }

    async fn update(
        &self,
        _message: &MessageRef,
        text: &str,
        mention: Option<&str>,
    ) -> Result<(), SinkError> {
        self.updates
            .lock()
            .unwrap()
            .push((text.to_string(), mention.map(str::to_string)));
        Ok(())
    }
}

// ============================================================================
// 辅助函数
// ============================================================================

fn config() -> RelayConfig {
    RelayConfig {
        provider: ProviderConfig {
            api_key: Some("sk-test".to_string()),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
        },
        slack: SlackConfig {
            access_token: Some("xoxb-test".to_string()),
            bot_user_id: "UBOT".to_string(),
            ..SlackConfig::default()
        },
        ..RelayConfig::default()
    }
}

fn event(event_type: &str, message: &str, thread_ts: &str) -> SlackEventData {
    SlackEventData {
        event_type: event_type.to_string(),
        time_stamp: "1700000000.000100".to_string(),
        thread_time_stamp: thread_ts.to_string(),
        channel: "C1".to_string(),
        user: "U1".to_string(),
        message: message.to_string(),
    }
}

fn thread_message(user: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        user: user.to_string(),
        text: text.to_string(),
        ts: String::new(),
    }
}

fn delta(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": text } }] })
    )
}

fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

struct Fixture {
    provider: Arc<ScriptedProvider>,
    sink: Arc<MemorySink>,
    history: Arc<StaticHistory>,
    handler: RelayHandler,
}

fn fixture(provider: ScriptedProvider, history: StaticHistory) -> Fixture {
    let provider = Arc::new(provider);
    let sink = Arc::new(MemorySink::default());
    let history = Arc::new(history);
    let handler = RelayHandler::new(config(), provider.clone(), sink.clone(), history.clone());
    Fixture {
        provider,
        sink,
        history,
        handler,
    }
}

// ============================================================================
// 测试
// ============================================================================

#[tokio::test]
async fn message_without_bot_mention_is_ignored() {
    let f = fixture(ScriptedProvider::immediate(&[]), StaticHistory::default());

    let outcome = f.handler.handle(&event("message", "hello all", "")).await.unwrap();

    assert!(matches!(outcome, RelayOutcome::Ignored));
    assert!(f.history.lookups().is_empty());
    assert!(f.provider.requests().is_empty());
    assert!(f.sink.posts().is_empty());
}

#[tokio::test]
async fn app_mention_streams_answer_into_placeholder() {
    let history = StaticHistory::with_messages(vec![
        thread_message("U1", "<@UBOT> say hello"),
        thread_message("U2", "unrelated"),
    ]);
    let f = fixture(
        ScriptedProvider::immediate(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]),
        history,
    );

    let outcome = f
        .handler
        .handle(&event("app_mention", "<@UBOT> say hello", ""))
        .await
        .unwrap();

    let RelayOutcome::Completed(summary) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(summary.answer, "Hello");
    assert_eq!(summary.message, MessageRef::new("C1", "1700000000.000900"));
    assert!(!summary.invocation_id.is_empty());
    assert_eq!(summary.metrics.answer_len, 5);

    assert_eq!(
        f.history.lookups(),
        vec![("C1".to_string(), "1700000000.000100".to_string())]
    );

    let requests = f.provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].stream);
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::User);
    assert_eq!(requests[0].messages[0].content, " say hello");

    assert_eq!(
        f.sink.posts(),
        vec![(
            "C1".to_string(),
            "...".to_string(),
            "1700000000.000100".to_string()
        )]
    );
    assert_eq!(
        f.sink.updates(),
        vec![("Hello".to_string(), Some("U1".to_string()))]
    );
}

#[tokio::test]
async fn thread_reply_reads_history_from_thread_root() {
    let history = StaticHistory::with_messages(vec![
        thread_message("U1", "<@UBOT> first"),
        thread_message("UBOT", "answer"),
        thread_message("U1", "<@UBOT> second"),
    ]);
    let f = fixture(
        ScriptedProvider::immediate(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\ndata: [DONE]\n",
        ]),
        history,
    );

    f.handler
        .handle(&event("message", "<@UBOT> second", "1699999999.000001"))
        .await
        .unwrap();

    assert_eq!(
        f.history.lookups(),
        vec![("C1".to_string(), "1699999999.000001".to_string())]
    );
    let roles: Vec<Role> = f.provider.requests()[0]
        .messages
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(f.sink.posts()[0].2, "1700000000.000100");
}

#[tokio::test]
async fn provider_failure_aborts_before_placeholder() {
    let f = fixture(
        ScriptedProvider::failing(ProviderError::RateLimited {
            body: "slow down".to_string(),
        }),
        StaticHistory::default(),
    );

    let err = f
        .handler
        .handle(&event("app_mention", "<@UBOT> hi", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Provider(ProviderError::RateLimited { .. })));
    assert_eq!(err.http_status(), Some(429));
    assert!(f.sink.posts().is_empty());
}

#[tokio::test]
async fn history_failure_aborts_before_provider_call() {
    let history = StaticHistory {
        fail: true,
        ..StaticHistory::default()
    };
    let f = fixture(ScriptedProvider::immediate(&[]), history);

    let err = f
        .handler
        .handle(&event("app_mention", "<@UBOT> hi", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::History(SlackError::Api(_))));
    assert_eq!(err.error_type(), "history");
    assert_eq!(err.http_status(), None);
    assert!(f.provider.requests().is_empty());
}

#[tokio::test]
async fn stream_ending_without_done_is_not_finalized() {
    let f = fixture(
        ScriptedProvider::immediate(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n",
        ]),
        StaticHistory::default(),
    );

    let err = f
        .handler
        .handle(&event("app_mention", "<@UBOT> hi", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Stream(StreamError::Truncated)));
    assert_eq!(f.sink.posts().len(), 1);
    assert!(f.sink.updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn long_stream_publishes_progress_then_final_mention() {
    let mut steps: Vec<Step> = ["a", "b", "c", "d", "e", "f", "g"]
        .iter()
        .map(|part| (Duration::from_secs(1), Ok(leak(delta(part)))))
        .collect();
    steps.push((Duration::from_millis(500), Ok("data: [DONE]\n\n")));
    let f = fixture(ScriptedProvider::new(steps), StaticHistory::default());

    f.handler
        .handle(&event("app_mention", "<@UBOT> hi", ""))
        .await
        .unwrap();

    let updates = f.sink.updates();
    assert_eq!(
        updates,
        vec![
            ("abc".to_string(), None),
            ("abcdef".to_string(), None),
            ("abcdefg".to_string(), Some("U1".to_string())),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn read_error_keeps_last_progress_update() {
    let steps: Vec<Step> = vec![
        (Duration::from_secs(1), Ok(leak(delta("a")))),
        (Duration::from_secs(1), Ok(leak(delta("b")))),
        (Duration::from_secs(1), Ok(leak(delta("c")))),
        (Duration::from_secs(1), Err("connection reset")),
    ];
    let f = fixture(ScriptedProvider::new(steps), StaticHistory::default());

    let err = f
        .handler
        .handle(&event("app_mention", "<@UBOT> hi", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Stream(StreamError::Read(_))));
    assert_eq!(f.sink.updates(), vec![("abc".to_string(), None)]);
}
