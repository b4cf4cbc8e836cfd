/*!
 * Tests for the image describers
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use voxvision::errors::{DescribeError, ProviderError};
use voxvision::providers::openai::OpenAI;
use voxvision::vision::job::PollPolicy;
use voxvision::vision::{
    DescribeOutcome, DescriberChain, ImageDescriber, ImageNormalizer, JobDescriber, Sleeper, TesseractDescriber,
    VisionChatDescriber,
};

use crate::common::http_stub::{HttpStub, RecordedRequest, StubResponse};
use crate::common::mock_providers::MockDescriber;
use crate::common::sample_png;

/// Sleeper that records requested delays instead of waiting
#[derive(Debug, Default)]
struct RecordingSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn count(&self) -> usize {
        self.naps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps.lock().unwrap().push(duration);
    }
}

fn policy(attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(2000),
        attempts,
    }
}

/// Job service that reports `pending` until the `ready_after`-th status check
fn job_service(
    ready_after: Option<usize>,
    polls: Arc<AtomicUsize>,
) -> impl Fn(&RecordedRequest) -> StubResponse + Send + Sync + 'static {
    move |request: &RecordedRequest| match (request.method.as_str(), request.route()) {
        ("POST", "/uploads") => StubResponse::json(200, json!({ "upload_url": "blobs/asset-1", "asset_id": "asset-1" })),
        ("PUT", "/blobs/asset-1") => StubResponse::bytes(200, "text/plain", Vec::new()),
        ("POST", "/jobs") => StubResponse::json(202, json!({ "job_id": "job-7" })),
        ("GET", "/jobs/job-7") => {
            let seen = polls.fetch_add(1, Ordering::SeqCst) + 1;
            match ready_after {
                Some(n) if seen >= n => {
                    StubResponse::json(200, json!({ "status": "completed", "description": "A red square" }))
                }
                _ => StubResponse::json(200, json!({ "status": "pending" })),
            }
        }
        _ => StubResponse::json(404, json!({ "error": "unknown route" })),
    }
}

fn job_describer(stub: &HttpStub, attempts: u32, sleeper: Arc<RecordingSleeper>) -> JobDescriber {
    JobDescriber::new(
        stub.url(),
        "job-key",
        "Describe this image",
        Duration::from_secs(5),
        policy(attempts),
        ImageNormalizer::default(),
    )
    .with_sleeper(sleeper)
}

#[tokio::test]
async fn test_jobDescriber_shouldUploadSubmitAndStopAtFirstDescription() {
    let polls = Arc::new(AtomicUsize::new(0));
    let stub = HttpStub::start(job_service(Some(3), Arc::clone(&polls))).await;
    let sleeper = Arc::new(RecordingSleeper::default());
    let describer = job_describer(&stub, 10, Arc::clone(&sleeper));

    let outcome = describer.describe(&sample_png(8, 8)).await.unwrap();

    assert_eq!(outcome, DescribeOutcome::Described("A red square".to_string()));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.count(), 2);

    let requests = stub.requests();
    let routes: Vec<(String, String)> = requests
        .iter()
        .map(|r| (r.method.clone(), r.route().to_string()))
        .collect();
    assert_eq!(routes[0], ("POST".to_string(), "/uploads".to_string()));
    assert_eq!(routes[1], ("PUT".to_string(), "/blobs/asset-1".to_string()));
    assert_eq!(routes[2], ("POST".to_string(), "/jobs".to_string()));

    assert_eq!(requests[0].json()["content_type"], "image/jpeg");
    assert_eq!(requests[0].header("authorization"), Some("Bearer job-key"));
    assert_eq!(requests[1].header("content-type"), Some("image/jpeg"));
    assert_eq!(&requests[1].body[..2], &[0xFF, 0xD8]);
    assert_eq!(requests[2].json()["asset_id"], "asset-1");
    assert_eq!(requests[2].json()["prompt"], "Describe this image");
}

#[tokio::test]
async fn test_jobDescriber_whenNeverReady_shouldExhaustBudgetExactly() {
    let polls = Arc::new(AtomicUsize::new(0));
    let stub = HttpStub::start(job_service(None, Arc::clone(&polls))).await;
    let sleeper = Arc::new(RecordingSleeper::default());
    let describer = job_describer(&stub, 4, Arc::clone(&sleeper));

    let result = describer.describe(&sample_png(4, 4)).await;

    assert!(matches!(result, Err(DescribeError::PollBudgetExhausted { attempts: 4 })));
    assert_eq!(polls.load(Ordering::SeqCst), 4);
    assert_eq!(sleeper.count(), 3);
    assert!(sleeper.naps.lock().unwrap().iter().all(|d| *d == Duration::from_millis(2000)));
}

#[tokio::test]
async fn test_jobDescriber_withFailedJob_shouldStopPolling() {
    let stub = HttpStub::start(|request| match request.method.as_str() {
        "GET" => StubResponse::json(200, json!({ "status": "failed", "error": "model crashed" })),
        _ => StubResponse::json(404, json!({})),
    })
    .await;
    let sleeper = Arc::new(RecordingSleeper::default());
    let describer = job_describer(&stub, 10, Arc::clone(&sleeper));

    match describer.poll("job-9").await {
        Err(DescribeError::JobFailed(reason)) => assert_eq!(reason, "model crashed"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(stub.requests().len(), 1);
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn test_jobDescriber_withRejectedUpload_shouldNotSubmit() {
    let stub = HttpStub::start(|_| StubResponse::json(403, json!({ "error": "no" }))).await;
    let describer = job_describer(&stub, 3, Arc::new(RecordingSleeper::default()));

    let result = describer.describe(&sample_png(4, 4)).await;

    assert!(matches!(
        result,
        Err(DescribeError::Provider(ProviderError::AuthenticationError(_)))
    ));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_visionChatDescriber_shouldSendInlineJpeg() {
    let stub = HttpStub::start(|_| {
        StubResponse::json(
            200,
            json!({ "choices": [{ "message": { "role": "assistant", "content": "  A bar chart.  " } }] }),
        )
    })
    .await;
    let client = OpenAI::new("gsk", stub.url(), Duration::from_secs(5));
    let describer = VisionChatDescriber::new(client, "vision-model", "What is shown?", 300, ImageNormalizer::default());

    let outcome = describer.describe(&sample_png(16, 16)).await.unwrap();

    assert_eq!(outcome.description(), Some("A bar chart."));
    let body = stub.requests()[0].json();
    assert_eq!(body["model"], "vision-model");
    assert_eq!(body["max_tokens"], 300);
    let parts = &body["messages"][0]["content"];
    assert_eq!(parts[0]["text"], "What is shown?");
    assert!(parts[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_visionChatDescriber_withBlankAnswer_shouldReportNothingRecognized() {
    let stub = HttpStub::start(|_| {
        StubResponse::json(200, json!({ "choices": [{ "message": { "role": "assistant", "content": "" } }] }))
    })
    .await;
    let client = OpenAI::new("gsk", stub.url(), Duration::from_secs(5));
    let describer = VisionChatDescriber::new(client, "m", "p", 50, ImageNormalizer::default());

    assert_eq!(
        describer.describe(&sample_png(4, 4)).await.unwrap(),
        DescribeOutcome::NothingRecognized
    );
}

#[tokio::test]
async fn test_visionChatDescriber_withUndecodableImage_shouldNotCallService() {
    let stub = HttpStub::start(|_| StubResponse::json(500, json!({}))).await;
    let client = OpenAI::new("gsk", stub.url(), Duration::from_secs(5));
    let describer = VisionChatDescriber::new(client, "m", "p", 50, ImageNormalizer::default());

    let result = describer.describe(b"definitely not an image").await;

    assert!(matches!(result, Err(DescribeError::Image(_))));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_chain_withFailingRemote_shouldFallBackToNextStrategy() {
    let stub = HttpStub::start(|_| StubResponse::json(503, json!({ "error": "busy" }))).await;
    let client = OpenAI::new("gsk", stub.url(), Duration::from_secs(5));
    let remote = Arc::new(VisionChatDescriber::new(client, "m", "p", 50, ImageNormalizer::default()));
    let fallback = MockDescriber::new();
    let chain = DescriberChain::new().with(remote).with(fallback.clone());

    let outcome = chain.describe(b"chart").await;

    // The remote fails on decoding before any request; the mock still answers.
    assert_eq!(outcome.unwrap(), DescribeOutcome::Described("description of chart".to_string()));
    assert_eq!(chain.names(), vec!["vision", "mock"]);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chain_withFailingRemoteService_shouldFallBack() {
    let stub = HttpStub::start(|_| StubResponse::json(503, json!({ "error": "busy" }))).await;
    let client = OpenAI::new("gsk", stub.url(), Duration::from_secs(5));
    let remote = Arc::new(VisionChatDescriber::new(client, "m", "p", 50, ImageNormalizer::default()));
    let fallback = MockDescriber::new();
    let chain = DescriberChain::new().with(remote).with(fallback.clone());

    let outcome = chain.describe(&sample_png(4, 4)).await.unwrap();

    assert!(outcome.description().is_some());
    assert_eq!(stub.requests().len(), 1);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_emptyChain_shouldReportNoStrategy() {
    let chain = DescriberChain::new();
    assert!(chain.is_empty());
    assert!(matches!(chain.describe(b"x").await, Err(DescribeError::NoStrategy)));
}

#[tokio::test]
async fn test_tesseract_withMissingBinary_shouldReturnOcrError() {
    let describer = TesseractDescriber::new(
        "voxvision-no-such-tesseract-binary",
        "spa+eng",
        Duration::from_secs(5),
    );

    assert_eq!(describer.languages(), "spa+eng");
    assert!(matches!(describer.describe(&sample_png(4, 4)).await, Err(DescribeError::Ocr(_))));
}

#[test]
fn test_normalizer_shouldBoundLongestSide() {
    let normalized = ImageNormalizer::new(64, 80).normalize(&sample_png(100, 300)).unwrap();

    assert_eq!(normalized.height, 64);
    assert!(normalized.width <= 22 && normalized.width >= 20);
    assert_eq!(normalized.mime_type(), "image/jpeg");
}
