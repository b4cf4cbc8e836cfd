/*!
 * Controller tests for single file and folder runs
 */

use serde_json::json;
use voxvision::app_config::{DetectionProvider, RemoteStrategy};
use voxvision::app_controller::{
    Controller, FileOutcome, FolderSummary, RunOptions, build_describer_chain, build_pipeline,
};
use voxvision::document::{Document, DocumentCategory};
use voxvision::pipeline::ConversionOutcome;

use crate::common::http_stub::{HttpStub, StubResponse};
use crate::common::mock_providers::{MockDescriber, MockDetector, MockExtractor, MockPipeline, MockSynthesizer};
use crate::common::{create_temp_dir, create_test_file, offline_config};

fn mock_with_detector(detector: std::sync::Arc<MockDetector>) -> MockPipeline {
    MockPipeline::new(MockExtractor::text(), MockDescriber::new(), detector, MockSynthesizer::new())
}

fn controller(mock: &MockPipeline) -> Controller {
    Controller::with_pipeline(offline_config(), mock.pipeline.clone())
}

#[tokio::test]
async fn test_run_textFile_shouldWriteAudioNamedAfterLanguage() {
    let input_dir = create_temp_dir().unwrap();
    let output_dir = create_temp_dir().unwrap();
    let input = create_test_file(input_dir.path(), "carta.txt", "Hola mundo.".as_bytes()).unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));

    let outcome = controller(&mock)
        .run(input, output_dir.path().to_path_buf(), &RunOptions::default())
        .await
        .unwrap();

    let expected = output_dir.path().join("carta.es.mp3");
    assert_eq!(
        outcome,
        FileOutcome::Converted {
            audio_path: expected.clone(),
            language: "es".to_string()
        }
    );
    assert_eq!(std::fs::read(&expected).unwrap(), b"ID3Hola mundo.");
    assert!(!output_dir.path().join("carta.transcript.txt").exists());
}

#[tokio::test]
async fn test_run_withExistingAudio_shouldSkipUnlessForced() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "carta.txt", b"Hola mundo.").unwrap();
    create_test_file(dir.path(), "carta.en.mp3", b"old").unwrap();
    let mock = mock_with_detector(MockDetector::answering("en"));
    let controller = controller(&mock);

    let skipped = controller
        .run(input.clone(), dir.path().to_path_buf(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(skipped, FileOutcome::Skipped);
    assert_eq!(mock.detect_calls(), 0);

    let forced = RunOptions {
        force_overwrite: true,
        ..RunOptions::default()
    };
    let outcome = controller.run(input, dir.path().to_path_buf(), &forced).await.unwrap();
    assert!(matches!(outcome, FileOutcome::Converted { .. }));
    assert_eq!(std::fs::read(dir.path().join("carta.en.mp3")).unwrap(), b"ID3Hola mundo.");
}

#[tokio::test]
async fn test_run_transcriptOnly_shouldWriteTranscriptWithoutSpeech() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "notas.txt", b"Texto de prueba.").unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));
    let options = RunOptions {
        transcript_only: true,
        ..RunOptions::default()
    };

    let outcome = controller(&mock)
        .run(input, dir.path().to_path_buf(), &options)
        .await
        .unwrap();

    let transcript = dir.path().join("notas.transcript.txt");
    assert_eq!(outcome, FileOutcome::Transcribed(transcript.clone()));
    assert_eq!(std::fs::read_to_string(transcript).unwrap(), "Texto de prueba.");
    assert_eq!(mock.detect_calls(), 0);
    assert_eq!(mock.synth_calls(), 0);
}

#[tokio::test]
async fn test_run_withSaveTranscript_shouldWriteBothOutputs() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "notas.txt", b"Ciao a tutti.").unwrap();
    let mock = mock_with_detector(MockDetector::answering("it"));
    let options = RunOptions {
        save_transcript: true,
        ..RunOptions::default()
    };

    controller(&mock)
        .run(input, dir.path().to_path_buf(), &options)
        .await
        .unwrap();

    assert!(dir.path().join("notas.it.mp3").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notas.transcript.txt")).unwrap(),
        "Ciao a tutti."
    );
}

#[tokio::test]
async fn test_run_unsupportedLanguage_shouldHaltWithoutAudio() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "doc.txt", "Привет мир".as_bytes()).unwrap();
    let mock = mock_with_detector(MockDetector::answering("ru"));

    let outcome = controller(&mock)
        .run(input, dir.path().to_path_buf(), &RunOptions::default())
        .await
        .unwrap();

    match outcome {
        FileOutcome::Halted(message) => assert!(message.contains("Russian")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(mock.synth_calls(), 0);
    assert!(!dir.path().join("doc.ru.mp3").exists());
}

#[tokio::test]
async fn test_run_withDetectionFailure_shouldReturnErrorNamingStage() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "doc.txt", b"Hello.").unwrap();
    let mock = mock_with_detector(MockDetector::failing());

    let error = controller(&mock)
        .run(input, dir.path().to_path_buf(), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(format!("{:#}", error).contains("failed"));
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));

    let result = controller(&mock)
        .run(dir.path().join("missing.txt"), dir.path().to_path_buf(), &RunOptions::default())
        .await;

    assert!(result.is_err());
}

#[test]
fn test_loadDocument_shouldDetectCategoryAndName() {
    let dir = create_temp_dir().unwrap();
    let pdf = create_test_file(dir.path(), "scan.bin", b"%PDF-1.4\n").unwrap();
    let unknown = create_test_file(dir.path(), "data.json", b"{}").unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));
    let controller = controller(&mock);

    let document = controller.load_document(&pdf).unwrap();
    assert_eq!(document.category, DocumentCategory::Paginated);
    assert_eq!(document.display_name(), "scan.bin");

    assert!(controller.load_document(&unknown).is_err());
}

#[tokio::test]
async fn test_runFolder_shouldCountEachOutcome() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.txt", b"Hola mundo.").unwrap();
    create_test_file(dir.path(), "b.txt", b"   ").unwrap();
    create_test_file(dir.path(), "c.txt", b"Ya convertido.").unwrap();
    create_test_file(dir.path(), "c.es.mp3", b"old").unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));

    let summary = controller(&mock)
        .run_folder(dir.path().to_path_buf(), None, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(
        summary,
        FolderSummary {
            processed: 1,
            skipped: 1,
            halted: 1,
            errors: 0
        }
    );
    assert!(dir.path().join("a.es.mp3").exists());
    assert!(!dir.path().join("b.es.mp3").exists());
}

#[tokio::test]
async fn test_runFolder_withFailures_shouldContinueAndCountErrors() {
    let input_dir = create_temp_dir().unwrap();
    let output_dir = create_temp_dir().unwrap();
    create_test_file(input_dir.path(), "a.txt", b"One.").unwrap();
    create_test_file(input_dir.path(), "b.txt", b"Two.").unwrap();
    let mock = mock_with_detector(MockDetector::failing());

    let summary = controller(&mock)
        .run_folder(
            input_dir.path().to_path_buf(),
            Some(output_dir.path().to_path_buf()),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(summary.errors, 2);
    assert_eq!(summary.processed, 0);
    assert_eq!(mock.detect_calls(), 2);
}

#[tokio::test]
async fn test_runFolder_withNoDocuments_shouldFail() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "conf.json", b"{}").unwrap();
    let mock = mock_with_detector(MockDetector::answering("es"));

    assert!(controller(&mock)
        .run_folder(dir.path().to_path_buf(), None, &RunOptions::default())
        .await
        .is_err());
}

#[test]
fn test_buildPipeline_withOfflineConfig_shouldUseConfiguredSettings() {
    let mut config = offline_config();
    config.description.concurrency = 4;

    let pipeline = build_pipeline(&config).unwrap();

    assert_eq!(pipeline.settings().describe_concurrency, 4);
    assert_eq!(pipeline.settings().supported_languages, config.speech.supported_languages);
    assert!(Controller::with_config(config).is_ok());
}

#[test]
fn test_buildDescriberChain_shouldPutRemoteStrategyBeforeOcr() {
    let mut config = offline_config();
    assert!(build_describer_chain(&config).unwrap().is_empty());

    config.description.ocr.enabled = true;
    assert_eq!(build_describer_chain(&config).unwrap().names(), vec!["ocr"]);

    config.description.remote = RemoteStrategy::Vision;
    assert_eq!(build_describer_chain(&config).unwrap().names(), vec!["vision", "ocr"]);

    config.description.remote = RemoteStrategy::Job;
    config.description.job.endpoint = "http://localhost:9".to_string();
    assert_eq!(build_describer_chain(&config).unwrap().names(), vec!["job", "ocr"]);
}

#[test]
fn test_buildDescriberChain_withInvalidOcrLanguages_shouldFail() {
    let mut config = offline_config();
    config.description.ocr.enabled = true;
    config.description.ocr.languages = vec!["zz".to_string()];

    assert!(build_describer_chain(&config).is_err());
}

/// Answers both chat wire formats with the code `ru`
async fn detection_stub() -> HttpStub {
    HttpStub::start(|request| {
        if request.route() == "/v1/messages" {
            StubResponse::json(
                200,
                json!({
                    "content": [{ "type": "text", "text": "ru" }],
                    "usage": { "input_tokens": 8, "output_tokens": 1 }
                }),
            )
        } else {
            StubResponse::json(
                200,
                json!({ "choices": [{ "message": { "role": "assistant", "content": "ru" } }] }),
            )
        }
    })
    .await
}

async fn detection_route_for(provider: DetectionProvider) -> String {
    let stub = detection_stub().await;
    let mut config = offline_config();
    config.detection.provider = provider.clone();
    for entry in config.detection.available_providers.iter_mut() {
        entry.endpoint = stub.url();
    }
    let pipeline = build_pipeline(&config).unwrap();
    let document = Document::new(b"Privet mir".to_vec(), DocumentCategory::PlainText);

    let report = pipeline.convert(&document).await;

    assert!(matches!(report.outcome, ConversionOutcome::UnsupportedLanguage(ref code) if code == "ru"));
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    requests[0].route().to_string()
}

#[tokio::test]
async fn test_buildPipeline_shouldPickDetectionWireFormatByProvider() {
    assert_eq!(detection_route_for(DetectionProvider::Anthropic).await, "/v1/messages");
    assert_eq!(detection_route_for(DetectionProvider::Groq).await, "/chat/completions");
    assert_eq!(detection_route_for(DetectionProvider::LMStudio).await, "/chat/completions");
}
