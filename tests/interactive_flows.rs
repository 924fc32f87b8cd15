use std::io::Write;

use glimpse::annotate::{label_image, Annotation, NormalizedBox};
use glimpse::capture::{
    codec, record_audio, DeviceLeases, ImageFormat, LiveSource, TestPattern, Webcam,
};
use glimpse::clipboard::copy_to_clipboard;
use glimpse::display::{bridge, ScriptEvent, ScriptedFrontend, Teardown};
use glimpse::{CaptureConfig, GlimpseError};
use image::{DynamicImage, RgbImage};
use tempfile::NamedTempFile;

fn click(x: f64, y: f64) -> ScriptEvent {
    ScriptEvent::Click { x, y }
}

fn add(label: &str) -> ScriptEvent {
    ScriptEvent::Add {
        label: label.into(),
    }
}

fn finish(label: &str) -> ScriptEvent {
    ScriptEvent::Finish {
        label: label.into(),
    }
}

fn blank(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(w, h))
}

fn annotation_script() -> Vec<ScriptEvent> {
    vec![
        click(20.0, 10.0),
        click(120.0, 60.0),
        add("cat"),
        ScriptEvent::Clear,
        click(40.0, 20.0),
        click(140.0, 70.0),
        add("dog"),
        ScriptEvent::Trigger,
        click(100.0, 100.0),
        click(60.0, 80.0),
        finish("bird"),
    ]
}

#[tokio::test]
async fn annotation_round_trip_at_double_scale() {
    let (bridge, endpoint) = bridge::channel();
    // 100x50 image rendered at 200x100
    let frontend = ScriptedFrontend::new(endpoint, annotation_script())
        .with_scale(2.0)
        .spawn();

    let boxes = label_image(&bridge, blank(100, 50), ImageFormat::Png, Teardown::Remove)
        .await
        .unwrap();

    assert_eq!(
        boxes,
        vec![
            Annotation {
                bbox: NormalizedBox {
                    x: 40.0 / 200.0,
                    y: 20.0 / 100.0,
                    width: 100.0 / 200.0,
                    height: 50.0 / 100.0,
                },
                label: "dog".into(),
            },
            Annotation {
                bbox: NormalizedBox {
                    x: 100.0 / 200.0,
                    y: 100.0 / 100.0,
                    width: -40.0 / 200.0,
                    height: -20.0 / 100.0,
                },
                label: "bird".into(),
            },
        ]
    );

    drop(bridge);
    let tree = frontend.join().unwrap();
    assert!(tree.is_empty(), "annotator should be removed");
    assert_eq!(tree.created, 1);
}

#[tokio::test]
async fn kept_annotator_shows_outlines_since_last_clear() {
    let (bridge, endpoint) = bridge::channel();
    let frontend = ScriptedFrontend::new(endpoint, annotation_script()).spawn();

    label_image(&bridge, blank(200, 100), ImageFormat::Jpeg, Teardown::Keep)
        .await
        .unwrap();

    drop(bridge);
    let tree = frontend.join().unwrap();
    assert_eq!(tree.len(), 1);
    let state = tree.surfaces.values().next().unwrap();
    assert_eq!(state.outlines.len(), 2);
    assert_eq!(state.content.image().unwrap().format, ImageFormat::Jpeg);
}

#[tokio::test]
async fn annotations_serialize_with_box_key() {
    let (bridge, endpoint) = bridge::channel();
    let _frontend = ScriptedFrontend::new(
        endpoint,
        vec![click(0.0, 0.0), click(10.0, 10.0), finish("one")],
    )
    .spawn();

    let boxes = label_image(&bridge, blank(10, 10), ImageFormat::Png, Teardown::Remove)
        .await
        .unwrap();
    let json = serde_json::to_value(&boxes).unwrap();
    assert_eq!(json[0]["label"], "one");
    assert_eq!(json[0]["box"]["width"], 1.0);
}

#[tokio::test]
async fn exhausted_script_surfaces_as_frontend_closed() {
    let (bridge, endpoint) = bridge::channel();
    let frontend = ScriptedFrontend::new(endpoint, vec![click(1.0, 1.0)]).spawn();

    let err = label_image(&bridge, blank(8, 8), ImageFormat::Png, Teardown::Remove)
        .await
        .unwrap_err();
    assert!(matches!(err, GlimpseError::FrontendClosed));

    drop(bridge);
    let tree = frontend.join().unwrap();
    assert_eq!(tree.unanswered, 1);
    assert!(tree.is_empty(), "annotator should be removed on error too");
}

#[tokio::test]
async fn clicks_on_a_collapsed_surface_are_dropped() {
    let (bridge, endpoint) = bridge::channel();
    // Rendered at 0x0: every second corner is unusable
    let frontend = ScriptedFrontend::new(
        endpoint,
        vec![click(1.0, 1.0), click(5.0, 5.0), finish("none")],
    )
    .with_scale(0.0)
    .spawn();

    let boxes = label_image(&bridge, blank(10, 10), ImageFormat::Png, Teardown::Remove)
        .await
        .unwrap();
    assert!(boxes.is_empty());

    drop(bridge);
    let tree = frontend.join().unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.created, 1);
    assert_eq!(tree.unanswered, 0);
}

#[tokio::test]
async fn gif_is_not_offered_to_the_annotator() {
    let (bridge, _endpoint) = bridge::channel();
    let err = label_image(&bridge, blank(4, 4), ImageFormat::Gif, Teardown::Remove)
        .await
        .unwrap_err();
    assert!(matches!(err, GlimpseError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn annotator_loads_images_from_disk() {
    let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    blank(40, 20).save(file.path()).unwrap();

    let (bridge, endpoint) = bridge::channel();
    let _frontend = ScriptedFrontend::new(
        endpoint,
        vec![click(4.0, 2.0), click(8.0, 4.0), finish("disk")],
    )
    .spawn();

    let boxes = label_image(
        &bridge,
        file.path().to_path_buf(),
        ImageFormat::Png,
        Teardown::Remove,
    )
    .await
    .unwrap();
    assert_eq!(boxes[0].bbox.x, 0.1);
    assert_eq!(boxes[0].bbox.height, 0.1);
}

#[tokio::test]
async fn webcam_snapshot_waits_for_trigger_and_cleans_up() {
    let (bridge, endpoint) = bridge::channel();
    let frontend = ScriptedFrontend::new(endpoint, vec![add("ignored"), ScriptEvent::Trigger]).spawn();

    let config = CaptureConfig {
        width: 32,
        height: 24,
        quality: 70,
        ..CaptureConfig::default()
    };
    let leases = DeviceLeases::new();
    let source = Box::new(TestPattern::new(64, 48));
    let device = source.device().to_string();
    let mut webcam = Webcam::new(source, leases.clone(), bridge.clone(), &config);

    let frame = webcam.capture().await.unwrap();
    assert_eq!(frame.meta.format, ImageFormat::Jpeg);
    let decoded = frame.decode().unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
    assert!(!leases.is_held(&device));

    assert!(matches!(
        webcam.capture().await,
        Err(GlimpseError::SessionMisuse(_))
    ));

    drop(webcam);
    drop(bridge);
    let tree = frontend.join().unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.created, 1);
}

#[tokio::test]
async fn webcam_refuses_a_held_device() {
    let (bridge, _endpoint) = bridge::channel();
    let leases = DeviceLeases::new();
    let source = Box::new(TestPattern::new(8, 8));
    let _held = leases.acquire(source.device()).unwrap();
    let mut webcam = Webcam::new(source, leases.clone(), bridge, &CaptureConfig::default());
    assert!(matches!(
        webcam.capture().await,
        Err(GlimpseError::StreamAlreadyAcquired(_))
    ));
}

fn streamed_wav(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&16_000u32.to_le_bytes());
    out.extend_from_slice(&32_000u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&u32::MAX.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[tokio::test]
async fn recorded_clip_is_decoded() {
    let mut wav = NamedTempFile::new().unwrap();
    wav.write_all(&streamed_wav(&[5, -5, 300])).unwrap();

    let (bridge, endpoint) = bridge::channel();
    let frontend = ScriptedFrontend::new(
        endpoint,
        vec![
            ScriptEvent::Trigger,
            ScriptEvent::Recorded {
                path: wav.path().to_path_buf(),
            },
        ],
    )
    .spawn();

    let clip = record_audio(&bridge).await.unwrap();
    assert_eq!(clip.sample_rate, 16_000);
    assert_eq!(clip.channels, 1);
    assert_eq!(clip.samples, vec![5, -5, 300]);

    drop(bridge);
    assert!(frontend.join().unwrap().is_empty());
}

#[tokio::test]
async fn clipboard_receives_file_text_after_click() {
    let mut text = NamedTempFile::new().unwrap();
    write!(text, "hello clipboard").unwrap();

    let (bridge, endpoint) = bridge::channel();
    let frontend = ScriptedFrontend::new(endpoint, vec![ScriptEvent::Trigger]).spawn();

    let copied = copy_to_clipboard(&bridge, text.path()).await.unwrap();
    assert_eq!(copied, 15);

    drop(bridge);
    let tree = frontend.join().unwrap();
    assert_eq!(tree.clipboard.as_deref(), Some("hello clipboard"));
    assert!(tree.is_empty());
}

#[tokio::test]
async fn clipboard_reports_missing_file() {
    let (bridge, _endpoint) = bridge::channel();
    let dir = tempfile::tempdir().unwrap();
    let err = copy_to_clipboard(&bridge, &dir.path().join("absent.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, GlimpseError::Io(_)));
}

#[test]
fn captured_frames_decode_to_the_encoded_size() {
    let encoded = codec::encode_jpeg(&blank(12, 7), 80).unwrap();
    let frame = glimpse::capture::CapturedFrame::new(encoded.clone(), 3);
    assert_eq!(frame.encoded(), encoded);
    let decoded = frame.decode().unwrap();
    assert_eq!((decoded.width(), decoded.height()), (12, 7));
}
