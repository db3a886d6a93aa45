use super::*;
use crate::backend::{BackendProbe, Candidate};

fn runtime() -> Arc<BlurRuntime> {
    Arc::new(BlurRuntime::with_probe(BackendProbe::with_candidates(vec![
        Candidate::box_blur(),
    ])))
}

const DOC: &str = r##"{
  "width": 64,
  "height": 48,
  "background": "#FF202020",
  "layers": [
    { "type": "rect", "x": 0, "y": 0, "width": 32, "height": 48, "color": "#FFFF0000" },
    { "type": "blur_pane", "x": 16, "y": 8, "width": 32, "height": 32,
      "config": { "radius": 8, "overlay_color": "#00000000" } },
    { "type": "rect", "x": 56, "y": 0, "width": 8, "height": 8, "color": "#FF00FF00" }
  ]
}"##;

#[test]
fn doc_parses_layers_and_defaults() {
    let doc = SceneDoc::from_json_str(DOC).unwrap();
    assert_eq!((doc.width, doc.height), (64, 48));
    assert_eq!(doc.layers.len(), 3);
    let LayerDoc::BlurPane { config, .. } = &doc.layers[1] else {
        panic!("expected a blur pane");
    };
    assert_eq!(config.radius, 8.0);
    assert_eq!(config.downsample_factor, 4.0);
    assert_eq!(doc.host, HostContext::default());
}

#[test]
fn doc_rejects_unknown_layer_types() {
    let err = SceneDoc::from_json_str(r#"{"width":1,"height":1,"layers":[{"type":"oval"}]}"#)
        .unwrap_err();
    assert!(err.to_string().starts_with("serialization error:"));
}

#[test]
fn zero_sized_scene_is_rejected() {
    let doc = SceneDoc {
        width: 0,
        height: 10,
        background: None,
        host: HostContext::default(),
        layers: Vec::new(),
    };
    assert!(Stage::from_doc(&doc, runtime()).is_err());
}

#[test]
fn panes_outside_the_window_are_rejected() {
    for (x, y, width, height) in [
        (u32::MAX - 1, 0, 4, 4),
        (0, u32::MAX, 4, 1),
        (60, 0, 8, 8),
        (0, 40, 8, 9),
    ] {
        let doc = SceneDoc {
            width: 64,
            height: 48,
            background: None,
            host: HostContext::default(),
            layers: vec![LayerDoc::BlurPane {
                x,
                y,
                width,
                height,
                config: BlurConfig::default(),
            }],
        };
        let err = Stage::from_doc(&doc, runtime()).unwrap_err();
        assert!(err.to_string().starts_with("validation error:"), "{x},{y}");
    }
}

#[test]
fn region_copy_near_the_coordinate_limit_skips_pixels() {
    let src = PixelBuffer::try_new(4, 4).unwrap();
    let out = copy_region(&src, (u32::MAX - 1, 0), PixelSize::new(4, 4)).unwrap();
    assert_eq!(out.pixel(3, 0), Some([0, 0, 0, 0]));

    let mut dst = PixelBuffer::try_new(4, 4).unwrap();
    let patch = PixelBuffer::from_premul_bytes(2, 1, vec![9; 8]).unwrap();
    paste_region(&mut dst, &patch, (u32::MAX, 0));
    assert!(dst.data().iter().all(|&b| b == 0));
}

#[test]
fn scene_capture_stops_at_the_capturing_pane() {
    let rt = runtime();
    let doc = SceneDoc::from_json_str(DOC).unwrap();
    let stage = Stage::from_doc(&doc, rt).unwrap();
    let gate = stage.panes()[0].view.gate();

    let mut buf = PixelBuffer::try_new(64, 48).unwrap();
    let _capture = gate.begin_capture();
    let outcome = stage
        .scene()
        .draw(&mut CaptureCanvas::new(&mut buf, Affine::IDENTITY));
    assert_eq!(outcome, DrawOutcome::Stopped);
    assert_eq!(buf.pixel(0, 0), Some([255, 0, 0, 255]));
    // Layers above the pane are never reached.
    assert_eq!(buf.pixel(60, 4), Some([0x20, 0x20, 0x20, 255]));
}

#[test]
fn render_frame_composites_panes_over_the_scene() {
    let doc = SceneDoc::from_json_str(DOC).unwrap();
    let mut stage = Stage::from_doc(&doc, runtime()).unwrap();
    let frame = stage.render_frame().unwrap();

    assert_eq!(frame.size(), PixelSize::new(64, 48));
    assert_eq!(frame.pixel(2, 2), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(60, 4), Some([0, 255, 0, 255]));
    // Inside the pane the red/grey edge is softened.
    let [r, ..] = frame.pixel(31, 24).unwrap();
    assert!(r > 0x20 && r < 255, "edge not blurred: {r}");

    let pipeline = stage.panes()[0].view.pipeline();
    assert_eq!(pipeline.stats().blurs, 1);
    assert_eq!(pipeline.stats().aborted_captures, 1);
}

#[test]
fn detach_all_releases_every_pane() {
    let doc = SceneDoc::from_json_str(DOC).unwrap();
    let mut stage = Stage::from_doc(&doc, runtime()).unwrap();
    stage.render_frame().unwrap();
    stage.detach_all();
    assert!(stage.panes().iter().all(|p| !p.view.is_attached()));
    assert!(
        stage
            .panes()
            .iter()
            .all(|p| p.view.pipeline().buffers().pair().is_none())
    );
}
