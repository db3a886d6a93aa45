use super::*;

#[test]
fn capture_transform_aligns_view_origin_and_scales() {
    let g = CaptureGeometry {
        view_origin: Point::new(40.0, 80.0),
        view_size: PixelSize::new(400, 800),
        root_origin: Point::new(0.0, 0.0),
    };
    let t = g.capture_transform(PixelSize::new(100, 200));
    let p = t * Point::new(40.0, 80.0);
    assert!((p.x - 0.0).abs() < 1e-9 && (p.y - 0.0).abs() < 1e-9);
    let q = t * Point::new(440.0, 880.0);
    assert!((q.x - 100.0).abs() < 1e-9 && (q.y - 200.0).abs() < 1e-9);
}

#[test]
fn root_offset_shifts_the_capture() {
    let g = CaptureGeometry {
        view_origin: Point::new(10.0, 10.0),
        view_size: PixelSize::new(10, 10),
        root_origin: Point::new(0.0, 24.0),
    };
    let t = g.capture_transform(PixelSize::new(10, 10));
    let p = t * Point::new(0.0, 0.0);
    assert_eq!((p.x, p.y), (-10.0, 14.0));
}

#[test]
fn fill_rect_covers_pixel_centers_inside_bounds() {
    let mut buf = PixelBuffer::try_new(4, 4).unwrap();
    let mut c = CaptureCanvas::new(&mut buf, Affine::IDENTITY);
    c.fill_rect(Rect::new(1.0, 1.0, 3.0, 2.0), Color::rgba(255, 0, 0, 255));
    assert_eq!(buf.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(buf.pixel(2, 1), Some([255, 0, 0, 255]));
    assert_eq!(buf.pixel(0, 1), Some([0, 0, 0, 0]));
    assert_eq!(buf.pixel(1, 2), Some([0, 0, 0, 0]));
}

#[test]
fn fill_rect_clips_to_target_and_blends() {
    let mut buf = PixelBuffer::try_new(2, 2).unwrap();
    buf.fill(Color::rgba(0, 0, 255, 255).premultiplied());
    let mut c = CaptureCanvas::new(&mut buf, Affine::IDENTITY);
    c.translate(Vec2::new(-10.0, -10.0));
    c.fill_rect(Rect::new(0.0, 0.0, 100.0, 100.0), Color::rgba(255, 0, 0, 0));
    c.fill_rect(Rect::new(-50.0, -50.0, 50.0, 50.0), Color::rgba(255, 0, 0, 255));
    assert_eq!(buf.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(buf.pixel(1, 1), Some([255, 0, 0, 255]));
}

#[test]
fn gate_stops_self_and_skips_others_while_capturing() {
    let rt = Arc::new(BlurRuntime::new());
    let own = DrawGate::new(rt.clone());
    let other = DrawGate::new(rt.clone());
    assert_eq!(own.decide(), DrawDecision::Draw);
    {
        let _scope = own.begin_capture();
        assert_eq!(own.decide(), DrawDecision::Stop);
        assert_eq!(other.decide(), DrawDecision::Skip);
        assert_eq!(rt.rendering_count(), 1);
    }
    assert_eq!(own.decide(), DrawDecision::Draw);
    assert_eq!(other.decide(), DrawDecision::Draw);
    assert_eq!(rt.rendering_count(), 0);
}
