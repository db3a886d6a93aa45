use super::*;

fn host() -> HostContext {
    HostContext {
        debug: true,
        ..HostContext::default()
    }
}

#[test]
fn box_radius_grows_with_sigma() {
    assert_eq!(box_radius_for_sigma(0.1), 1);
    let small = box_radius_for_sigma(sigma_for_radius(5.0));
    let large = box_radius_for_sigma(sigma_for_radius(25.0));
    assert!(large > small);
}

#[test]
fn constant_image_is_unchanged() {
    let (w, h) = (7u32, 4u32);
    let src =
        PixelBuffer::from_premul_bytes(w, h, [50u8, 60, 70, 255].repeat((w * h) as usize)).unwrap();
    let mut out = PixelBuffer::try_new(w, h).unwrap();
    let mut b = BoxBlurBackend::new();
    assert!(b.prepare(&host(), BufferDesc::new(w, h), 4.0).unwrap());
    b.blur(&src, &mut out).unwrap();
    assert_eq!(out, src);
}

#[test]
fn hard_edge_is_softened() {
    let (w, h) = (16u32, 1u32);
    let mut bytes = Vec::new();
    for x in 0..w {
        let v = if x < 8 { 0 } else { 255 };
        bytes.extend_from_slice(&[v, v, v, 255]);
    }
    let src = PixelBuffer::from_premul_bytes(w, h, bytes).unwrap();
    let mut out = PixelBuffer::try_new(w, h).unwrap();
    let mut b = BoxBlurBackend::new();
    assert!(b.prepare(&host(), BufferDesc::new(w, h), 3.0).unwrap());
    b.blur(&src, &mut out).unwrap();

    let left = out.pixel(7, 0).unwrap()[0];
    let right = out.pixel(8, 0).unwrap()[0];
    assert!(left > 0 && left < 255);
    assert!(right > 0 && right < 255);
    assert_eq!(out.pixel(0, 0).unwrap()[0], 0);
    assert_eq!(out.pixel(15, 0).unwrap()[0], 255);
}

#[test]
fn release_clears_binding() {
    let mut b = BoxBlurBackend::new();
    assert!(b.prepare(&host(), BufferDesc::new(2, 2), 1.0).unwrap());
    assert!(b.box_radius() >= 1);
    b.release();
    b.release();
    assert_eq!(b.box_radius(), 0);
    let src = PixelBuffer::try_new(2, 2).unwrap();
    let mut out = PixelBuffer::try_new(2, 2).unwrap();
    assert!(b.blur(&src, &mut out).is_err());
}
