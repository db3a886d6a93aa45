use super::*;

fn host() -> HostContext {
    HostContext {
        debug: true,
        ..HostContext::default()
    }
}

fn prepared(w: u32, h: u32, radius: f32) -> GaussianBackend {
    let mut b = GaussianBackend::new(GaussianOpts { threads: Some(2) });
    assert!(b.prepare(&host(), BufferDesc::new(w, h), radius).unwrap());
    b
}

#[test]
fn kernel_sums_to_one_in_q16() {
    for r in [1u32, 3, 10, 25] {
        let k = gaussian_kernel_q16(r, sigma_for_radius(r as f32)).unwrap();
        assert_eq!(k.len(), (2 * r + 1) as usize);
        assert_eq!(k.iter().map(|&w| u64::from(w)).sum::<u64>(), 65536);
    }
}

#[test]
fn constant_image_is_unchanged() {
    let (w, h) = (6u32, 5u32);
    let src = PixelBuffer::from_premul_bytes(w, h, [10u8, 20, 30, 40].repeat((w * h) as usize))
        .unwrap();
    let mut out = PixelBuffer::try_new(w, h).unwrap();
    let mut b = prepared(w, h, 3.0);
    b.blur(&src, &mut out).unwrap();
    assert_eq!(out, src);
}

#[test]
fn single_pixel_energy_spreads_and_is_preserved() {
    let (w, h) = (9u32, 9u32);
    let mut src = PixelBuffer::try_new(w, h).unwrap();
    src.put_pixel(4, 4, [255, 255, 255, 255]);
    let mut out = PixelBuffer::try_new(w, h).unwrap();
    let mut b = prepared(w, h, 2.0);
    b.blur(&src, &mut out).unwrap();

    let nonzero = out.data().chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);
    let sum_a: i32 = out.data().chunks_exact(4).map(|px| i32::from(px[3])).sum();
    assert!((sum_a - 255).abs() <= 8);
}

#[test]
fn blur_before_prepare_is_an_error() {
    let mut b = GaussianBackend::default();
    let src = PixelBuffer::try_new(2, 2).unwrap();
    let mut out = PixelBuffer::try_new(2, 2).unwrap();
    assert!(b.blur(&src, &mut out).is_err());
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut b = prepared(4, 4, 1.0);
    let src = PixelBuffer::try_new(4, 3).unwrap();
    let mut out = PixelBuffer::try_new(4, 4).unwrap();
    assert!(b.blur(&src, &mut out).is_err());
}

#[test]
fn radius_above_cap_is_a_caller_error() {
    let mut b = GaussianBackend::default();
    assert!(b.prepare(&host(), BufferDesc::new(4, 4), 26.0).is_err());
}

#[test]
fn zero_threads_degrades_in_release_mode_and_surfaces_in_debug() {
    let mut b = GaussianBackend::new(GaussianOpts { threads: Some(0) });
    let release_host = HostContext {
        debug: false,
        ..HostContext::default()
    };
    assert!(!b.prepare(&release_host, BufferDesc::new(4, 4), 2.0).unwrap());
    assert!(b.prepare(&host(), BufferDesc::new(4, 4), 2.0).is_err());
}

#[test]
fn release_is_idempotent_and_blocks_blur() {
    let mut b = prepared(4, 4, 1.0);
    b.release();
    b.release();
    let src = PixelBuffer::try_new(4, 4).unwrap();
    let mut out = PixelBuffer::try_new(4, 4).unwrap();
    assert!(b.blur(&src, &mut out).is_err());
}

#[test]
fn serial_tier_matches_the_pooled_output() {
    let (w, h) = (11u32, 7u32);
    let mut src = PixelBuffer::try_new(w, h).unwrap();
    for (i, (x, y)) in [(0, 0), (5, 3), (10, 6), (2, 5)].into_iter().enumerate() {
        let v = 60 + 60 * i as u8;
        src.put_pixel(x, y, [v, v / 2, v / 3, v]);
    }
    let mut pooled = PixelBuffer::try_new(w, h).unwrap();
    prepared(w, h, 3.0).blur(&src, &mut pooled).unwrap();

    let mut serial = SerialGaussianBackend::new();
    assert_eq!(serial.kind(), BackendKind::SerialGaussian);
    assert!(serial.prepare(&host(), BufferDesc::new(w, h), 3.0).unwrap());
    let mut out = PixelBuffer::try_new(w, h).unwrap();
    serial.blur(&src, &mut out).unwrap();
    assert_eq!(out, pooled);

    serial.release();
    assert!(serial.blur(&src, &mut out).is_err());
}

#[test]
fn backends_from_one_pool_handle_share_workers() {
    let shared = SharedPool::default();
    let opts = GaussianOpts { threads: Some(2) };
    let mut a = GaussianBackend::with_shared_pool(opts, shared.clone());
    let mut b = GaussianBackend::with_shared_pool(opts, shared.clone());
    assert!(a.prepare(&host(), BufferDesc::new(4, 4), 1.0).unwrap());
    assert!(b.prepare(&host(), BufferDesc::new(8, 2), 2.0).unwrap());
    assert!(Arc::ptr_eq(a.pool.as_ref().unwrap(), b.pool.as_ref().unwrap()));

    // Releasing one backend leaves the pool in place for the next prepare.
    a.release();
    assert!(a.prepare(&host(), BufferDesc::new(4, 4), 1.0).unwrap());
    assert!(Arc::ptr_eq(a.pool.as_ref().unwrap(), b.pool.as_ref().unwrap()));

    let mut own = GaussianBackend::new(opts);
    assert!(own.prepare(&host(), BufferDesc::new(4, 4), 1.0).unwrap());
    assert!(!Arc::ptr_eq(own.pool.as_ref().unwrap(), a.pool.as_ref().unwrap()));
}
