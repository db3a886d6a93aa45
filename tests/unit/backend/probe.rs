use std::sync::atomic::AtomicUsize;

use super::*;

struct Declining;

impl BlurBackend for Declining {
    fn kind(&self) -> BackendKind {
        BackendKind::Gaussian
    }

    fn prepare(&mut self, _: &HostContext, _: BufferDesc, _: f32) -> BlurResult<bool> {
        Ok(false)
    }

    fn blur(&mut self, _: &PixelBuffer, _: &mut PixelBuffer) -> BlurResult<()> {
        Err(BlurError::backend("never prepared"))
    }

    fn release(&mut self) {}
}

struct Erroring;

impl BlurBackend for Erroring {
    fn kind(&self) -> BackendKind {
        BackendKind::Gaussian
    }

    fn prepare(&mut self, _: &HostContext, _: BufferDesc, _: f32) -> BlurResult<bool> {
        Err(BlurError::backend("missing native library"))
    }

    fn blur(&mut self, _: &PixelBuffer, _: &mut PixelBuffer) -> BlurResult<()> {
        unreachable!()
    }

    fn release(&mut self) {}
}

struct Panicking;

impl BlurBackend for Panicking {
    fn kind(&self) -> BackendKind {
        BackendKind::BoxBlur
    }

    fn prepare(&mut self, _: &HostContext, _: BufferDesc, _: f32) -> BlurResult<bool> {
        panic!("vendor kernel blew up")
    }

    fn blur(&mut self, _: &PixelBuffer, _: &mut PixelBuffer) -> BlurResult<()> {
        unreachable!()
    }

    fn release(&mut self) {}
}

fn host(platform_version: u32) -> HostContext {
    HostContext {
        platform_version,
        debug: false,
        density: 1.0,
    }
}

#[test]
fn default_probe_picks_gaussian_on_modern_platforms() {
    let probe = BackendProbe::new();
    assert_eq!(probe.select(&host(34)).kind(), BackendKind::Gaussian);
}

#[test]
fn default_list_orders_four_tiers() {
    let kinds: Vec<_> = default_candidates().iter().map(Candidate::kind).collect();
    assert_eq!(
        kinds,
        [
            BackendKind::Gaussian,
            BackendKind::SerialGaussian,
            BackendKind::BoxBlur,
            BackendKind::Noop,
        ]
    );
    assert_eq!(BackendProbe::new().candidates().len(), 4);
}

#[test]
fn version_gate_skips_gaussian_on_old_platforms() {
    let probe = BackendProbe::new();
    assert_eq!(probe.select(&host(16)).kind(), BackendKind::SerialGaussian);
}

/// The default list with every tier in `failing` swapped for an erroring backend.
fn default_list_failing(failing: &[BackendKind]) -> Vec<Candidate> {
    default_candidates()
        .into_iter()
        .map(|c| {
            if failing.contains(&c.kind()) {
                Candidate::new(c.kind(), || Box::new(Erroring))
            } else {
                c
            }
        })
        .collect()
}

#[test]
fn default_list_falls_through_each_tier_to_noop() {
    let cases = [
        (vec![BackendKind::Gaussian], BackendKind::SerialGaussian),
        (
            vec![BackendKind::Gaussian, BackendKind::SerialGaussian],
            BackendKind::BoxBlur,
        ),
        (
            vec![
                BackendKind::Gaussian,
                BackendKind::SerialGaussian,
                BackendKind::BoxBlur,
            ],
            BackendKind::Noop,
        ),
    ];
    for (failing, expected) in cases {
        let probe = BackendProbe::with_candidates(default_list_failing(&failing));
        assert_eq!(probe.candidates().len(), 4);
        assert_eq!(probe.select(&host(34)).kind(), expected, "failing {failing:?}");
        assert_eq!(probe.probe_runs(), 1);
    }
}

#[test]
fn failures_fall_through_in_priority_order() {
    let probe = BackendProbe::with_candidates(vec![
        Candidate::new(BackendKind::Gaussian, || Box::new(Erroring)),
        Candidate::new(BackendKind::Gaussian, || Box::new(Declining)),
        Candidate::new(BackendKind::BoxBlur, || Box::new(Panicking)),
        Candidate::box_blur(),
    ]);
    assert_eq!(probe.select(&host(34)).kind(), BackendKind::BoxBlur);
    assert_eq!(probe.candidates().len(), 5);
}

#[test]
fn all_failing_candidates_select_noop() {
    let probe = BackendProbe::with_candidates(vec![Candidate::new(BackendKind::Gaussian, || {
        Box::new(Erroring)
    })]);
    assert_eq!(probe.select(&host(34)).kind(), BackendKind::Noop);
    assert_eq!(probe.candidates().last().unwrap().kind(), BackendKind::Noop);
}

#[test]
fn probe_runs_once_and_choice_is_stable() {
    static CREATED: AtomicUsize = AtomicUsize::new(0);
    let probe = BackendProbe::with_candidates(vec![Candidate::new(BackendKind::BoxBlur, || {
        CREATED.fetch_add(1, Ordering::Relaxed);
        Box::new(BoxBlurBackend::new())
    })]);
    assert_eq!(probe.chosen_kind(), None);

    for _ in 0..5 {
        assert_eq!(probe.select(&host(34)).kind(), BackendKind::BoxBlur);
    }
    assert_eq!(probe.probe_runs(), 1);
    assert_eq!(CREATED.load(Ordering::Relaxed), 1);

    let _instance = probe.create(&host(10));
    assert_eq!(probe.probe_runs(), 1);
    assert_eq!(CREATED.load(Ordering::Relaxed), 2);
    assert_eq!(probe.chosen_kind(), Some(BackendKind::BoxBlur));
}
