use cubind_core::NativeStatus;
use cubind_npp::{
    AlphaOp, BorderType, CubindError, DeviceBuffer, DeviceImage, ErrorMetric, ImagingNative,
    NppContext, NppStatus, Point, Roi, Sample, SimImaging, Size,
};
use cubind_core::{DeviceAlloc, DevicePtr, SimDriver};
use num_traits::FromPrimitive;
use std::sync::Arc;

fn sim_ctx() -> (Arc<NppContext>, Arc<SimDriver>, Arc<SimImaging>) {
    let driver = Arc::new(SimDriver::new());
    let imaging = Arc::new(SimImaging::new(Arc::clone(&driver)));
    let ctx = NppContext::new(
        Arc::clone(&imaging) as Arc<dyn ImagingNative>,
        Arc::clone(&driver) as Arc<dyn DeviceAlloc>,
    );
    (ctx, driver, imaging)
}

fn sample_of<T: Sample>(v: f64) -> T {
    T::from_f64(v).expect("value representable in sample type")
}

fn assert_approx(a: f64, b: f64, tolerance: f64) {
    assert!(
        (a - b).abs() <= tolerance,
        "expected {b}, got {a} (tolerance {tolerance})"
    );
}

// --- Region-of-interest geometry ---

#[test]
fn full_region_pointer_equals_base() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let img = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    assert_eq!(img.roi_ptr(), img.base_ptr());
    Ok(())
}

#[test]
fn region_pointer_arithmetic_across_formats() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();

    let mut img = DeviceImage::<f32, 2>::alloc(&ctx, 16, 8)?;
    img.set_roi(Roi::new(3, 2, 4, 4))?;
    let expected = img.base_ptr().as_raw() + 2 * img.pitch() as u64 + 3 * 8;
    assert_eq!(img.roi_ptr().as_raw(), expected);

    let mut img = DeviceImage::<u8, 1>::alloc(&ctx, 16, 8)?;
    img.set_roi(Roi::new(5, 1, 2, 2))?;
    let expected = img.base_ptr().as_raw() + img.pitch() as u64 + 5;
    assert_eq!(img.roi_ptr().as_raw(), expected);

    let mut img = DeviceImage::<u16, 4>::alloc(&ctx, 16, 8)?;
    img.set_roi(Roi::new(1, 3, 2, 2))?;
    let expected = img.base_ptr().as_raw() + 3 * img.pitch() as u64 + 8;
    assert_eq!(img.roi_ptr().as_raw(), expected);

    Ok(())
}

#[test]
fn out_of_bounds_region_rejected_not_clamped() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let mut img = DeviceImage::<f32, 2>::alloc(&ctx, 16, 8)?;
    let err = img.set_roi(Roi::new(10, 0, 7, 8)).unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    // the rejected assignment must leave the region untouched
    assert_eq!(img.roi(), Roi::of(Size::new(16, 8)));
    assert!(img.set_roi(Roi::new(10, 0, 6, 8)).is_ok());
    Ok(())
}

// --- Fills and host transfers ---

#[test]
fn set_fills_the_region() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let img = DeviceImage::<f32, 2>::alloc(&ctx, 4, 3)?;
    img.set([1.5, -2.0])?;
    let host = img.copy_to_host()?;
    assert_eq!(host.len(), 4 * 3 * 2);
    for px in host.chunks_exact(2) {
        assert_eq!(px, [1.5, -2.0]);
    }
    Ok(())
}

#[test]
fn set_respects_a_narrowed_region() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let mut img = DeviceImage::<u8, 1>::alloc(&ctx, 8, 8)?;
    img.set([10])?;
    img.set_roi(Roi::new(2, 2, 3, 3))?;
    img.set([200])?;
    img.reset_roi();
    let host = img.copy_to_host()?;
    assert_eq!(host.iter().filter(|&&s| s == 200).count(), 9);
    assert_eq!(host[0], 10);
    assert_eq!(host[2 * 8 + 2], 200);
    Ok(())
}

fn fill_roundtrip<T: Sample, const C: usize>(ctx: &Arc<NppContext>) -> Result<(), CubindError> {
    let img = DeviceImage::<T, C>::alloc(ctx, 5, 4)?;
    let value: [T; C] = std::array::from_fn(|c| sample_of(c as f64 + 1.0));
    img.set(value)?;
    let host = img.copy_to_host()?;
    assert_eq!(host.len(), 5 * 4 * C);
    for (i, sample) in host.iter().enumerate() {
        assert_eq!(*sample, value[i % C]);
    }
    Ok(())
}

#[test]
fn fills_roundtrip_across_formats() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    fill_roundtrip::<u8, 1>(&ctx)?;
    fill_roundtrip::<u8, 4>(&ctx)?;
    fill_roundtrip::<u16, 2>(&ctx)?;
    fill_roundtrip::<f32, 1>(&ctx)?;
    fill_roundtrip::<f32, 3>(&ctx)?;
    Ok(())
}

#[test]
fn host_upload_lands_in_the_region() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let mut img = DeviceImage::<f32, 1>::alloc(&ctx, 6, 5)?;
    img.set([0.0])?;
    img.set_roi(Roi::new(1, 1, 3, 2))?;
    let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    img.copy_from_host(&data)?;
    assert_eq!(img.copy_to_host()?, data);
    img.reset_roi();
    let full = img.copy_to_host()?;
    assert_eq!(full[6 + 1], 1.0);
    assert_eq!(full[2 * 6 + 3], 6.0);
    assert_eq!(full[0], 0.0);
    Ok(())
}

#[test]
fn upload_size_mismatch_is_rejected() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let img = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    let err = img.copy_from_host(&[0.0f32; 7]).unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    Ok(())
}

// --- Ownership and teardown ---

#[test]
fn owning_view_frees_exactly_once() -> Result<(), CubindError> {
    let (ctx, driver, _) = sim_ctx();
    let mut img = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    assert_eq!(driver.live_allocations(), 1);
    img.release();
    assert_eq!(driver.live_allocations(), 0);
    img.release();
    drop(img);
    assert_eq!(driver.live_allocations(), 0);
    Ok(())
}

#[test]
fn alias_teardown_leaves_memory_live() -> Result<(), CubindError> {
    let (ctx, driver, _) = sim_ctx();
    let external = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    assert_eq!(driver.live_allocations(), 1);
    {
        let alias = DeviceImage::alias_of(&external);
        assert!(!alias.owns_memory());
        alias.set([4.0, 5.0])?;
    }
    assert_eq!(driver.live_allocations(), 1);
    // the external view still reads what the alias wrote
    assert_eq!(external.copy_to_host()?[0], 4.0);

    {
        let alias = DeviceImage::<f32, 2>::alias_raw(
            &ctx,
            external.base_ptr(),
            external.width(),
            external.height(),
            external.pitch(),
        )?;
        assert!(!alias.owns_memory());
    }
    assert_eq!(driver.live_allocations(), 1);
    Ok(())
}

#[test]
fn adopted_pointer_is_freed_on_drop() -> Result<(), CubindError> {
    let (ctx, driver, imaging) = sim_ctx();
    let (ptr, pitch) = imaging.malloc(DeviceImage::<f32, 2>::FORMAT, 8, 8);
    assert_eq!(driver.live_allocations(), 1);
    {
        let img = DeviceImage::<f32, 2>::adopt_raw(&ctx, ptr, 8, 8, pitch)?;
        assert!(img.owns_memory());
    }
    assert_eq!(driver.live_allocations(), 0);
    Ok(())
}

#[test]
fn allocation_failure_is_typed() {
    let (ctx, driver, _) = sim_ctx();
    driver.fail_next_alloc();
    let err = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8).unwrap_err();
    assert!(matches!(err, CubindError::Allocation { .. }));
    assert_eq!(driver.live_allocations(), 0);
}

// --- Scratch-buffer discipline ---

#[test]
fn undersized_scratch_never_reaches_native_code() -> Result<(), CubindError> {
    let (ctx, _, imaging) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    a.set([0.5, 0.5])?;
    b.set([0.5, 0.5])?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;

    let required = a.error_scratch_size(ErrorMetric::Maximum)?;
    assert!(required > 1);

    let small = DeviceBuffer::<u8>::alloc(ctx.alloc(), required - 1)?;
    let before = imaging.dispatch_count();
    let err = a
        .max_error(&b, &result, Some(&small))
        .unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    assert_eq!(imaging.dispatch_count(), before);

    let exact = DeviceBuffer::<u8>::alloc(ctx.alloc(), required)?;
    a.max_error(&b, &result, Some(&exact))?;
    assert_eq!(imaging.dispatch_count(), before + 1);
    Ok(())
}

#[test]
fn internal_scratch_is_allocated_and_freed() -> Result<(), CubindError> {
    let (ctx, driver, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 16, 16)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 16, 16)?;
    a.set([1.0, 0.0])?;
    b.set([0.0, 0.0])?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;
    let live_before = driver.live_allocations();
    a.max_error(&b, &result, None)?;
    assert_eq!(driver.live_allocations(), live_before);
    assert_approx(result.copy_to_host()?[0], 1.0, 1e-12);
    Ok(())
}

#[test]
fn empty_result_buffer_rejected() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    let empty = DeviceBuffer::<f64>::from_raw(ctx.alloc(), DevicePtr::from_raw(0x10), 0, false);
    let err = a.max_error(&b, &empty, None).unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    Ok(())
}

// --- Error metrics end to end ---

#[test]
fn max_error_of_identical_buffers_is_zero() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    a.set([0.25, 0.75])?;
    b.set([0.25, 0.75])?;

    let required = a.error_scratch_size(ErrorMetric::Maximum)?;
    let scratch = DeviceBuffer::<u8>::alloc(ctx.alloc(), required)?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;
    a.max_error(&b, &result, Some(&scratch))?;

    let value = result.copy_to_host()?[0];
    assert!(value.is_finite());
    assert_eq!(value, 0.0);
    Ok(())
}

#[test]
fn error_metrics_measure_the_difference() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    a.set([0.25, 0.75])?;
    b.set([0.25, 0.5])?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;

    a.max_error(&b, &result, None)?;
    assert_approx(result.copy_to_host()?[0], 0.25, 1e-9);

    a.average_error(&b, &result, None)?;
    assert_approx(result.copy_to_host()?[0], 0.125, 1e-9);

    a.maximum_relative_error(&b, &result, None)?;
    assert_approx(result.copy_to_host()?[0], 0.25 / 0.75, 1e-9);
    Ok(())
}

#[test]
fn metrics_honor_the_region() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let mut a = DeviceImage::<f32, 1>::alloc(&ctx, 8, 8)?;
    let mut b = DeviceImage::<f32, 1>::alloc(&ctx, 8, 8)?;
    a.set([1.0])?;
    b.set([1.0])?;
    // plant a difference outside the region that must not be seen
    b.set_roi(Roi::new(0, 0, 1, 1))?;
    b.set([9.0])?;
    a.set_roi(Roi::new(4, 4, 2, 2))?;
    b.set_roi(Roi::new(4, 4, 2, 2))?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;
    a.max_error(&b, &result, None)?;
    assert_eq!(result.copy_to_host()?[0], 0.0);
    Ok(())
}

#[test]
fn mismatched_regions_are_rejected() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    let mut b = DeviceImage::<f32, 2>::alloc(&ctx, 8, 8)?;
    b.set_roi(Roi::new(0, 0, 4, 4))?;
    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;
    let err = a.max_error(&b, &result, None).unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    Ok(())
}

// --- Alpha composition, color twist, filters ---

#[test]
fn alpha_over_prefers_the_opaque_source() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let a = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    let b = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    let out = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    a.set([1.0, 1.0])?; // opaque white
    b.set([0.25, 1.0])?;
    a.alpha_comp(&b, &out, AlphaOp::Over)?;
    let host = out.copy_to_host()?;
    assert_approx(host[0] as f64, 1.0, 1e-6);
    assert_approx(host[1] as f64, 1.0, 1e-6);
    Ok(())
}

#[test]
fn color_twist_applies_the_matrix() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let src = DeviceImage::<f32, 2>::alloc(&ctx, 2, 2)?;
    let dst = DeviceImage::<f32, 2>::alloc(&ctx, 2, 2)?;
    src.set([2.0, 3.0])?;
    let twist = [
        [1.0, 0.0, 0.0, 0.5],
        [0.0, 2.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    src.color_twist(&dst, &twist)?;
    let host = dst.copy_to_host()?;
    assert_approx(host[0] as f64, 2.5, 1e-6);
    assert_approx(host[1] as f64, 6.0, 1e-6);

    src.color_twist_inplace(&twist)?;
    let host = src.copy_to_host()?;
    assert_approx(host[0] as f64, 2.5, 1e-6);
    assert_approx(host[1] as f64, 6.0, 1e-6);
    Ok(())
}

#[test]
fn box_filter_averages_the_neighborhood() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let src = DeviceImage::<f32, 1>::alloc(&ctx, 3, 3)?;
    let dst = DeviceImage::<f32, 1>::alloc(&ctx, 3, 3)?;
    let values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
    src.copy_from_host(&values)?;
    let kernel = DeviceBuffer::from_host(ctx.alloc(), &[1.0f32 / 9.0; 9])?;
    src.filter(&dst, &kernel, Size::new(3, 3), Point::new(1, 1))?;
    let host = dst.copy_to_host()?;
    // the center pixel sees the full neighborhood
    assert_approx(host[4] as f64, 5.0, 1e-5);
    Ok(())
}

#[test]
fn bordered_filter_replicates_edges() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let src = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    let dst = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    src.set([2.0])?;
    let kernel = DeviceBuffer::from_host(ctx.alloc(), &[1.0f32; 9])?;
    src.filter_border(&dst, &kernel, Size::new(3, 3), Point::new(1, 1), BorderType::Replicate)?;
    let host = dst.copy_to_host()?;
    for sample in host {
        assert_approx(sample as f64, 18.0, 1e-5);
    }
    Ok(())
}

#[test]
fn unsupported_border_mode_surfaces_the_native_status() -> Result<(), CubindError> {
    let (ctx, _, _) = sim_ctx();
    let src = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    let dst = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    let kernel = DeviceBuffer::from_host(ctx.alloc(), &[1.0f32; 9])?;
    let err = src
        .filter_border(&dst, &kernel, Size::new(3, 3), Point::new(1, 1), BorderType::Wrap)
        .unwrap_err();
    match err {
        CubindError::Operation { status, .. } => {
            assert_eq!(status, NppStatus::NotSupportedMode.raw());
        }
        other => panic!("expected Operation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn undersized_kernel_never_dispatches() -> Result<(), CubindError> {
    let (ctx, _, imaging) = sim_ctx();
    let src = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    let dst = DeviceImage::<f32, 1>::alloc(&ctx, 4, 4)?;
    let kernel = DeviceBuffer::from_host(ctx.alloc(), &[1.0f32; 4])?;
    let before = imaging.dispatch_count();
    let err = src
        .filter(&dst, &kernel, Size::new(3, 3), Point::new(1, 1))
        .unwrap_err();
    assert!(matches!(err, CubindError::Precondition(_)));
    assert_eq!(imaging.dispatch_count(), before);
    Ok(())
}

#[test]
fn injected_native_failure_becomes_an_operation_error() -> Result<(), CubindError> {
    let (ctx, _, imaging) = sim_ctx();
    let img = DeviceImage::<f32, 2>::alloc(&ctx, 4, 4)?;
    imaging.fail_next_op(NppStatus::StepError.raw());
    let err = img.set([0.0, 0.0]).unwrap_err();
    match err {
        CubindError::Operation { call, status, .. } => {
            assert_eq!(call, "nppiSet_32f_C2R");
            assert_eq!(status, NppStatus::StepError.raw());
        }
        other => panic!("expected Operation error, got {other:?}"),
    }
    // the view stays inspectable after a failed operation
    assert_eq!(img.width(), 4);
    assert_eq!(img.roi(), Roi::of(Size::new(4, 4)));
    Ok(())
}

// --- Strided reinterpretation ---

#[test]
fn pitched_reinterpretation_preserves_pointer_and_ownership() -> Result<(), CubindError> {
    let (ctx, driver, _) = sim_ctx();
    let img = DeviceImage::<f32, 2>::alloc(&ctx, 8, 6)?;
    img.set([1.0, 2.0])?;

    let pitched = img.to_pitched();
    assert_eq!(pitched.device_ptr(), img.base_ptr());
    assert_eq!(pitched.pitch(), img.pitch());
    assert_eq!(pitched.width(), 8);
    assert_eq!(pitched.height(), 6);
    assert_eq!(pitched.row_ptr(2).as_raw(), img.base_ptr().as_raw() + 2 * img.pitch() as u64);

    {
        let view = DeviceImage::<f32, 2>::from_pitched(&ctx, &pitched)?;
        assert_eq!(view.base_ptr(), img.base_ptr());
        assert_eq!(view.roi_ptr(), img.base_ptr());
        assert!(!view.owns_memory());
        // the round-tripped view reads the same memory
        assert_eq!(view.copy_to_host()?[0], 1.0);
    }
    assert_eq!(driver.live_allocations(), 1);
    Ok(())
}
