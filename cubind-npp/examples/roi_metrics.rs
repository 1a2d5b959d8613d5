//! End-to-end walk over the simulated driver: allocate two images, narrow
//! a region of interest, query the scratch requirement, and run the
//! error-metric catalog. Run with `RUST_LOG=debug` to see the
//! per-native-call log lines.

use cubind_npp::{CubindError, DeviceBuffer, DeviceImage, ErrorMetric, NppContext, Roi};

fn main() -> Result<(), CubindError> {
    env_logger::init();

    let ctx = NppContext::simulated();

    let mut reference = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    let mut candidate = DeviceImage::<f32, 2>::alloc(&ctx, 64, 64)?;
    reference.set([0.25, 1.0])?;
    candidate.set([0.20, 1.0])?;

    let roi = Roi::new(8, 8, 48, 48);
    reference.set_roi(roi)?;
    candidate.set_roi(roi)?;
    println!(
        "comparing {}x{} regions at pitch {}",
        roi.width,
        roi.height,
        reference.pitch()
    );

    let result = DeviceBuffer::<f64>::alloc(ctx.alloc(), 1)?;
    for metric in [
        ErrorMetric::Maximum,
        ErrorMetric::Average,
        ErrorMetric::MaximumRelative,
        ErrorMetric::AverageRelative,
    ] {
        let required = reference.error_scratch_size(metric)?;
        let scratch = DeviceBuffer::<u8>::alloc(ctx.alloc(), required)?;
        reference.error_metric(metric, &candidate, &result, Some(&scratch))?;
        let value = result.copy_to_host()?[0];
        println!("{metric:?}: {value:.6} ({required} scratch bytes)");
    }

    Ok(())
}
