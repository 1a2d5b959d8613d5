//! Walks the handle lifecycle against the simulated sparse library:
//! eager creation, explicit idempotent release, and the typed error a
//! failing native create produces. Run with `RUST_LOG=debug` to see the
//! per-native-call log lines.

use cubind_sparse::{Bsrsm2Info, Csric02Info, CubindError, SimSparse, SparseContext, SparseNative};
use std::sync::Arc;

fn main() -> Result<(), CubindError> {
    env_logger::init();

    let sim = Arc::new(SimSparse::new());
    let lib: Arc<dyn SparseNative> = sim.clone();

    let ctx = SparseContext::new(&lib)?;
    println!("library handle: {:#x}", ctx.raw());

    let mut ic0 = Csric02Info::new(&lib)?;
    let solve = Bsrsm2Info::new(&lib)?;
    println!(
        "analysis infos: csric02 {:#x}, bsrsm2 {:#x} ({} live)",
        ic0.raw(),
        solve.raw(),
        sim.live_handles()
    );

    ic0.release();
    ic0.release(); // no second destroy reaches the library
    println!(
        "after explicit release: {} live, {} destroy calls",
        sim.live_handles(),
        sim.destroy_calls()
    );

    sim.fail_next_create();
    match Csric02Info::new(&lib) {
        Err(CubindError::Creation { call, status }) => {
            println!("injected failure: {call} returned status {status}");
        }
        other => println!("unexpected outcome: {other:?}"),
    }

    drop(solve);
    drop(ctx);
    println!("at exit: {} live handles", sim.live_handles());
    Ok(())
}
