//! Full AIMD cycle on [`AdaptiveRateController`]: climb via additive increase, drop via
//! multiplicative decrease on throttle, then climb back (spec §4.D, §8 "AIMD convergence").

use meshbatch_ratecontrol::{AdaptiveRateController, RateControllerConfig};
use std::time::Duration;

#[test]
fn climbs_then_halves_then_recovers() {
    let controller = AdaptiveRateController::new(
        "scenario",
        RateControllerConfig {
            min_increase_interval: Duration::ZERO,
            stabilization_batches: 1,
            configured_min: 1,
            hard_ceiling_per_identity: 52,
            ..RateControllerConfig::default()
        },
    );

    let initial = controller.get_parallelism(4, 1);
    assert!(initial >= 1);

    // A 2s batch duration keeps the execution-time and request-rate derived ceilings well
    // above the floor once `min_batch_samples_for_ceiling` samples have accumulated, so the
    // additive increase isn't starved by them before it has room to climb.
    for _ in 0..30 {
        controller.record_batch_completion(Duration::from_secs(2));
    }
    let climbed = controller.get_parallelism(4, 1);
    assert!(climbed > initial, "additive increase should raise the ceiling above {initial}, got {climbed}");

    controller.record_throttle(Duration::from_millis(1));
    let after_throttle = controller.get_parallelism(4, 1);
    assert!(
        after_throttle < climbed,
        "multiplicative decrease should drop the ceiling below {climbed}, got {after_throttle}"
    );

    for _ in 0..30 {
        controller.record_batch_completion(Duration::from_secs(2));
    }
    let recovered = controller.get_parallelism(4, 1);
    assert!(
        recovered > after_throttle,
        "should climb again after the throttle, from {after_throttle} got {recovered}"
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.total_throttle_events, 1);
}

#[test]
fn floor_scales_linearly_with_identity_count() {
    let single = AdaptiveRateController::new(
        "scenario-single",
        RateControllerConfig { hard_ceiling_per_identity: 10, ..RateControllerConfig::default() },
    );
    let fanned_out = AdaptiveRateController::new(
        "scenario-fanout",
        RateControllerConfig { hard_ceiling_per_identity: 10, ..RateControllerConfig::default() },
    );

    let one_identity = single.get_parallelism(1, 1);
    let four_identities = fanned_out.get_parallelism(1, 4);
    assert_eq!(four_identities, one_identity * 4);
    assert!(fanned_out.snapshot().hard_ceiling <= 40);
}
